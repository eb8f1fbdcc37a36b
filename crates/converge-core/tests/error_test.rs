// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error type tests for converge-core.

use converge_core::{ConvergeError, RemoteError, ResizePhase};

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct ClientError {
    message: String,
    status: u16,
}

impl RemoteError for ClientError {
    fn is_not_found(&self) -> bool {
        self.status == 404
    }

    fn is_transient(&self) -> bool {
        self.status == 503
    }
}

fn client_error(status: u16, message: &str) -> ClientError {
    ClientError {
        message: message.to_string(),
        status,
    }
}

#[test]
fn test_structural_error_display() {
    let err = ConvergeError::Structural("identifier \"a\" has 1 segment(s)".to_string());
    assert!(err.to_string().contains("malformed identifier"));
}

#[test]
fn test_from_remote_not_found() {
    let err = ConvergeError::from_remote(&client_error(404, "volume vol-1 not found"), 1);
    assert!(matches!(err, ConvergeError::NotFound(_)));
    assert!(err.to_string().contains("vol-1"));
}

#[test]
fn test_from_remote_transient_reports_attempts() {
    let err = ConvergeError::from_remote(&client_error(503, "service unavailable"), 2);
    assert!(matches!(
        err,
        ConvergeError::TransientExhausted { attempts: 2, .. }
    ));
    assert!(err.to_string().contains("after 2 attempts"));
}

#[test]
fn test_from_remote_fatal() {
    let err = ConvergeError::from_remote(&client_error(400, "bad request"), 1);
    assert!(matches!(err, ConvergeError::Remote(_)));
    assert!(err.to_string().contains("bad request"));
}

#[test]
fn test_phase_error_source_chain() {
    use std::error::Error;

    let err = ConvergeError::TimedOut { cancelled: false }.in_phase(ResizePhase::Starting);
    assert_eq!(err.phase(), Some(ResizePhase::Starting));
    assert!(err.is_timeout());
    assert!(err.to_string().starts_with("starting phase failed"));

    let source = err.source().expect("phase errors have a source");
    assert!(source.to_string().contains("may still be in progress"));
}

#[test]
fn test_config_error_display() {
    let err = ConvergeError::Config("invalid CONVERGE_POLL_INTERVAL_MS".to_string());
    assert!(err.to_string().contains("configuration error"));
    assert!(err.to_string().contains("CONVERGE_POLL_INTERVAL_MS"));
}
