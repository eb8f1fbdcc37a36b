// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for converge-core.

use thiserror::Error;

use crate::classify::{ErrorClass, RemoteError, classify};
use crate::resize::ResizePhase;

/// Result type using ConvergeError.
pub type Result<T> = std::result::Result<T, ConvergeError>;

/// Terminal errors surfaced to the caller of a reconciliation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConvergeError {
    /// Malformed composite identity. Never retried.
    #[error("malformed identifier: {0}")]
    Structural(String),

    /// The targeted remote resource does not exist.
    #[error("remote resource not found: {0}")]
    NotFound(String),

    /// A transient service condition persisted past the retry budget.
    #[error("service unavailable after {attempts} attempts: {message}")]
    TransientExhausted {
        /// Number of calls issued, including the first one.
        attempts: u32,
        /// Message of the last error.
        message: String,
    },

    /// The remote system reported the operation as failed.
    #[error("{}", fault_display(.reason, .message.as_deref()))]
    RemoteFault {
        /// What failed (e.g. "job status failed").
        reason: String,
        /// Fault text returned by the remote system, verbatim.
        message: Option<String>,
    },

    /// The status payload was missing or structurally invalid.
    #[error("invalid status payload: {0}")]
    InvalidPayload(String),

    /// Neither success nor failure was observed within the budget.
    /// The operation may still be in progress remotely.
    #[error("{}", timeout_display(.cancelled))]
    TimedOut {
        /// True when an external cancellation ended the wait.
        cancelled: bool,
    },

    /// A remote call failed with a non-retryable error.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// Invalid configuration or policy.
    #[error("configuration error: {0}")]
    Config(String),

    /// A step of a multi-step orchestration failed.
    #[error("{phase} phase failed: {source}")]
    Phase {
        /// Phase in which the failure occurred.
        phase: ResizePhase,
        /// The underlying failure.
        #[source]
        source: Box<ConvergeError>,
    },
}

fn fault_display(reason: &str, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("{}: {}", reason, message),
        None => reason.to_string(),
    }
}

fn timeout_display(cancelled: &bool) -> &'static str {
    if *cancelled {
        "reconciliation cancelled before completion"
    } else {
        "timed out waiting for the operation to complete; it may still be in progress"
    }
}

impl ConvergeError {
    /// Convert a remote call error into a terminal error according to its classification.
    ///
    /// `attempts` is the number of calls that were issued before giving up.
    pub fn from_remote<E: RemoteError + ?Sized>(err: &E, attempts: u32) -> Self {
        match classify(err) {
            ErrorClass::NotFound => ConvergeError::NotFound(err.message()),
            ErrorClass::Transient => ConvergeError::TransientExhausted {
                attempts,
                message: err.message(),
            },
            ErrorClass::Fatal => ConvergeError::Remote(err.message()),
        }
    }

    /// Wrap this error with the orchestration phase it occurred in.
    pub fn in_phase(self, phase: ResizePhase) -> Self {
        ConvergeError::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// The phase of a multi-step orchestration this error occurred in, if any.
    pub fn phase(&self) -> Option<ResizePhase> {
        match self {
            ConvergeError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// The innermost error, with any phase wrappers removed.
    pub fn root(&self) -> &ConvergeError {
        match self {
            ConvergeError::Phase { source, .. } => source.root(),
            other => other,
        }
    }

    /// The remote fault message carried by this error, if any.
    pub fn remote_fault(&self) -> Option<&str> {
        match self.root() {
            ConvergeError::RemoteFault { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Whether the operation may still complete remotely.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), ConvergeError::TimedOut { .. })
    }
}
