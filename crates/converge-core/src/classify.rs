// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Classification of remote call errors.
//!
//! The reconciliation loops never look at concrete client error types. Each
//! remote client adapter implements [`RemoteError`] for its own error type and
//! the classifier works only through that capability interface:
//!
//! - [`ErrorClass::NotFound`]: the remote resource does not exist. Benign for
//!   delete-path waits, an error everywhere else.
//! - [`ErrorClass::Transient`]: one of the explicitly enumerated "service
//!   temporarily unavailable" conditions. The originating call is retried a
//!   bounded number of times (see [`crate::TransientRetry`]); during polling it
//!   counts as another pending tick.
//! - [`ErrorClass::Fatal`]: everything else, propagated immediately.

use serde::{Deserialize, Serialize};

/// Capability interface implemented by remote client error types.
pub trait RemoteError: std::error::Error + Send + Sync + 'static {
    /// Whether the error is a structured "resource does not exist" signal.
    fn is_not_found(&self) -> bool;

    /// Whether the error is a known transient service condition.
    fn is_transient(&self) -> bool {
        false
    }

    /// Human-readable message, surfaced verbatim to the caller.
    fn message(&self) -> String {
        self.to_string()
    }
}

/// Classification of a remote call error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The resource is gone.
    NotFound,
    /// Retry the whole originating call.
    Transient,
    /// Abort.
    Fatal,
}

/// Classify a remote call error.
///
/// Not-found takes precedence over transient: an adapter reporting both is
/// describing a resource that no longer exists.
pub fn classify<E: RemoteError + ?Sized>(err: &E) -> ErrorClass {
    if err.is_not_found() {
        ErrorClass::NotFound
    } else if err.is_transient() {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    }
}

/// Message phrases that legacy endpoints use to report a missing resource.
const NOT_FOUND_PHRASES: &[&str] = &["not found", "does not exist", "notfound"];

/// Message-substring fallback for detecting "not found".
///
/// Only for adapters whose transport provides neither an HTTP status nor a
/// structured error code. Matching is case-insensitive. Structured signals
/// must always be preferred: a loose match here can turn a genuine failure
/// into a benign absence.
pub fn message_indicates_not_found(message: &str) -> bool {
    let lower = message.to_lowercase();
    NOT_FOUND_PHRASES.iter().any(|phrase| lower.contains(phrase))
}
