// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for converge-power.

use converge_core::{ConvergeError, RemoteError, message_indicates_not_found};
use thiserror::Error;

/// Error codes for the "service temporarily unavailable" conditions that are
/// retried as a whole call. Only cloud-connection create and update report them.
pub const TRANSIENT_CODES: &[&str] = &[
    "pcloudCloudconnectionsPostServiceUnavailable",
    "pcloudCloudconnectionsPutServiceUnavailable",
];

/// Error returned by a single Power API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct ApiError {
    /// API operation that failed (e.g. "pcloudPvminstancesGet").
    pub operation: String,
    /// HTTP status, when the transport exposes one.
    pub status: Option<u16>,
    /// Structured error code, when the API returns one.
    pub code: Option<String>,
    /// Error message.
    pub message: String,
}

impl ApiError {
    /// Error with an HTTP status.
    pub fn http(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    /// Error with a structured code.
    pub fn coded(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            status: None,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Error carrying only a message, as returned by legacy endpoints.
    pub fn legacy(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// 404 for `operation`.
    pub fn not_found(operation: impl Into<String>, id: &str) -> Self {
        Self::http(operation, 404, format!("{} not found", id))
    }

    fn has_structured_signal(&self) -> bool {
        self.status.is_some() || self.code.is_some()
    }
}

impl RemoteError for ApiError {
    fn is_not_found(&self) -> bool {
        if self.status == Some(404) {
            return true;
        }
        if self
            .code
            .as_deref()
            .is_some_and(|code| code.ends_with("NotFound"))
        {
            return true;
        }
        // Message matching only for errors with no status and no code.
        !self.has_structured_signal() && message_indicates_not_found(&self.message)
    }

    fn is_transient(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| TRANSIENT_CODES.contains(&code))
    }
}

/// Result type using PowerError.
pub type Result<T> = std::result::Result<T, PowerError>;

/// Errors surfaced by the Power adapters.
#[derive(Debug, Error)]
pub enum PowerError {
    /// Reconciliation failed.
    #[error(transparent)]
    Converge(#[from] ConvergeError),

    /// The instance health forbids the requested change.
    #[error("the operation cannot be performed when the instance health is {0}")]
    UnhealthyInstance(String),

    /// The requested change cannot be applied.
    #[error("invalid change: {0}")]
    InvalidChange(String),
}

impl PowerError {
    /// Underlying reconciliation error, if any.
    pub fn converge(&self) -> Option<&ConvergeError> {
        match self {
            PowerError::Converge(err) => Some(err),
            _ => None,
        }
    }
}

/// Map a failed API call onto the reconciliation error taxonomy.
pub(crate) fn api_failure(err: ApiError) -> PowerError {
    PowerError::Converge(ConvergeError::from_remote(&err, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge_core::{ErrorClass, classify};

    #[test]
    fn test_http_404_is_not_found() {
        let err = ApiError::http("pcloudCloudinstancesVolumesGet", 404, "boom");
        assert_eq!(classify(&err), ErrorClass::NotFound);
    }

    #[test]
    fn test_not_found_code() {
        let err = ApiError::coded(
            "pcloudPvminstancesGet",
            "pcloudPvminstancesGetNotFound",
            "pvm-instance does not exist",
        );
        assert_eq!(classify(&err), ErrorClass::NotFound);
    }

    #[test]
    fn test_message_fallback_only_without_structured_signal() {
        let legacy = ApiError::legacy("vpmemGet", "volume vp-1 not found");
        assert_eq!(classify(&legacy), ErrorClass::NotFound);

        // A 500 whose message mentions "not found" stays fatal.
        let server = ApiError::http("pcloudPvminstancesGet", 500, "image not found in catalog");
        assert_eq!(classify(&server), ErrorClass::Fatal);
    }

    #[test]
    fn test_transient_codes() {
        let err = ApiError::coded(
            "pcloudCloudconnectionsPost",
            "pcloudCloudconnectionsPostServiceUnavailable",
            "unable to get vpc details",
        );
        assert_eq!(classify(&err), ErrorClass::Transient);

        let err = ApiError::http("pcloudCloudconnectionsPost", 503, "unavailable");
        assert_eq!(classify(&err), ErrorClass::Fatal);
    }

    #[test]
    fn test_display() {
        let err = ApiError::http("pcloudPvminstancesActionPost", 409, "instance busy");
        assert_eq!(err.to_string(), "pcloudPvminstancesActionPost failed: instance busy");
    }
}
