// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Converge Core
//!
//! Reconciliation of asynchronous remote operations.
//!
//! After a mutating request is issued against a remote system whose operations
//! are not instantaneous, the caller blocks here until the remote state
//! converges, fails, or the time budget runs out.
//!
//! # Architecture
//!
//! - [`identity`]: composite identifiers (`scope/resource[/child]`)
//! - [`classify`]: not-found / transient / fatal classification of remote errors
//! - [`StatePoller`]: the generic poll loop driven by a [`PollPolicy`]
//! - [`JobWaiter`]: poll loop specialised for detached jobs
//! - [`ResizeOrchestrator`]: stop, mutate, start workflow
//! - [`TransientRetry`]: bounded whole-call retry
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use converge_core::{OperationKind, PollPolicy, StatePoller, StatusSnapshot, RemoteError};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("request failed")]
//! struct ClientError;
//!
//! impl RemoteError for ClientError {
//!     fn is_not_found(&self) -> bool {
//!         false
//!     }
//! }
//!
//! # async fn example() -> converge_core::Result<()> {
//! let policy = PollPolicy::new(Duration::from_secs(600))
//!     .with_subject("volume")
//!     .with_pending(["creating"])
//!     .with_target(["available"])
//!     .with_fatal(["error"]);
//!
//! let status = StatePoller::new(policy)?
//!     .poll(OperationKind::Create, || async {
//!         Ok::<_, ClientError>(StatusSnapshot::status("available"))
//!     })
//!     .await
//!     .into_result()?;
//! assert_eq!(status, "available");
//! # Ok(())
//! # }
//! ```

pub mod classify;
mod config;
mod error;
pub mod identity;
mod job;
mod poller;
mod resize;
mod retry;
mod types;

pub use classify::{ErrorClass, RemoteError, classify, message_indicates_not_found};
pub use config::ConvergeConfig;
pub use error::{ConvergeError, Result};
pub use identity::CompositeId;
pub use job::{GENERIC_JOB_FAULT, JobClient, JobSnapshot, JobState, JobWaiter};
pub use poller::{
    DELETED_STATUS, FailureKind, PollPolicy, ReconciliationOutcome, StatePoller, TimeoutCause,
};
pub use resize::{ResizeOrchestrator, ResizePhase, ResizePolicies, ResizeReport, ResizeTarget};
pub use retry::{RetryHalt, TransientRetry};
pub use types::{ActionAck, OperationKind, RemoteOperationHandle, StatusSnapshot};

// Re-export so adapters can name the cancellation type without a direct dependency.
pub use tokio_util::sync::CancellationToken;
