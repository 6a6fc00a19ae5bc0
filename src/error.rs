//! Error taxonomy for the sync core.
//!
//! Only a subset of these is ever surfaced to callers: a disconnected write
//! becomes a queued success, and queue serialization failures are logged and
//! dropped. Rollback and compensation are applied before an error propagates.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the sync core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No remote attempt was made; the write was queued instead.
    /// Absorbed by the domain managers, never returned from `save`.
    #[error("network unavailable")]
    NetworkUnavailable,

    /// A remote call did not complete within its time budget.
    #[error("remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// A remote call failed in a way that may succeed on retry.
    #[error("remote operation failed: {0}")]
    RemoteOperationFailed(String),

    /// The remote store rejected the operation; retrying cannot help.
    #[error("remote store rejected the operation: {0}")]
    RemoteRejected(String),

    /// A payload could not be encoded for queueing or replay.
    #[error("failed to serialize operation payload: {0}")]
    SerializationFailed(String),

    /// A sharing action was attempted by someone other than the owner.
    #[error("not authorized: {0}")]
    AuthorizationDenied(String),

    /// A referenced profile, record, or invitation does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The profile owner's own access cannot be revoked.
    #[error("cannot revoke the profile owner's access")]
    CannotRevokeOwner,

    /// The profile owner cannot leave their own shared profile.
    #[error("the owner cannot leave their own shared profile")]
    OwnerCannotLeave,
}

impl CoreError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Authorization, missing-document, and rejected-write failures are
    /// terminal; only network-class failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::NetworkUnavailable
                | CoreError::Timeout(_)
                | CoreError::RemoteOperationFailed(_)
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::SerializationFailed(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
