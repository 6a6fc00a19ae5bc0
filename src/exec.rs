//! Execution wrappers applied around every remote call.
//!
//! Remote calls are composed as `with_retry(3, || with_timeout(10s, call))`.
//! Retries are reserved for transient failures; an authorization or
//! validation error propagates on the first attempt because no number of
//! retries can make it succeed.

use std::future::Future;
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Time budget for single-document remote operations.
pub const SINGLE_DOC_TIMEOUT: Duration = Duration::from_secs(10);

/// Time budget for bulk sharing-library scans.
pub const BULK_SCAN_TIMEOUT: Duration = Duration::from_secs(15);

/// Default retry budget for remote calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts. Doubles per attempt, with jitter.
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Runs `op` with a time budget, failing with [`CoreError::Timeout`] if it
/// has not completed in time.
pub async fn with_timeout<T, F>(limit: Duration, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout(limit)),
    }
}

/// Invokes `op` up to `max_attempts` times, propagating the final failure.
///
/// Every attempt consumes one unit of the budget, timeouts included. A
/// non-transient error short-circuits immediately. A small jittered backoff
/// separates attempts so a struggling remote is not hammered.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    debug_assert!(max_attempts > 0);
    let mut last_err = CoreError::RemoteOperationFailed("no attempts were made".into());

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt < max_attempts => {
                let delay = backoff_delay(attempt);
                tracing::debug!(attempt, ?delay, error = %e, "remote call failed, retrying");
                tokio::time::sleep(delay).await;
                last_err = e;
            }
            Err(e) => last_err = e,
        }
    }

    Err(last_err)
}

/// Spawns a fire-and-forget side call (notification scheduling, image
/// upload, AI enrichment) with its failure routed to the log rather than
/// silently lost. Such failures never roll back the record they were
/// attached to.
pub fn spawn_logged<F>(label: &'static str, fut: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            tracing::warn!(task = label, error = %e, "background side call failed");
        }
    })
}

/// Exponential backoff with +/-10% jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let base = BACKOFF_BASE.as_millis() as u64 * 2u64.saturating_pow(attempt - 1);
    let jitter = (base as f64 * 0.1 * (rand::random::<f64>() - 0.5)) as i64;
    Duration::from_millis((base as i64 + jitter).max(1) as u64)
}
