//! Deadline for the model work behind one user-facing request.

use std::future::Future;
use std::time::Duration;

use deskhub_core::errors::UpstreamError;

/// Used when no budget is configured. Stays below the default HTTP request
/// timeout so a fallback can still be written.
pub const DEFAULT_GENERATION_BUDGET: Duration = Duration::from_secs(90);

/// Run `work`, turning an overrun into `UpstreamError::Timeout(budget)`.
pub(crate) async fn within<T, F>(budget: Duration, work: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    tokio::time::timeout(budget, work)
        .await
        .unwrap_or(Err(UpstreamError::Timeout(budget)))
}
