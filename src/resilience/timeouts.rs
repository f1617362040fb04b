//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap a single attempt with its hard deadline
//! - Estimate the worst-case latency a blocking caller can observe
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the wrapped future is dropped on expiry,
//!   which closes its connection instead of leaking it
//! - Applied inside the executor, before classification, so blocking and
//!   non-blocking callers see identical timeout behaviour

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Run `fut` under `timeout`.
pub async fn with_deadline<F>(timeout: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(timeout, fut).await
}

/// Upper bound on how long one logical call can block:
/// `max_attempts × call_timeout + (max_attempts - 1) × delay`.
pub fn worst_case_latency(max_attempts: u32, call_timeout: Duration, delay: Duration) -> Duration {
    let attempts = max_attempts.max(1);
    call_timeout.saturating_mul(attempts) + delay.saturating_mul(attempts - 1)
}
