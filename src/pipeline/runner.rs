//! The attempt loop shared by blocking and non-blocking calls.
//!
//! # Responsibilities
//! - Gate each attempt on breaker admission
//! - Execute, classify and record every attempt
//! - Retry transient failures after the fixed delay
//! - Stop scheduling attempts once the call is cancelled
//!
//! # Design Decisions
//! - Attempts are strictly sequential within a call
//! - Breaker rejections never consume an attempt or touch the network
//! - Exhaustion surfaces the last observed error

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;

use crate::error::{CallError, ErrorKind};
use crate::http::context::CallContext;
use crate::http::executor::CallExecutor;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::classify;
use crate::resilience::retries::RetryPolicy;

/// State shared by every call of one pipeline.
pub(crate) struct PipelineCore {
    pub executor: Arc<dyn CallExecutor>,
    pub breaker: Arc<CircuitBreaker>,
    pub retry: RetryPolicy,
}

pub(crate) async fn run_call(
    core: Arc<PipelineCore>,
    ctx: CallContext,
    mut cancel: watch::Receiver<bool>,
) -> Result<String, CallError> {
    let start = Instant::now();
    let url = ctx.url().to_string();
    let method = ctx.verb().as_str();

    tracing::info!(
        request_id = %ctx.request_id(),
        method = %method,
        url = %url,
        breaker = %core.breaker.name(),
        "Outbound call started"
    );

    let mut attempt = 0u32;
    loop {
        if *cancel.borrow() {
            return Err(cancelled(&ctx, &url, start));
        }
        attempt += 1;

        let permit = match core.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(rejected) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    url = %url,
                    breaker = %core.breaker.name(),
                    state = %rejected.state,
                    attempt = attempt,
                    "Call rejected by circuit breaker"
                );
                let err = CallError::rejected(&url, core.breaker.name());
                metrics::record_call(method, err.kind().as_str(), start);
                return Err(err);
            }
        };

        let outcome = core.executor.execute(&ctx).await;
        let err = match classify::into_result(&url, outcome) {
            Ok(body) => {
                permit.record_success();
                tracing::info!(
                    request_id = %ctx.request_id(),
                    url = %url,
                    attempt = attempt,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Outbound call succeeded"
                );
                metrics::record_call(method, "success", start);
                return Ok(body);
            }
            Err(err) => err,
        };

        let kind = err.kind();
        permit.record_error(kind);

        if core.retry.should_retry(attempt, kind) {
            let delay = core.retry.delay();
            tracing::info!(
                request_id = %ctx.request_id(),
                url = %url,
                attempt = attempt,
                kind = %kind,
                delay = ?delay,
                error = %err,
                "Retrying call"
            );
            metrics::record_retry(method);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_cancelled(&mut cancel) => return Err(cancelled(&ctx, &url, start)),
            }
            continue;
        }

        match kind {
            ErrorKind::ClientError => tracing::warn!(
                request_id = %ctx.request_id(),
                url = %url,
                attempt = attempt,
                error = %err,
                "Outbound call failed"
            ),
            _ => tracing::error!(
                request_id = %ctx.request_id(),
                url = %url,
                attempt = attempt,
                kind = %kind,
                retries_exhausted = !core.retry.is_terminal(kind),
                error = %err,
                "Outbound call failed"
            ),
        }
        metrics::record_call(method, kind.as_str(), start);
        return Err(err);
    }
}

fn cancelled(ctx: &CallContext, url: &str, start: Instant) -> CallError {
    tracing::info!(request_id = %ctx.request_id(), url = %url, "Call cancelled by caller");
    let err = CallError::unavailable(url, "call cancelled");
    metrics::record_call(ctx.verb().as_str(), "cancelled", start);
    err
}

/// Resolves once the flag flips to true; never resolves if the sender is
/// dropped without cancelling.
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
