//! Call executor: one network round trip.
//!
//! # Responsibilities
//! - Send the request described by a `CallContext`
//! - Read the full response body
//! - Enforce the per-attempt deadline over the whole exchange
//!
//! # Design Decisions
//! - No retries, no breaker logic; policy lives in the pipeline
//! - One `reqwest::Client` shared by every pipeline (connection pool is
//!   process-wide)
//! - Trait seam so transports can be swapped in tests

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::config::HttpConfig;
use crate::http::context::CallContext;
use crate::http::response::{Outcome, RawResponse, TransportError};
use crate::resilience::timeouts::with_deadline;

/// Performs a single attempt.
pub trait CallExecutor: Send + Sync + 'static {
    fn execute<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, Outcome>;
}

/// Executor backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Build the shared client from configuration.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn exchange(&self, ctx: &CallContext) -> Result<RawResponse, reqwest::Error> {
        let mut request = self
            .client
            .request(ctx.verb().method(), ctx.url().clone())
            .headers(ctx.headers().clone());
        if let Some(body) = ctx.body() {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        tracing::debug!(
            request_id = %ctx.request_id(),
            status = status,
            "Response status"
        );

        let body = response.text().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl CallExecutor for HttpExecutor {
    fn execute<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            tracing::debug!(
                request_id = %ctx.request_id(),
                method = %ctx.verb(),
                url = %ctx.url(),
                "Request"
            );
            for (name, value) in ctx.headers() {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    "Header: {}={}",
                    name,
                    value.to_str().unwrap_or("<binary>")
                );
            }

            match with_deadline(ctx.timeout(), self.exchange(ctx)).await {
                Ok(Ok(raw)) => Ok(raw),
                Ok(Err(e)) => Err(TransportError::from(e)),
                Err(_) => Err(TransportError::deadline_exceeded(ctx.timeout())),
            }
        })
    }
}
