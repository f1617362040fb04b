//! Request pipeline facade.
//!
//! # Responsibilities
//! - Expose blocking and non-blocking entry points for GET/POST/PUT/PATCH/DELETE
//! - Encode payloads as JSON and merge caller headers over the defaults
//! - Run every call on the internal worker pool through the shared attempt loop
//!
//! # Design Decisions
//! - Both entry points drive the same `run_call`, so error mapping is identical
//! - Blocking callers wait on a channel; they must not call from inside an
//!   async task (use the `_async` variants there)
//! - The breaker comes from an injected registry, never a global

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

use crate::config::ClientConfig;
use crate::error::CallError;
use crate::http::context::{header_map, CallContext, ExtraHeaders, Verb};
use crate::http::executor::{CallExecutor, HttpExecutor};
use crate::pipeline::handle::CallHandle;
use crate::pipeline::runner::{run_call, PipelineCore};
use crate::pipeline::workers::WorkerPool;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::registry::BreakerRegistry;
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::worst_case_latency;

/// Errors raised while building a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Worker pool error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Invalid default headers: {0}")]
    Headers(String),

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Resilient outbound HTTP client.
pub struct RequestPipeline {
    core: Arc<PipelineCore>,
    workers: WorkerPool,
    default_headers: HeaderMap,
    base_url: Option<Url>,
    call_timeout: Duration,
}

impl RequestPipeline {
    /// Build a pipeline talking HTTP through reqwest.
    pub fn new(config: &ClientConfig, registry: &BreakerRegistry) -> Result<Self, PipelineError> {
        let executor = HttpExecutor::new(&config.http)?;
        Self::with_executor(config, registry, Arc::new(executor))
    }

    /// Build a pipeline around a custom executor.
    pub fn with_executor(
        config: &ClientConfig,
        registry: &BreakerRegistry,
        executor: Arc<dyn CallExecutor>,
    ) -> Result<Self, PipelineError> {
        let breaker = match config.breaker() {
            Some(breaker_config) => registry.register(breaker_config.clone()),
            None => registry.get_or_create(&config.breaker_name),
        };
        let default_headers = header_map(&config.http.default_headers).map_err(PipelineError::Headers)?;
        let base_url = config.http.base_url.as_deref().map(Url::parse).transpose()?;
        let workers = WorkerPool::new(config.worker_threads)?;
        let retry = RetryPolicy::new(&config.retry);
        let worst_case = worst_case_latency(retry.max_attempts(), config.http.call_timeout(), retry.delay());

        tracing::info!(
            breaker = %breaker.name(),
            max_attempts = config.retry.max_attempts,
            call_timeout_ms = config.http.call_timeout_ms,
            worker_threads = config.worker_threads,
            worst_case_ms = worst_case.as_millis() as u64,
            "Request pipeline initialized"
        );

        Ok(Self {
            core: Arc::new(PipelineCore {
                executor,
                breaker,
                retry,
            }),
            workers,
            default_headers,
            base_url,
            call_timeout: config.http.call_timeout(),
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.core.breaker
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.core.retry
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    // --- Generic entry points ---

    /// Blocking call. `body` is required for POST/PUT/PATCH and ignored otherwise.
    pub fn call_sync(
        &self,
        verb: Verb,
        url: &str,
        body: Option<&serde_json::Value>,
        headers: Option<&ExtraHeaders>,
    ) -> Result<String, CallError> {
        let payload = body.map(|b| encode(url, b)).transpose()?;
        self.send_sync(verb, url, payload, headers)
    }

    /// Non-blocking call; returns immediately.
    pub fn call_async(
        &self,
        verb: Verb,
        url: &str,
        body: Option<&serde_json::Value>,
        headers: Option<&ExtraHeaders>,
    ) -> CallHandle {
        match body.map(|b| encode(url, b)).transpose() {
            Ok(payload) => self.send_async(verb, url, payload, headers),
            Err(e) => CallHandle::failed(e),
        }
    }

    // --- GET ---

    pub fn get_sync(&self, url: &str, headers: Option<&ExtraHeaders>) -> Result<String, CallError> {
        self.send_sync(Verb::Get, url, None, headers)
    }

    pub fn get_async(&self, url: &str, headers: Option<&ExtraHeaders>) -> CallHandle {
        self.send_async(Verb::Get, url, None, headers)
    }

    // --- POST ---

    pub fn post_sync<B>(&self, url: &str, body: &B, headers: Option<&ExtraHeaders>) -> Result<String, CallError>
    where
        B: Serialize + ?Sized,
    {
        let payload = encode(url, body)?;
        self.send_sync(Verb::Post, url, Some(payload), headers)
    }

    pub fn post_async<B>(&self, url: &str, body: &B, headers: Option<&ExtraHeaders>) -> CallHandle
    where
        B: Serialize + ?Sized,
    {
        self.encoded_async(Verb::Post, url, body, headers)
    }

    // --- PUT ---

    pub fn put_sync<B>(&self, url: &str, body: &B, headers: Option<&ExtraHeaders>) -> Result<String, CallError>
    where
        B: Serialize + ?Sized,
    {
        let payload = encode(url, body)?;
        self.send_sync(Verb::Put, url, Some(payload), headers)
    }

    pub fn put_async<B>(&self, url: &str, body: &B, headers: Option<&ExtraHeaders>) -> CallHandle
    where
        B: Serialize + ?Sized,
    {
        self.encoded_async(Verb::Put, url, body, headers)
    }

    // --- PATCH ---

    pub fn patch_sync<B>(&self, url: &str, body: &B, headers: Option<&ExtraHeaders>) -> Result<String, CallError>
    where
        B: Serialize + ?Sized,
    {
        let payload = encode(url, body)?;
        self.send_sync(Verb::Patch, url, Some(payload), headers)
    }

    pub fn patch_async<B>(&self, url: &str, body: &B, headers: Option<&ExtraHeaders>) -> CallHandle
    where
        B: Serialize + ?Sized,
    {
        self.encoded_async(Verb::Patch, url, body, headers)
    }

    // --- DELETE ---

    pub fn delete_sync(&self, url: &str, headers: Option<&ExtraHeaders>) -> Result<String, CallError> {
        self.send_sync(Verb::Delete, url, None, headers)
    }

    pub fn delete_async(&self, url: &str, headers: Option<&ExtraHeaders>) -> CallHandle {
        self.send_async(Verb::Delete, url, None, headers)
    }

    // --- Internals ---

    fn context(
        &self,
        verb: Verb,
        url: &str,
        payload: Option<Vec<u8>>,
        headers: Option<&ExtraHeaders>,
    ) -> Result<CallContext, CallError> {
        CallContext::build(
            verb,
            url,
            self.base_url.as_ref(),
            &self.default_headers,
            headers,
            payload,
            self.call_timeout,
        )
    }

    fn send_sync(
        &self,
        verb: Verb,
        url: &str,
        payload: Option<Vec<u8>>,
        headers: Option<&ExtraHeaders>,
    ) -> Result<String, CallError> {
        let ctx = self.context(verb, url, payload, headers)?;
        let target = ctx.url().to_string();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (result_tx, result_rx) = mpsc::channel();
        let core = Arc::clone(&self.core);
        self.workers.spawn(async move {
            let _ = result_tx.send(run_call(core, ctx, cancel_rx).await);
        });

        let result = result_rx.recv().unwrap_or_else(|_| {
            Err(CallError::unavailable(&target, "worker pool stopped before the call completed"))
        });
        drop(cancel_tx);
        result
    }

    fn send_async(
        &self,
        verb: Verb,
        url: &str,
        payload: Option<Vec<u8>>,
        headers: Option<&ExtraHeaders>,
    ) -> CallHandle {
        let ctx = match self.context(verb, url, payload, headers) {
            Ok(ctx) => ctx,
            Err(e) => return CallHandle::failed(e),
        };
        let target = ctx.url().to_string();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let join = self.workers.spawn(run_call(Arc::clone(&self.core), ctx, cancel_rx));
        CallHandle::running(target, join, cancel_tx)
    }

    fn encoded_async<B>(&self, verb: Verb, url: &str, body: &B, headers: Option<&ExtraHeaders>) -> CallHandle
    where
        B: Serialize + ?Sized,
    {
        match encode(url, body) {
            Ok(payload) => self.send_async(verb, url, Some(payload), headers),
            Err(e) => CallHandle::failed(e),
        }
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("breaker", &self.core.breaker.name())
            .field("max_attempts", &self.core.retry.max_attempts())
            .field("call_timeout", &self.call_timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn encode<B>(url: &str, body: &B) -> Result<Vec<u8>, CallError>
where
    B: Serialize + ?Sized,
{
    serde_json::to_vec(body)
        .map_err(|e| CallError::invalid_request(url, format!("failed to serialize request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::response::{Outcome, RawResponse};
    use futures_util::future::BoxFuture;
    use std::sync::Mutex;

    /// Records every context it sees and answers 200 with the JSON body echoed.
    #[derive(Default)]
    struct EchoExecutor {
        seen: Mutex<Vec<(Verb, String, Option<Vec<u8>>)>>,
    }

    impl CallExecutor for EchoExecutor {
        fn execute<'a>(&'a self, ctx: &'a CallContext) -> BoxFuture<'a, Outcome> {
            self.seen.lock().unwrap().push((
                ctx.verb(),
                ctx.url().to_string(),
                ctx.body().map(|b| b.to_vec()),
            ));
            let body = ctx
                .body()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_else(|| "empty".to_string());
            Box::pin(async move { Ok(RawResponse::new(200, body)) })
        }
    }

    fn pipeline(executor: Arc<EchoExecutor>) -> RequestPipeline {
        let mut config = ClientConfig::default();
        config.http.base_url = Some("http://svc.local/api/".into());
        config.worker_threads = 1;
        RequestPipeline::with_executor(&config, &BreakerRegistry::default(), executor).unwrap()
    }

    #[derive(Serialize)]
    struct Message {
        to: String,
        text: String,
    }

    #[test]
    fn test_verbs_and_payloads() {
        let exec = Arc::new(EchoExecutor::default());
        let pipeline = pipeline(exec.clone());
        let msg = Message {
            to: "010-0000-0000".into(),
            text: "hi".into(),
        };

        assert_eq!(pipeline.get_sync("ping", None).unwrap(), "empty");
        assert_eq!(pipeline.post_sync("send", &msg, None).unwrap(), r#"{"to":"010-0000-0000","text":"hi"}"#);
        assert!(pipeline.put_sync("item/1", &msg, None).is_ok());
        assert!(pipeline.patch_sync("item/1", &serde_json::json!({"text": "yo"}), None).is_ok());
        assert_eq!(pipeline.delete_sync("item/1", None).unwrap(), "empty");

        let seen = exec.seen.lock().unwrap();
        let verbs: Vec<_> = seen.iter().map(|(v, _, _)| *v).collect();
        assert_eq!(verbs, vec![Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete]);
        assert_eq!(seen[0].1, "http://svc.local/api/ping");
        assert!(seen[4].2.is_none());
    }

    #[tokio::test]
    async fn test_async_entry_points() {
        let exec = Arc::new(EchoExecutor::default());
        let pipeline = pipeline(exec.clone());

        let body = pipeline.post_async("send", &serde_json::json!({"a": 1}), None).await.unwrap();
        assert_eq!(body, r#"{"a":1}"#);
        assert_eq!(pipeline.get_async("ping", None).await.unwrap(), "empty");
        assert_eq!(pipeline.delete_async("item/1", None).await.unwrap(), "empty");
    }

    #[tokio::test]
    async fn test_prepare_errors_surface_through_handle() {
        let exec = Arc::new(EchoExecutor::default());
        let pipeline = pipeline(exec.clone());

        let err = pipeline.call_async(Verb::Post, "send", None, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert_eq!(err.status(), None);
        assert!(exec.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_generic_call_sync() {
        let exec = Arc::new(EchoExecutor::default());
        let pipeline = pipeline(exec);
        let body = serde_json::json!({"k": "v"});
        assert_eq!(pipeline.call_sync(Verb::Put, "x", Some(&body), None).unwrap(), r#"{"k":"v"}"#);
    }
}
