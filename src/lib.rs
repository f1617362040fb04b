//! Resilient outbound HTTP client library.
//!
//! Every call runs through a per-attempt deadline, a named circuit breaker
//! and a fixed-delay retry policy, and surfaces either the response body or
//! one typed [`CallError`].

pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod resilience;

pub use config::ClientConfig;
pub use error::{CallError, ErrorKind, ErrorReport};
pub use http::{CallExecutor, ExtraHeaders, Verb};
pub use pipeline::{CallHandle, PipelineError, RequestPipeline};
pub use resilience::{BreakerRegistry, CircuitBreaker, CircuitState};
