//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Root configuration for the call pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Breaker guarding calls made by the pipeline.
    pub breaker_name: String,

    /// Threads in the pipeline's internal worker pool.
    pub worker_threads: usize,

    /// HTTP transport settings.
    pub http: HttpConfig,

    /// Breaker definitions, one per target name.
    pub breakers: Vec<CircuitBreakerConfig>,

    /// Retry budget.
    pub retry: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            breaker_name: "externalService".to_string(),
            worker_threads: 4,
            http: HttpConfig::default(),
            breakers: vec![CircuitBreakerConfig::default()],
            retry: RetryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Breaker settings for `breaker_name`, if defined.
    pub fn breaker(&self) -> Option<&CircuitBreakerConfig> {
        self.breakers.iter().find(|b| b.name == self.breaker_name)
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL relative call targets are resolved against.
    pub base_url: Option<String>,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Hard deadline for each attempt in milliseconds.
    pub call_timeout_ms: u64,

    /// User-Agent sent with every request.
    pub user_agent: String,

    /// Headers sent with every request; callers may add more.
    pub default_headers: BTreeMap<String, String>,
}

impl HttpConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            base_url: None,
            connect_timeout_ms: 3_000,
            call_timeout_ms: 5_000,
            user_agent: concat!("resilient-client/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers,
        }
    }
}

/// Circuit breaker configuration for one target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Target name the breaker is registered under.
    pub name: String,

    /// Number of most recent calls kept in the sliding window.
    pub window_size: usize,

    /// Calls required before the failure rate is evaluated.
    pub minimum_calls: usize,

    /// Failure percentage (0-100] that opens the breaker.
    pub failure_rate_threshold: f64,

    /// Time spent open before trial calls are admitted, in milliseconds.
    pub wait_duration_ms: u64,

    /// Trial calls admitted while half-open.
    pub half_open_permits: u32,

    /// Error kinds counted as failures in the window; any other kind is
    /// recorded as a success.
    pub recorded_kinds: Vec<ErrorKind>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "externalService".to_string(),
            window_size: 10,
            minimum_calls: 5,
            failure_rate_threshold: 50.0,
            wait_duration_ms: 10_000,
            half_open_permits: 2,
            recorded_kinds: ErrorKind::ALL.to_vec(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per call, the first one included.
    pub max_attempts: u32,

    /// Fixed wait between attempts in milliseconds.
    pub inter_attempt_delay_ms: u64,

    /// Error kinds that trigger another attempt.
    pub retryable_kinds: Vec<ErrorKind>,

    /// Error kinds that are never retried.
    pub terminal_kinds: Vec<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            inter_attempt_delay_ms: 2_000,
            retryable_kinds: vec![ErrorKind::ServerError, ErrorKind::Unavailable],
            terminal_kinds: vec![ErrorKind::ClientError],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
