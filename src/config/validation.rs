//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (pipeline breaker exists)
//! - Validate value ranges (timeouts > 0, thresholds in range)
//! - Detect conflicting retry policy
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{CircuitBreakerConfig, ClientConfig};
use crate::http::context::header_map;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.worker_threads == 0 {
        errors.push(ValidationError::new("worker_threads", "must be at least 1"));
    }

    // HTTP
    if config.http.call_timeout_ms == 0 {
        errors.push(ValidationError::new("http.call_timeout_ms", "must be greater than 0"));
    }
    if config.http.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("http.connect_timeout_ms", "must be greater than 0"));
    }
    if let Some(base) = &config.http.base_url {
        if let Err(e) = url::Url::parse(base) {
            errors.push(ValidationError::new("http.base_url", format!("invalid URL: {}", e)));
        }
    }
    if let Err(e) = header_map(&config.http.default_headers) {
        errors.push(ValidationError::new("http.default_headers", e));
    }

    // Breakers
    let mut names = HashSet::new();
    for (i, breaker) in config.breakers.iter().enumerate() {
        if !names.insert(breaker.name.as_str()) {
            errors.push(ValidationError::new(
                format!("breakers[{}].name", i),
                format!("duplicate breaker name '{}'", breaker.name),
            ));
        }
        validate_breaker(i, breaker, &mut errors);
    }
    if config.breaker().is_none() {
        errors.push(ValidationError::new(
            "breaker_name",
            format!("no breaker named '{}' is defined", config.breaker_name),
        ));
    }

    // Retry
    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
    }
    for kind in &config.retry.retryable_kinds {
        if config.retry.terminal_kinds.contains(kind) {
            errors.push(ValidationError::new(
                "retry",
                format!("'{}' is listed as both retryable and terminal", kind),
            ));
        }
    }

    // Observability
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_breaker(i: usize, breaker: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    let field = |name: &str| format!("breakers[{}].{}", i, name);

    if breaker.name.trim().is_empty() {
        errors.push(ValidationError::new(field("name"), "must not be empty"));
    }
    if breaker.window_size == 0 {
        errors.push(ValidationError::new(field("window_size"), "must be at least 1"));
    }
    if breaker.minimum_calls == 0 {
        errors.push(ValidationError::new(field("minimum_calls"), "must be at least 1"));
    } else if breaker.minimum_calls > breaker.window_size {
        errors.push(ValidationError::new(
            field("minimum_calls"),
            "must not exceed window_size, the breaker could never open",
        ));
    }
    if !(breaker.failure_rate_threshold > 0.0 && breaker.failure_rate_threshold <= 100.0) {
        errors.push(ValidationError::new(
            field("failure_rate_threshold"),
            "must be in (0, 100]",
        ));
    }
    if breaker.wait_duration_ms == 0 {
        errors.push(ValidationError::new(field("wait_duration_ms"), "must be greater than 0"));
    }
    if breaker.half_open_permits == 0 {
        errors.push(ValidationError::new(field("half_open_permits"), "must be at least 1"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ClientConfig::default();
        config.worker_threads = 0;
        config.http.call_timeout_ms = 0;
        config.breakers[0].failure_rate_threshold = 0.0;
        config.breakers[0].half_open_permits = 0;
        config.retry.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(errors.len(), 5, "{:?}", fields);
        assert!(fields.contains(&"breakers[0].failure_rate_threshold"));
        assert!(fields.contains(&"retry.max_attempts"));
    }

    #[test]
    fn test_unknown_and_duplicate_breakers() {
        let mut config = ClientConfig::default();
        config.breakers.push(CircuitBreakerConfig::default());
        config.breaker_name = "missing".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate breaker name")));
        assert!(errors.iter().any(|e| e.field == "breaker_name"));
    }

    #[test]
    fn test_conflicting_retry_kinds() {
        let mut config = ClientConfig::default();
        config.retry.retryable_kinds.push(ErrorKind::ClientError);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("client_error"));
    }

    #[test]
    fn test_minimum_calls_above_window() {
        let mut config = ClientConfig::default();
        config.breakers[0].minimum_calls = 11;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "breakers[0].minimum_calls");
    }

    #[test]
    fn test_invalid_header_and_base_url() {
        let mut config = ClientConfig::default();
        config.http.default_headers.insert("bad header".into(), "x".into());
        config.http.base_url = Some("not a url".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
