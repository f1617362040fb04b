//! Error taxonomy for outbound calls.
//!
//! # Responsibilities
//! - Define the closed set of error kinds a call can end in
//! - Carry target URL, status, body snippet and cause for diagnostics
//! - Render a serialisable report for callers that surface errors over HTTP
//!
//! # Design Decisions
//! - One flat enum, matched exhaustively by the pipeline and tests
//! - Breaker rejections share the `Unavailable` kind but are flagged
//! - Status analogues follow gateway conventions (400/500/504/503)

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::response::TransportError;

/// Semantic classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Target answered with a 4xx status.
    ClientError,
    /// Target answered with a 5xx status.
    ServerError,
    /// The attempt ran past its deadline.
    Timeout,
    /// Transport failure or circuit breaker rejection.
    Unavailable,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::ClientError,
        ErrorKind::ServerError,
        ErrorKind::Timeout,
        ErrorKind::Unavailable,
    ];

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ClientError => "client_error",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error a caller receives from the pipeline.
#[derive(Debug, Error)]
pub enum CallError {
    /// 4xx from the target, or a request that could not be built.
    #[error("Client error [{}] on [{url}]: {body}", display_status(.status))]
    Client {
        url: String,
        status: Option<u16>,
        body: String,
    },

    /// 5xx from the target.
    #[error("Server error [{status}] on [{url}]: {body}")]
    Server {
        url: String,
        status: u16,
        body: String,
    },

    /// The attempt did not complete before its deadline.
    #[error("Timeout occurred while calling {url}")]
    Timeout {
        url: String,
        #[source]
        cause: TransportError,
    },

    /// Connection failure, breaker rejection or cancelled call.
    #[error("Service unavailable [{url}]: {reason}")]
    ServiceUnavailable {
        url: String,
        reason: String,
        #[source]
        cause: Option<TransportError>,
        breaker_rejected: bool,
    },
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "-".to_string(),
    }
}

impl CallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::Client { .. } => ErrorKind::ClientError,
            CallError::Server { .. } => ErrorKind::ServerError,
            CallError::Timeout { .. } => ErrorKind::Timeout,
            CallError::ServiceUnavailable { .. } => ErrorKind::Unavailable,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            CallError::Client { url, .. }
            | CallError::Server { url, .. }
            | CallError::Timeout { url, .. }
            | CallError::ServiceUnavailable { url, .. } => url,
        }
    }

    /// HTTP status returned by the target, if it answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Client { status, .. } => *status,
            CallError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body snippet, if the target answered.
    pub fn body(&self) -> Option<&str> {
        match self {
            CallError::Client { body, .. } | CallError::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    /// True when the call never left the process because the breaker was open.
    pub fn is_breaker_rejected(&self) -> bool {
        matches!(
            self,
            CallError::ServiceUnavailable {
                breaker_rejected: true,
                ..
            }
        )
    }

    /// Status a gateway should answer with when relaying this error.
    pub fn status_analogue(&self) -> u16 {
        match self.kind() {
            ErrorKind::ClientError => 400,
            ErrorKind::ServerError => 500,
            ErrorKind::Timeout => 504,
            ErrorKind::Unavailable => 503,
        }
    }

    pub(crate) fn rejected(url: &str, breaker: &str) -> Self {
        CallError::ServiceUnavailable {
            url: url.to_string(),
            reason: format!("circuit breaker '{}' is open", breaker),
            cause: None,
            breaker_rejected: true,
        }
    }

    pub(crate) fn unavailable(url: &str, reason: impl Into<String>) -> Self {
        CallError::ServiceUnavailable {
            url: url.to_string(),
            reason: reason.into(),
            cause: None,
            breaker_rejected: false,
        }
    }

    pub(crate) fn invalid_request(url: &str, message: impl Into<String>) -> Self {
        CallError::Client {
            url: url.to_string(),
            status: None,
            body: message.into(),
        }
    }

    /// Serialisable description of the error.
    pub fn report(&self) -> ErrorReport {
        let error_type = match self.kind() {
            ErrorKind::ClientError => "Client Error",
            ErrorKind::ServerError => "Server Error",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Unavailable => "External Error",
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        ErrorReport {
            error_type: error_type.to_string(),
            message: self.to_string(),
            status: self.status_analogue(),
            timestamp,
        }
    }
}

/// Error body handed back to whoever relays a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub status: u16,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::TransportFailure;

    #[test]
    fn test_error_display() {
        let err = CallError::Server {
            url: "http://svc/error".into(),
            status: 500,
            body: "Internal Error".into(),
        };
        assert_eq!(
            err.to_string(),
            "Server error [500] on [http://svc/error]: Internal Error"
        );

        let err = CallError::invalid_request("http://svc", "bad payload");
        assert_eq!(err.to_string(), "Client error [-] on [http://svc]: bad payload");
    }

    #[test]
    fn test_status_analogues() {
        let timeout = CallError::Timeout {
            url: "http://svc".into(),
            cause: TransportError::new(TransportFailure::Timeout, "deadline of 5s exceeded"),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(timeout.status_analogue(), 504);

        let rejected = CallError::rejected("http://svc", "externalService");
        assert_eq!(rejected.kind(), ErrorKind::Unavailable);
        assert_eq!(rejected.status_analogue(), 503);
        assert!(rejected.is_breaker_rejected());

        let refused = CallError::unavailable("http://svc", "connection refused");
        assert!(!refused.is_breaker_rejected());
    }

    #[test]
    fn test_report_serialization() {
        let err = CallError::Client {
            url: "http://svc/x".into(),
            status: Some(404),
            body: "missing".into(),
        };
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["type"], "Client Error");
        assert_eq!(json["status"], 400);
        assert!(json["message"].as_str().unwrap().contains("404"));
    }

    #[test]
    fn test_kind_deserializes_snake_case() {
        let kinds: Vec<ErrorKind> = serde_json::from_str(r#"["server_error","unavailable"]"#).unwrap();
        assert_eq!(kinds, vec![ErrorKind::ServerError, ErrorKind::Unavailable]);
    }
}
