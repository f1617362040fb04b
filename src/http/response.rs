//! Raw outcome of a single network attempt.
//!
//! # Responsibilities
//! - Hold status, headers and body of an answered request
//! - Describe transport failures (deadline, connect, I/O)
//!
//! # Design Decisions
//! - Bodies are fully buffered; a partial body is never returned
//! - Deadline exhaustion is a distinct failure so the classifier can tell
//!   it apart from connection errors

use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;

/// Answer received from the target.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Why an attempt produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// The per-attempt deadline passed.
    Timeout,
    /// Connection could not be established (refused, DNS, TLS).
    Connect,
    /// Connection broke while sending or reading.
    Io,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::Connect => write!(f, "connect error"),
            TransportFailure::Io => write!(f, "I/O error"),
        }
    }
}

/// Transport-level failure of one attempt.
#[derive(Debug, Error)]
#[error("{failure}: {message}")]
pub struct TransportError {
    pub failure: TransportFailure,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
}

impl TransportError {
    pub fn new(failure: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
            source: None,
        }
    }

    pub fn deadline_exceeded(timeout: Duration) -> Self {
        Self::new(
            TransportFailure::Timeout,
            format!("no response within {:?}", timeout),
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.failure == TransportFailure::Timeout
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let failure = if err.is_timeout() {
            TransportFailure::Timeout
        } else if err.is_connect() {
            TransportFailure::Connect
        } else {
            TransportFailure::Io
        };
        Self {
            failure,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result of one network round trip.
pub type Outcome = Result<RawResponse, TransportError>;
