//! Error classification.
//!
//! # Responsibilities
//! - Map an attempt's outcome to an `ErrorKind` (or none on success)
//! - Turn a classified outcome into the caller-facing `CallError`
//!
//! # Design Decisions
//! - Pure functions, no I/O, shared by the blocking and non-blocking paths
//! - Total over all statuses: anything that is not 1xx/2xx/3xx is an error
//! - Bodies are truncated before they are stored in an error

use crate::error::{CallError, ErrorKind};
use crate::http::response::Outcome;

/// Largest body snippet kept in an error, in bytes.
pub const MAX_BODY_SNIPPET: usize = 1024;

const DEFAULT_CLIENT_MESSAGE: &str = "client error";
const DEFAULT_SERVER_MESSAGE: &str = "server error";

/// Classify an HTTP status.
pub fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        100..=399 => None,
        400..=499 => Some(ErrorKind::ClientError),
        // Codes past 599 are non-standard; treat them as target faults.
        _ => Some(ErrorKind::ServerError),
    }
}

/// Classify the outcome of one attempt.
pub fn classify(outcome: &Outcome) -> Option<ErrorKind> {
    match outcome {
        Ok(raw) => classify_status(raw.status),
        Err(e) if e.is_timeout() => Some(ErrorKind::Timeout),
        Err(_) => Some(ErrorKind::Unavailable),
    }
}

/// Map an outcome to the body or the typed error for `url`.
pub fn into_result(url: &str, outcome: Outcome) -> Result<String, CallError> {
    let kind = classify(&outcome);
    match (kind, outcome) {
        (None, Ok(raw)) => Ok(raw.body),
        (Some(ErrorKind::ClientError), Ok(raw)) => Err(CallError::Client {
            url: url.to_string(),
            status: Some(raw.status),
            body: snippet(&raw.body, DEFAULT_CLIENT_MESSAGE),
        }),
        (Some(_), Ok(raw)) => Err(CallError::Server {
            url: url.to_string(),
            status: raw.status,
            body: snippet(&raw.body, DEFAULT_SERVER_MESSAGE),
        }),
        (_, Err(cause)) if cause.is_timeout() => Err(CallError::Timeout {
            url: url.to_string(),
            cause,
        }),
        (_, Err(cause)) => Err(CallError::ServiceUnavailable {
            url: url.to_string(),
            reason: format!("Connection error to {}", url),
            cause: Some(cause),
            breaker_rejected: false,
        }),
    }
}

fn snippet(body: &str, default: &str) -> String {
    if body.is_empty() {
        return default.to_string();
    }
    if body.len() <= MAX_BODY_SNIPPET {
        return body.to_string();
    }
    let mut end = MAX_BODY_SNIPPET;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
