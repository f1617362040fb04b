//! Per-invocation call context.
//!
//! # Responsibilities
//! - Resolve the target URL (absolute, or relative to a configured base)
//! - Merge caller headers on top of the default headers
//! - Carry the encoded body and the per-attempt timeout
//! - Tag every logical call with a request ID reused across its attempts
//!
//! # Design Decisions
//! - Built once, never mutated; attempts borrow it
//! - Caller headers are appended, so defaults are never replaced
//! - Bodies only travel with POST/PUT/PATCH

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use url::Url;
use uuid::Uuid;

use crate::error::CallError;

/// Header carrying the call's correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Extra headers a caller attaches to one call.
pub type ExtraHeaders = HashMap<String, String>;

/// HTTP verbs the pipeline exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// Whether the verb carries a JSON payload.
    pub fn has_body(&self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Patch)
    }

    pub fn method(&self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            other => Err(format!("unsupported verb '{}'", other)),
        }
    }
}

/// Everything one invocation needs to perform its attempts.
#[derive(Debug, Clone)]
pub struct CallContext {
    verb: Verb,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Duration,
    request_id: String,
}

impl CallContext {
    /// Build a context, resolving `target` against `base_url` when relative.
    pub fn build(
        verb: Verb,
        target: &str,
        base_url: Option<&Url>,
        defaults: &HeaderMap,
        extra: Option<&ExtraHeaders>,
        body: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<Self, CallError> {
        let url = resolve_url(target, base_url)?;

        let mut headers = defaults.clone();
        if let Some(extra) = extra {
            for (name, value) in extra {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    CallError::invalid_request(target, format!("invalid header name '{}': {}", name, e))
                })?;
                let value = HeaderValue::from_str(value).map_err(|e| {
                    CallError::invalid_request(target, format!("invalid value for header '{}': {}", name, e))
                })?;
                headers.append(name, value);
            }
        }

        let request_id = match headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                if let Ok(value) = HeaderValue::from_str(&id) {
                    headers.insert(X_REQUEST_ID, value);
                }
                id
            }
        };

        let body = if verb.has_body() {
            match body {
                Some(bytes) => Some(bytes),
                None => {
                    return Err(CallError::invalid_request(
                        target,
                        format!("{} requires a request body", verb),
                    ))
                }
            }
        } else {
            if body.is_some() {
                tracing::debug!(method = %verb, url = %url, "Dropping body for bodyless verb");
            }
            None
        };

        Ok(Self {
            verb,
            url,
            headers,
            body,
            timeout,
            request_id,
        })
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Hard deadline applied to each attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

fn resolve_url(target: &str, base_url: Option<&Url>) -> Result<Url, CallError> {
    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base_url {
            Some(base) => base
                .join(target)
                .map_err(|e| CallError::invalid_request(target, format!("invalid URL: {}", e))),
            None => Err(CallError::invalid_request(
                target,
                "relative URL given but no base_url is configured",
            )),
        },
        Err(e) => Err(CallError::invalid_request(target, format!("invalid URL: {}", e))),
    }
}

/// Default headers from configuration.
pub fn header_map(headers: &std::collections::BTreeMap<String, String>) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name '{}': {}", name, e))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| format!("invalid value for header '{}': {}", name, e))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}
