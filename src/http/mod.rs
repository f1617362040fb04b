//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! caller (verb, url, body?, headers?)
//!     → context.rs (resolve URL, merge headers, request ID, deadline)
//!     → executor.rs (one round trip under the deadline)
//!     → response.rs (RawResponse or TransportError)
//!     → resilience::classify
//! ```

pub mod context;
pub mod executor;
pub mod response;

pub use context::{CallContext, ExtraHeaders, Verb, X_REQUEST_ID};
pub use executor::{CallExecutor, HttpExecutor};
pub use response::{Outcome, RawResponse, TransportError, TransportFailure};
