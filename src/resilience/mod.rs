//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Each attempt of an outbound call:
//!     → circuit_breaker.rs (admission: closed / open / half-open)
//!     → timeouts.rs (hard deadline around the network exchange)
//!     → classify.rs (outcome → error kind)
//!     → circuit_breaker.rs (record outcome into the sliding window)
//!     → retries.rs (retry after a fixed delay, or stop)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Breakers are per target name, held in registry.rs
//! - 4xx are never retried; 5xx and transport failures are
//! - All policy is plain data built from configuration

pub mod circuit_breaker;
pub mod classify;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerPermit, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use registry::BreakerRegistry;
pub use retries::RetryPolicy;
