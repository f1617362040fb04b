//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and breakers produce:
//!     → tracing events (request start, retry, final outcome, transitions)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every event of a call
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
