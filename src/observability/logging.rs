//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for binaries
//!
//! # Design Decisions
//! - The library only emits `tracing` events; installing a subscriber is
//!   left to the binary
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install a formatting subscriber filtered by `RUST_LOG` or the config.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("resilient_client={level},resilient_call={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}
