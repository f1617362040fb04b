//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → BreakerRegistry + RequestPipeline constructors
//! ```
//!
//! # Design Decisions
//! - Config is static for the life of the process; no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::CircuitBreakerConfig;
pub use schema::HttpConfig;
pub use schema::ObservabilityConfig;
pub use schema::RetryConfig;
