//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! caller thread / task
//!     → client.rs (encode body, build CallContext)
//!     → workers.rs (spawn onto the internal runtime)
//!     → runner.rs (admission → execute → classify → record → retry)
//!     → blocking caller: result over a channel
//!     → async caller: handle.rs future resolves
//! ```

pub mod client;
pub mod handle;
mod runner;
pub mod workers;

pub use client::{PipelineError, RequestPipeline};
pub use handle::CallHandle;
