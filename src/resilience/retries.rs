//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retried
//! - Provide the fixed wait between attempts
//!
//! # Design Decisions
//! - Budget counts attempts, not retries: `max_attempts = 3` is 1 + 2 retries
//! - Terminal kinds win over retryable kinds
//! - 4xx are never retried by default
//! - Fixed delay, no exponential growth

use std::collections::HashSet;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::ErrorKind;

/// Immutable retry budget for one pipeline.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    retryable: HashSet<ErrorKind>,
    terminal: HashSet<ErrorKind>,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.inter_attempt_delay_ms),
            retryable: config.retryable_kinds.iter().copied().collect(),
            terminal: config.terminal_kinds.iter().copied().collect(),
        }
    }

    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn should_retry(&self, attempt: u32, kind: ErrorKind) -> bool {
        attempt < self.max_attempts && self.retryable.contains(&kind) && !self.terminal.contains(&kind)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait between two attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_terminal(&self, kind: ErrorKind) -> bool {
        self.terminal.contains(&kind) || !self.retryable.contains(&kind)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}
