//! Circuit breaker for target protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: target assumed down, calls fail fast
//! - Half-Open: a few trial calls test whether the target recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: recorded >= minimum_calls and failure rate >= threshold
//! Open → Half-Open: wait_duration elapsed since opening
//! Half-Open → Closed: half_open_permits trials all succeed (window cleared)
//! Half-Open → Open: any trial fails
//! ```
//!
//! # Design Decisions
//! - Count-based sliding window with fixed capacity
//! - Window and state live behind one mutex so no transition is lost
//! - Admission hands out an RAII permit; outcomes are recorded through it
//! - Outcomes from a previous state generation are ignored

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::error::ErrorKind;
use crate::observability::metrics;

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Returned when the breaker refuses a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    pub state: CircuitState,
}

/// Fixed-capacity record of the most recent outcomes.
#[derive(Debug)]
struct SlidingWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
    failures: usize,
}

impl SlidingWindow {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
        }
    }

    fn push(&mut self, failed: bool) {
        if self.outcomes.len() == self.capacity {
            if let Some(true) = self.outcomes.pop_front() {
                self.failures -= 1;
            }
        }
        self.outcomes.push_back(failed);
        if failed {
            self.failures += 1;
        }
    }

    fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Failure percentage, 0.0 when empty.
    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.failures as f64 * 100.0 / self.outcomes.len() as f64
    }

    fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    window: SlidingWindow,
    opened_at: Option<Instant>,
    trials_admitted: u32,
    trial_successes: u32,
    generation: u64,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub failure_rate: f64,
}

/// Named circuit breaker shared by every call to one target.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    minimum_calls: usize,
    failure_rate_threshold: f64,
    wait_duration: Duration,
    half_open_permits: u32,
    recorded_kinds: HashSet<ErrorKind>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        metrics::record_breaker_state(&config.name, CircuitState::Closed);
        Self {
            name: config.name.clone(),
            minimum_calls: config.minimum_calls.max(1),
            failure_rate_threshold: config.failure_rate_threshold,
            wait_duration: Duration::from_millis(config.wait_duration_ms),
            half_open_permits: config.half_open_permits.max(1),
            recorded_kinds: config.recorded_kinds.iter().copied().collect(),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window: SlidingWindow::new(config.window_size),
                opened_at: None,
                trials_admitted: 0,
                trial_successes: 0,
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, applying the Open → Half-Open timer.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.maybe_half_open(&mut inner, Instant::now());
        inner.state
    }

    /// Whether an error of this kind counts as a failure in the window.
    pub fn counts_as_failure(&self, kind: ErrorKind) -> bool {
        self.recorded_kinds.contains(&kind)
    }

    /// Ask to perform one call.
    pub fn try_acquire(self: &Arc<Self>) -> Result<BreakerPermit, Rejected> {
        let mut inner = self.lock();
        self.maybe_half_open(&mut inner, Instant::now());

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                metrics::record_breaker_rejection(&self.name);
                return Err(Rejected {
                    state: CircuitState::Open,
                });
            }
            CircuitState::HalfOpen => {
                if inner.trials_admitted >= self.half_open_permits {
                    metrics::record_breaker_rejection(&self.name);
                    return Err(Rejected {
                        state: CircuitState::HalfOpen,
                    });
                }
                inner.trials_admitted += 1;
                true
            }
        };

        Ok(BreakerPermit {
            breaker: Arc::clone(self),
            generation: inner.generation,
            trial,
            settled: false,
        })
    }

    /// Force the breaker closed with an empty window.
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Closed, Instant::now());
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.lock();
        self.maybe_half_open(&mut inner, Instant::now());
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            buffered_calls: inner.window.len(),
            failed_calls: inner.window.failures,
            failure_rate: inner.window.failure_rate(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every update completes before the guard drops, so a poisoned
        // lock still holds a consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn maybe_half_open(&self, inner: &mut Inner, now: Instant) {
        if inner.state != CircuitState::Open {
            return;
        }
        let elapsed = inner
            .opened_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or(self.wait_duration);
        if elapsed >= self.wait_duration {
            self.transition(inner, CircuitState::HalfOpen, now);
        }
    }

    fn record(&self, generation: u64, trial: bool, failed: bool) {
        let now = Instant::now();
        let mut inner = self.lock();
        if generation != inner.generation {
            tracing::trace!(breaker = %self.name, "Ignoring outcome from previous breaker state");
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.push(failed);
                if inner.window.len() >= self.minimum_calls
                    && inner.window.failure_rate() >= self.failure_rate_threshold
                {
                    let rate = inner.window.failure_rate();
                    self.transition(&mut inner, CircuitState::Open, now);
                    tracing::warn!(
                        breaker = %self.name,
                        failure_rate = rate,
                        threshold = self.failure_rate_threshold,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen if trial => {
                if failed {
                    self.transition(&mut inner, CircuitState::Open, now);
                    tracing::warn!(breaker = %self.name, "Trial call failed, circuit breaker re-opened");
                } else {
                    inner.trial_successes += 1;
                    if inner.trial_successes >= self.half_open_permits {
                        self.transition(&mut inner, CircuitState::Closed, now);
                    }
                }
            }
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if generation == inner.generation
            && inner.state == CircuitState::HalfOpen
            && inner.trials_admitted > 0
        {
            inner.trials_admitted -= 1;
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.trials_admitted = 0;
        inner.trial_successes = 0;
        match to {
            CircuitState::Open => inner.opened_at = Some(now),
            CircuitState::Closed => {
                inner.window.clear();
                inner.opened_at = None;
            }
            CircuitState::HalfOpen => {}
        }

        if from != to {
            tracing::info!(breaker = %self.name, from = %from, to = %to, "Circuit breaker state change");
        }
        metrics::record_breaker_state(&self.name, to);
    }
}

/// Admission ticket for one call.
///
/// Dropping it without recording releases a half-open trial slot and leaves
/// the window untouched.
#[derive(Debug)]
pub struct BreakerPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl BreakerPermit {
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.record(self.generation, self.trial, false);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.record(self.generation, self.trial, true);
    }

    /// Record the outcome of a failed call, honouring `recorded_kinds`.
    pub fn record_error(self, kind: ErrorKind) {
        if self.breaker.counts_as_failure(kind) {
            self.record_failure();
        } else {
            self.record_success();
        }
    }

    /// Whether this call is a half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release(self.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(&CircuitBreakerConfig::default()))
    }

    fn fail(cb: &Arc<CircuitBreaker>, n: usize) {
        for _ in 0..n {
            cb.try_acquire().unwrap().record_failure();
        }
    }

    fn succeed(cb: &Arc<CircuitBreaker>, n: usize) {
        for _ in 0..n {
            cb.try_acquire().unwrap().record_success();
        }
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = SlidingWindow::new(3);
        window.push(true);
        window.push(false);
        window.push(false);
        assert_eq!(window.failures, 1);
        window.push(false);
        assert_eq!(window.len(), 3);
        assert_eq!(window.failures, 0);
        assert_eq!(window.failure_rate(), 0.0);
    }

    #[test]
    fn test_stays_closed_below_minimum_calls() {
        let cb = breaker();
        fail(&cb, 4);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_five_failures_open_and_reject() {
        let cb = breaker();
        fail(&cb, 5);
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.try_acquire().unwrap_err().state, CircuitState::Open);
    }

    #[test]
    fn test_failure_rate_threshold() {
        let cb = breaker();
        succeed(&cb, 6);
        fail(&cb, 4);
        // 4 of 10 failed: 40% stays closed.
        assert_eq!(cb.state(), CircuitState::Closed);
        // Oldest success evicted: 5 of 10 failed.
        fail(&cb, 1);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_wait_with_two_trials() {
        let cb = breaker();
        fail(&cb, 5);
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let first = cb.try_acquire().unwrap();
        let second = cb.try_acquire().unwrap();
        assert!(first.is_trial() && second.is_trial());
        assert!(cb.try_acquire().is_err(), "only two trials are admitted");

        first.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        second.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().buffered_calls, 0, "window cleared on close");
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_failure_reopens() {
        let cb = breaker();
        fail(&cb, 5);
        tokio::time::advance(Duration::from_secs(10)).await;

        cb.try_acquire().unwrap().record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // opened_at was reset by the trial failure.
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cb.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_releases_slot() {
        let cb = breaker();
        fail(&cb, 5);
        tokio::time::advance(Duration::from_secs(10)).await;

        let a = cb.try_acquire().unwrap();
        let b = cb.try_acquire().unwrap();
        drop(b);
        let c = cb.try_acquire().expect("released slot is reusable");
        a.record_success();
        c.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_stale_outcome_ignored_after_trip() {
        let cb = breaker();
        let late = cb.try_acquire().unwrap();
        fail(&cb, 5);
        assert_eq!(cb.state(), CircuitState::Open);
        late.record_success();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_client_errors_open_breaker_by_default() {
        let cb = breaker();
        for _ in 0..4 {
            cb.try_acquire().unwrap().record_error(ErrorKind::ClientError);
        }
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.try_acquire().unwrap().record_error(ErrorKind::ClientError);
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert_eq!(snap.failed_calls, 5);
        assert!(cb.try_acquire().is_err());
    }

    #[test]
    fn test_unrecorded_kinds_count_as_success() {
        let config = CircuitBreakerConfig {
            recorded_kinds: vec![ErrorKind::ServerError, ErrorKind::Timeout, ErrorKind::Unavailable],
            ..CircuitBreakerConfig::default()
        };
        let cb = Arc::new(CircuitBreaker::new(&config));
        for _ in 0..10 {
            cb.try_acquire().unwrap().record_error(ErrorKind::ClientError);
        }
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.failed_calls, 0);
        assert_eq!(snap.buffered_calls, 10);
    }

    #[test]
    fn test_concurrent_failures_always_trip() {
        let cb = breaker();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cb = cb.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if let Ok(permit) = cb.try_acquire() {
                            permit.record_failure();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_reset() {
        let cb = breaker();
        fail(&cb, 5);
        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().buffered_calls, 0);
    }
}
