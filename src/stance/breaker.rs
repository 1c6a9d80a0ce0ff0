//! Circuit breaker for the remote stance tier.
//!
//! Closed → Open after `threshold` consecutive failures; Open → HalfOpen once
//! the cooldown has elapsed. In HalfOpen exactly one caller wins the trial call
//! (CAS on the deadline); success closes the breaker, failure re-opens it.
//!
//! State lives in atomics so one instance can be shared by concurrent requests.
//! Time comes from an injected [`Clock`] so tests can drive it by hand.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic milliseconds since an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock backed by `Instant`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // Start at 1 so that 0 can mean "closed" in the deadline slot.
        self.origin.elapsed().as_millis() as u64 + 1
    }
}

/// Hand-driven clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub threshold: u32,
    pub cooldown_ms: u64,
}

pub struct CircuitBreaker {
    threshold: u32,
    cooldown_ms: u64,
    failures: AtomicU32,
    /// 0 = closed, otherwise the clock reading at which a trial call is allowed.
    open_until: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("threshold", &self.threshold)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("failures", &self.failures.load(Ordering::SeqCst))
            .field("open_until", &self.open_until.load(Ordering::SeqCst))
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self::with_clock(threshold, cooldown, Arc::new(SystemClock::default()))
    }

    pub fn with_clock(threshold: u32, cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown_ms: cooldown.as_millis() as u64,
            failures: AtomicU32::new(0),
            open_until: AtomicU64::new(0),
            clock,
        }
    }

    pub fn state(&self) -> BreakerState {
        let until = self.open_until.load(Ordering::SeqCst);
        if until == 0 {
            BreakerState::Closed
        } else if self.clock.now_ms() < until {
            BreakerState::Open
        } else {
            BreakerState::HalfOpen
        }
    }

    /// Whether a remote call may proceed now. In HalfOpen only the first caller
    /// gets `true`; it pushes the deadline out so concurrent callers stay short-circuited.
    pub fn try_acquire(&self) -> bool {
        let until = self.open_until.load(Ordering::SeqCst);
        if until == 0 {
            return true;
        }
        let now = self.clock.now_ms();
        if now < until {
            return false;
        }
        let next = now.saturating_add(self.cooldown_ms).max(1);
        self.open_until
            .compare_exchange(until, next, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
        self.open_until.store(0, Ordering::SeqCst);
    }

    /// Returns `true` when this failure (re)opened the breaker.
    pub fn record_failure(&self) -> bool {
        let n = self.failures.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if n >= self.threshold {
            let until = self.clock.now_ms().saturating_add(self.cooldown_ms).max(1);
            self.open_until.store(until, Ordering::SeqCst);
            return true;
        }
        false
    }

    pub fn reset(&self) {
        self.record_success();
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state(),
            consecutive_failures: self.failures.load(Ordering::SeqCst),
            threshold: self.threshold,
            cooldown_ms: self.cooldown_ms,
        }
    }
}
