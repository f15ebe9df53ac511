// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use minstant::Anchor;
use minstant::Instant;

/// A source of wall-clock timestamps for records.
///
/// The tracer reads the clock at fixed points of the span lifecycle. Swapping
/// in a [`TestClock`] makes those reads deterministic without touching any
/// global state.
pub trait Clock: Send + Sync + 'static {
    /// Current time in integer microseconds since the Unix epoch.
    fn now_micros(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now_micros(&self) -> i64 {
        (**self).now_micros()
    }
}

/// The default clock, backed by TSC-based instants anchored to unix time.
pub struct SystemClock {
    anchor: Anchor,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor: Anchor::new(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_micros(&self) -> i64 {
        (Instant::now().as_unix_nanos(&self.anchor) / 1_000) as i64
    }
}

/// A deterministic clock for tests.
///
/// Time only moves when told to: either by an explicit [`advance`], or by a
/// fixed step applied on every read when constructed with [`with_step`].
///
/// [`advance`]: TestClock::advance
/// [`with_step`]: TestClock::with_step
pub struct TestClock {
    now: AtomicI64,
    step: i64,
}

impl TestClock {
    /// A clock frozen at `start_micros` until advanced by hand.
    pub fn new(start_micros: i64) -> Self {
        Self {
            now: AtomicI64::new(start_micros),
            step: 0,
        }
    }

    /// A clock that moves forward by `step` on every read, starting one step
    /// after `start_micros`.
    pub fn with_step(start_micros: i64, step: Duration) -> Self {
        Self {
            now: AtomicI64::new(start_micros),
            step: step.as_micros() as i64,
        }
    }

    pub fn advance(&self, d: Duration) {
        self.now.fetch_add(d.as_micros() as i64, Ordering::Relaxed);
    }

    /// Jump to an absolute time, backwards included.
    pub fn set(&self, micros: i64) {
        self.now.store(micros, Ordering::Relaxed);
    }
}

impl Clock for TestClock {
    #[inline]
    fn now_micros(&self) -> i64 {
        self.now.fetch_add(self.step, Ordering::Relaxed) + self.step
    }
}
