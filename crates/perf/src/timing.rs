//! Timing utilities for layout passes

use std::time::{Duration, Instant};

/// A timer that measures elapsed time from creation to drop.
///
/// With the `telemetry` feature enabled the timer emits a `tracing` event
/// and records into [`crate::global_metrics`] when dropped.
///
/// # Example
///
/// ```rust
/// use perf::PerfTimer;
///
/// fn refresh() {
///     let _timer = PerfTimer::refresh("refresh");
///     // ... write solved geometry back ...
/// }
/// ```
pub struct PerfTimer {
    name: &'static str,
    start: Instant,
    category: TimerCategory,
}

/// Kind of layout work being timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerCategory {
    /// Table rebuild plus constraint generation plus solver setup
    Relayout,
    /// Resolve for the current size and write geometry back
    Refresh,
    /// Solver session initialisation alone
    Solve,
    /// Anything else
    General,
}

impl PerfTimer {
    /// Start a timer in the `General` category.
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self::with_category(name, TimerCategory::General)
    }

    /// Start a timer in the given category.
    #[inline]
    pub fn with_category(name: &'static str, category: TimerCategory) -> Self {
        Self {
            name,
            start: Instant::now(),
            category,
        }
    }

    /// Start a timer for a relayout pass.
    #[inline]
    pub fn relayout(name: &'static str) -> Self {
        Self::with_category(name, TimerCategory::Relayout)
    }

    /// Start a timer for a refresh pass.
    #[inline]
    pub fn refresh(name: &'static str) -> Self {
        Self::with_category(name, TimerCategory::Refresh)
    }

    /// Start a timer for solver session setup.
    #[inline]
    pub fn solve(name: &'static str) -> Self {
        Self::with_category(name, TimerCategory::Solve)
    }

    /// Get the elapsed time in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Get the elapsed time as a `Duration`.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Name the timer was started with.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Category the timing is recorded under.
    #[inline]
    pub fn category(&self) -> TimerCategory {
        self.category
    }

    /// Stop the timer and return the elapsed milliseconds without recording.
    #[inline]
    pub fn stop(self) -> f64 {
        let elapsed = self.elapsed_ms();
        std::mem::forget(self);
        elapsed
    }
}

#[cfg(feature = "telemetry")]
impl Drop for PerfTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();

        tracing::trace!(
            target: "perf",
            name = self.name,
            category = ?self.category,
            elapsed_ms = elapsed_ms,
            "timer completed"
        );

        if let Ok(mut metrics) = crate::global_metrics().lock() {
            metrics.record_timing(self.name, elapsed_ms, self.category);
        }
    }
}

/// Time the rest of the enclosing scope.
///
/// ```rust
/// use perf::time_scope;
///
/// fn work() {
///     time_scope!("work");
/// }
/// ```
#[macro_export]
macro_rules! time_scope {
    ($name:expr) => {
        let _timer = $crate::PerfTimer::new($name);
    };
    ($name:expr, $category:expr) => {
        let _timer = $crate::PerfTimer::with_category($name, $category);
    };
}

/// Measures named intervals without recording on drop.
pub struct Stopwatch {
    start: Instant,
    checkpoints: Vec<(&'static str, Duration)>,
}

impl Stopwatch {
    /// Start a stopwatch with no checkpoints.
    #[inline]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            checkpoints: Vec::new(),
        }
    }

    /// Record the time since start under `name`.
    #[inline]
    pub fn checkpoint(&mut self, name: &'static str) {
        self.checkpoints.push((name, self.start.elapsed()));
    }

    /// All checkpoints recorded so far.
    #[inline]
    pub fn checkpoints(&self) -> &[(&'static str, Duration)] {
        &self.checkpoints
    }

    /// Time between checkpoint `index` and the one before it.
    pub fn interval(&self, index: usize) -> Option<Duration> {
        let end = self.checkpoints.get(index)?.1;
        let start = match index {
            0 => Duration::ZERO,
            i => self.checkpoints[i - 1].1,
        };
        Some(end - start)
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
