//! Metrics collection for layout passes

use crate::timing::TimerCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

static GLOBAL_METRICS: OnceLock<Mutex<LayoutMetrics>> = OnceLock::new();

/// Get the global metrics instance.
pub fn global_metrics() -> &'static Mutex<LayoutMetrics> {
    GLOBAL_METRICS.get_or_init(|| Mutex::new(LayoutMetrics::new()))
}

/// Reset the global metrics.
pub fn reset_global_metrics() {
    if let Ok(mut metrics) = global_metrics().lock() {
        metrics.reset();
    }
}

/// Bounded sample store for layout timings.
#[derive(Debug, Clone)]
pub struct LayoutMetrics {
    relayout_times: Vec<f64>,
    refresh_times: Vec<f64>,
    solve_times: Vec<f64>,
    general_times: HashMap<String, Vec<f64>>,
    /// Maximum samples kept per series
    max_samples: usize,
    enabled: bool,
}

impl LayoutMetrics {
    /// Create an enabled collector keeping 1000 samples per series.
    pub fn new() -> Self {
        Self {
            relayout_times: Vec::new(),
            refresh_times: Vec::new(),
            solve_times: Vec::new(),
            general_times: HashMap::new(),
            max_samples: 1000,
            enabled: true,
        }
    }

    /// Builder method to set the per-series sample limit.
    pub fn with_max_samples(mut self, max: usize) -> Self {
        self.max_samples = max;
        self
    }

    /// Enable or disable recording.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether timings are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a timing into the series for its category.
    pub fn record_timing(&mut self, name: &str, duration_ms: f64, category: TimerCategory) {
        if !self.enabled {
            return;
        }

        let max = self.max_samples;
        let series = match category {
            TimerCategory::Relayout => &mut self.relayout_times,
            TimerCategory::Refresh => &mut self.refresh_times,
            TimerCategory::Solve => &mut self.solve_times,
            TimerCategory::General => self.general_times.entry(name.to_string()).or_default(),
        };
        push_bounded(series, duration_ms, max);

        tracing::trace!(
            target: "perf::layout",
            name = name,
            category = ?category,
            duration_ms = duration_ms,
            "timing recorded"
        );
    }

    /// Compute statistics for every series.
    pub fn summary(&self) -> LayoutSummary {
        LayoutSummary {
            relayout_stats: TimingStats::from_samples(&self.relayout_times),
            refresh_stats: TimingStats::from_samples(&self.refresh_times),
            solve_stats: TimingStats::from_samples(&self.solve_times),
            general_stats: self
                .general_times
                .iter()
                .map(|(name, times)| (name.clone(), TimingStats::from_samples(times)))
                .collect(),
            total_relayouts: self.relayout_times.len(),
            total_refreshes: self.refresh_times.len(),
        }
    }

    /// Drop all recorded samples.
    pub fn reset(&mut self) {
        self.relayout_times.clear();
        self.refresh_times.clear();
        self.solve_times.clear();
        self.general_times.clear();
    }

    /// Recorded relayout durations in milliseconds.
    pub fn relayout_times(&self) -> &[f64] {
        &self.relayout_times
    }

    /// Recorded refresh durations in milliseconds.
    pub fn refresh_times(&self) -> &[f64] {
        &self.refresh_times
    }
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded(series: &mut Vec<f64>, value: f64, max: usize) {
    if max == 0 {
        return;
    }
    if series.len() >= max {
        series.remove(0);
    }
    series.push(value);
}

/// Summary of collected layout timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSummary {
    pub relayout_stats: TimingStats,
    pub refresh_stats: TimingStats,
    pub solve_stats: TimingStats,
    pub general_stats: HashMap<String, TimingStats>,
    pub total_relayouts: usize,
    pub total_refreshes: usize,
}

/// Statistical summary of timing data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingStats {
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub total_ms: f64,
}

impl TimingStats {
    /// Compute statistics over `samples` (milliseconds).
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let count = samples.len();
        let mut sorted: Vec<f64> = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let total_ms: f64 = samples.iter().sum();
        let median_ms = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Self {
            count,
            min_ms: sorted[0],
            max_ms: sorted[count - 1],
            mean_ms: total_ms / count as f64,
            median_ms,
            p95_ms: percentile(&sorted, 95.0),
            total_ms,
        }
    }
}

/// Linear-interpolated percentile of sorted samples.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (p / 100.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (rank.ceil() as usize).min(len - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}
