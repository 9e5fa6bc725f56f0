//! Layout Pass Telemetry
//!
//! Timing utilities and a metrics collector for the constraint layout
//! engine:
//! - RAII scope timers tagged with the kind of pass they measure
//! - A bounded, process-wide collector of relayout/refresh/solve timings
//!
//! # Feature Flags
//!
//! - `telemetry` (default): timers log through `tracing` and record into
//!   the global metrics on drop
//!
//! # Example
//!
//! ```rust
//! use perf::{global_metrics, time_scope, TimerCategory};
//!
//! fn relayout() {
//!     time_scope!("relayout", TimerCategory::Relayout);
//!     // ... build the layout table, generate constraints ...
//! }
//!
//! relayout();
//! let summary = global_metrics().lock().unwrap().summary();
//! assert!(summary.total_relayouts >= 1);
//! ```

mod metrics;
mod timing;

pub use metrics::*;
pub use timing::*;
