//! Run-wide aggregation of request timings, checks and iterations, plus the
//! threshold verdict and reporting built on top of it.

pub mod collector;
pub mod reporter;
pub mod thresholds;
pub mod types;

pub use collector::MetricsCollector;
pub use thresholds::{ThresholdReport, ThresholdResult, Thresholds, THRESHOLDS_BREACHED_EXIT_CODE};
pub use types::*;
