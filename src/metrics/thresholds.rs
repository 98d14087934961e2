//! Pass/fail conditions evaluated over the aggregated run.

use serde::Serialize;
use std::fmt;

use super::types::Summary;
use crate::config::ThresholdConfig;

/// Exit status used when at least one threshold is breached.
pub const THRESHOLDS_BREACHED_EXIT_CODE: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Percentile {
    P90,
    P95,
}

impl Percentile {
    fn observe(&self, summary: &Summary) -> f64 {
        let stats = &summary.http_req_duration;
        match self {
            Percentile::P90 => stats.p90_ms,
            Percentile::P95 => stats.p95_ms,
        }
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percentile::P90 => f.write_str("p(90)"),
            Percentile::P95 => f.write_str("p(95)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    /// Request duration percentile strictly below `limit_ms`.
    DurationBelow { percentile: Percentile, limit_ms: f64 },
    /// Share of passing checks at or above `min_rate`.
    CheckRateAtLeast { min_rate: f64 },
}

impl Threshold {
    pub fn name(&self) -> String {
        match self {
            Threshold::DurationBelow { percentile, limit_ms } => {
                format!("http_req_duration {percentile}<{limit_ms}")
            }
            Threshold::CheckRateAtLeast { min_rate } => format!("checks rate>={min_rate}"),
        }
    }

    pub fn evaluate(&self, summary: &Summary) -> ThresholdResult {
        let (passed, observed) = match self {
            Threshold::DurationBelow {
                percentile,
                limit_ms,
            } => {
                let observed = percentile.observe(summary);
                (observed < *limit_ms, Some(observed))
            }
            // No checks recorded means nothing was verified.
            Threshold::CheckRateAtLeast { min_rate } => match summary.check_rate() {
                Some(rate) => (rate >= *min_rate, Some(rate)),
                None => (false, None),
            },
        };
        ThresholdResult {
            name: self.name(),
            passed,
            observed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub name: String,
    pub passed: bool,
    pub observed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdReport {
    pub results: Vec<ThresholdResult>,
}

impl ThresholdReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn breached(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Process exit status for a run that completed with this verdict.
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            THRESHOLDS_BREACHED_EXIT_CODE
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    thresholds: Vec<Threshold>,
}

impl Thresholds {
    pub fn new(thresholds: Vec<Threshold>) -> Self {
        Self { thresholds }
    }

    pub fn from_config(cfg: &ThresholdConfig) -> Self {
        Self::new(vec![
            Threshold::DurationBelow {
                percentile: Percentile::P90,
                limit_ms: cfg.p90_ms,
            },
            Threshold::DurationBelow {
                percentile: Percentile::P95,
                limit_ms: cfg.p95_ms,
            },
            Threshold::CheckRateAtLeast {
                min_rate: cfg.check_rate,
            },
        ])
    }

    pub fn evaluate(&self, summary: &Summary) -> ThresholdReport {
        ThresholdReport {
            results: self.thresholds.iter().map(|t| t.evaluate(summary)).collect(),
        }
    }
}
