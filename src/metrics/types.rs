//! Metric types

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// How a single journey iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationOutcome {
    /// Every step was attempted.
    Completed,
    /// Login produced no access token.
    HaltedWithoutToken,
    /// Create produced no resource id.
    HaltedWithoutResource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub passes: u64,
    pub fails: u64,
}

impl CheckTally {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.passes as f64 / total as f64),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IterationCounts {
    pub completed: u64,
    pub halted_without_token: u64,
    pub halted_without_resource: u64,
    /// Aborted by the driver after the graceful-stop window.
    pub interrupted: u64,
}

impl IterationCounts {
    /// Iterations that ran to an outcome, halted or not.
    pub fn finished(&self) -> u64 {
        self.completed + self.halted_without_token + self.halted_without_resource
    }
}

/// Latency distribution in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub med_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    /// Builds stats from a histogram recorded in microseconds.
    ///
    /// Percentiles report the lower edge of their bucket, so a latency that
    /// was recorded below a limit never reads as at or above it.
    pub fn from_micros(hist: &Histogram<u64>) -> Self {
        if hist.is_empty() {
            return Self::default();
        }
        let ms = |us: u64| us as f64 / 1_000.0;
        let quantile = |q: f64| ms(hist.lowest_equivalent(hist.value_at_quantile(q)));
        Self {
            count: hist.len(),
            min_ms: ms(hist.min()),
            avg_ms: hist.mean() / 1_000.0,
            med_ms: quantile(0.50),
            p90_ms: quantile(0.90),
            p95_ms: quantile(0.95),
            p99_ms: quantile(0.99),
            max_ms: ms(hist.max()),
        }
    }
}

/// Point-in-time view of everything the collector has aggregated.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub http_req_duration: LatencyStats,
    pub steps: BTreeMap<String, LatencyStats>,
    pub checks: BTreeMap<String, CheckTally>,
    pub iterations: IterationCounts,
    pub iteration_duration: LatencyStats,
    pub vus: u32,
    pub vus_max: u32,
}

impl Summary {
    /// All checks folded into one tally.
    pub fn check_totals(&self) -> CheckTally {
        self.checks.values().fold(CheckTally::default(), |acc, t| CheckTally {
            passes: acc.passes + t.passes,
            fails: acc.fails + t.fails,
        })
    }

    pub fn check_rate(&self) -> Option<f64> {
        self.check_totals().rate()
    }

    pub fn http_req_failed_rate(&self) -> f64 {
        if self.http_reqs == 0 {
            0.0
        } else {
            self.http_req_failed as f64 / self.http_reqs as f64
        }
    }

    pub fn requests_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.http_reqs as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}
