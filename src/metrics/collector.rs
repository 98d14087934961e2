//! Metrics collector - thread-safe aggregation shared by every virtual user

use super::types::{CheckTally, IterationCounts, IterationOutcome, LatencyStats, Summary};
use crate::domain::Step;
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<CollectorState>>,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    start_time: Instant,
}

struct CollectorState {
    http_reqs: u64,
    http_req_failed: u64,
    req_durations: Histogram<u64>,
    step_durations: BTreeMap<Step, Histogram<u64>>,
    checks: BTreeMap<String, CheckTally>,
    iterations: IterationCounts,
    iteration_durations: Histogram<u64>,
    vus: u32,
    vus_max: u32,
}

fn new_histogram() -> Histogram<u64> {
    // 3 significant digits, auto-resizing
    Histogram::new(3).expect("3 significant figures is a valid histogram precision")
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectorState {
                http_reqs: 0,
                http_req_failed: 0,
                req_durations: new_histogram(),
                step_durations: BTreeMap::new(),
                checks: BTreeMap::new(),
                iterations: IterationCounts::default(),
                iteration_durations: new_histogram(),
                vus: 0,
                vus_max: 0,
            })),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            start_time: Instant::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Records one HTTP exchange. Status 0 stands for a transport error.
    pub fn record_request(&self, step: Step, status: u16, duration: Duration) {
        let us = micros(duration);
        let mut state = self.state.lock();
        state.http_reqs += 1;
        if status == 0 || status >= 400 {
            state.http_req_failed += 1;
        }
        state.req_durations.saturating_record(us);
        state
            .step_durations
            .entry(step)
            .or_insert_with(new_histogram)
            .saturating_record(us);
    }

    /// Tallies a named check and hands the result back to the caller.
    pub fn record_check(&self, name: &str, passed: bool) -> bool {
        let mut state = self.state.lock();
        let tally = state.checks.entry(name.to_string()).or_default();
        if passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
        passed
    }

    pub fn record_iteration(&self, outcome: IterationOutcome, duration: Duration) {
        let mut state = self.state.lock();
        match outcome {
            IterationOutcome::Completed => state.iterations.completed += 1,
            IterationOutcome::HaltedWithoutToken => state.iterations.halted_without_token += 1,
            IterationOutcome::HaltedWithoutResource => {
                state.iterations.halted_without_resource += 1
            }
        }
        state.iteration_durations.saturating_record(micros(duration));
    }

    pub fn record_interrupted(&self, count: u64) {
        self.state.lock().iterations.interrupted += count;
    }

    pub fn vu_started(&self) {
        let mut state = self.state.lock();
        state.vus += 1;
        state.vus_max = state.vus_max.max(state.vus);
    }

    pub fn vu_stopped(&self) {
        let mut state = self.state.lock();
        state.vus = state.vus.saturating_sub(1);
    }

    pub fn active_vus(&self) -> u32 {
        self.state.lock().vus
    }

    pub fn snapshot(&self) -> Summary {
        let state = self.state.lock();
        Summary {
            run_id: self.run_id,
            started_at: self.started_at,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
            http_reqs: state.http_reqs,
            http_req_failed: state.http_req_failed,
            http_req_duration: LatencyStats::from_micros(&state.req_durations),
            steps: state
                .step_durations
                .iter()
                .map(|(step, hist)| (step.to_string(), LatencyStats::from_micros(hist)))
                .collect(),
            checks: state.checks.clone(),
            iterations: state.iterations,
            iteration_duration: LatencyStats::from_micros(&state.iteration_durations),
            vus: state.vus,
            vus_max: state.vus_max,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
