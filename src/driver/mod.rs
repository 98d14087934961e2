//! Ramping virtual-user executor.
//!
//! A controller loop keeps the number of running VUs in line with the
//! [`RampProfile`]. VUs run iterations back to back; cancelling a VU only
//! stops it from starting another iteration. Once the profile is over (or
//! shutdown is requested) every VU is cancelled and gets the graceful-stop
//! window to finish before being aborted.

pub mod stages;

pub use stages::{RampProfile, Stage};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::{IterationOutcome, MetricsCollector};

/// Identity of the virtual user running an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VuContext {
    pub vu_id: u64,
    pub iteration: u64,
}

/// Work repeated by every virtual user.
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    async fn iteration(&self, vu: VuContext) -> IterationOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    pub vus_spawned: u64,
    pub interrupted: u64,
    pub stopped_early: bool,
}

struct ActiveVu {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct LoadDriver {
    profile: RampProfile,
    graceful_stop: Duration,
    tick: Duration,
}

impl LoadDriver {
    pub fn new(profile: RampProfile, graceful_stop: Duration) -> Self {
        Self {
            profile,
            graceful_stop,
            tick: Duration::from_millis(100),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn profile(&self) -> &RampProfile {
        &self.profile
    }

    pub async fn run<S>(
        &self,
        scenario: Arc<S>,
        metrics: MetricsCollector,
        shutdown: CancellationToken,
    ) -> DriverReport
    where
        S: Scenario + 'static,
    {
        let start = Instant::now();
        let total = self.profile.total_duration();
        let mut active: Vec<ActiveVu> = Vec::new();
        let mut stopping: Vec<JoinHandle<()>> = Vec::new();
        let mut next_id = 1u64;
        let mut stopped_early = false;

        info!(
            scenario = scenario.name(),
            max_vus = self.profile.max_target(),
            total_secs = total.as_secs(),
            "starting load profile"
        );

        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!("shutdown requested, no new iterations will start");
                    stopped_early = true;
                    break;
                }
                _ = ticker.tick() => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let target = self.profile.target_at(elapsed) as usize;
            while active.len() < target {
                let token = shutdown.child_token();
                let handle = spawn_vu(
                    next_id,
                    Arc::clone(&scenario),
                    metrics.clone(),
                    token.clone(),
                );
                debug!(vu = next_id, "vu started");
                active.push(ActiveVu {
                    id: next_id,
                    token,
                    handle,
                });
                next_id += 1;
            }
            while active.len() > target {
                if let Some(vu) = active.pop() {
                    debug!(vu = vu.id, "vu ramping down");
                    vu.token.cancel();
                    stopping.push(vu.handle);
                }
            }
            stopping.retain(|handle| !handle.is_finished());
        }

        for vu in active.drain(..) {
            vu.token.cancel();
            stopping.push(vu.handle);
        }

        let interrupted = self.drain(stopping).await;
        if interrupted > 0 {
            warn!(interrupted, "iterations interrupted after graceful stop");
        }
        metrics.record_interrupted(interrupted);

        info!(vus_spawned = next_id - 1, "load profile finished");
        DriverReport {
            vus_spawned: next_id - 1,
            interrupted,
            stopped_early,
        }
    }

    /// Waits for cancelled VUs until the graceful-stop deadline, then aborts
    /// the rest. Returns how many were still mid-iteration when aborted.
    async fn drain(&self, handles: Vec<JoinHandle<()>>) -> u64 {
        let deadline = Instant::now().checked_add(self.graceful_stop);
        let mut interrupted = 0;
        for mut handle in handles {
            let finished = match deadline {
                Some(deadline) => timeout_at(deadline, &mut handle).await.is_ok(),
                None => {
                    let _ = (&mut handle).await;
                    true
                }
            };
            if finished {
                continue;
            }

            handle.abort();
            // the task may still have completed on its own before the abort landed
            match handle.await {
                Err(err) if err.is_cancelled() => interrupted += 1,
                Err(err) => warn!(error = %err, "vu task failed"),
                Ok(()) => {}
            }
        }
        interrupted
    }
}

/// Holds one slot of the active-VU gauge for as long as the VU task lives,
/// aborted or not.
struct VuGauge(MetricsCollector);

impl VuGauge {
    fn acquire(metrics: MetricsCollector) -> Self {
        metrics.vu_started();
        Self(metrics)
    }
}

impl Drop for VuGauge {
    fn drop(&mut self) {
        self.0.vu_stopped();
    }
}

fn spawn_vu<S>(
    vu_id: u64,
    scenario: Arc<S>,
    metrics: MetricsCollector,
    token: CancellationToken,
) -> JoinHandle<()>
where
    S: Scenario + 'static,
{
    tokio::spawn(async move {
        let _gauge = VuGauge::acquire(metrics.clone());
        let mut iteration = 0u64;
        while !token.is_cancelled() {
            let started = Instant::now();
            let outcome = scenario.iteration(VuContext { vu_id, iteration }).await;
            metrics.record_iteration(outcome, started.elapsed());
            iteration += 1;
            tokio::task::yield_now().await;
        }
    })
}
