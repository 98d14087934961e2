use std::time::Duration;

/// Move linearly from the previous stage's target to `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// Virtual-user population curve. The curve starts at zero VUs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampProfile {
    stages: Vec<Stage>,
}

impl RampProfile {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Ramp up to `vus`, hold for `steady`, ramp back down to zero.
    pub fn from_steady(vus: u32, steady: Duration, ramp: Duration) -> Self {
        Self::new(vec![
            Stage::new(ramp, vus),
            Stage::new(steady, vus),
            Stage::new(ramp, 0),
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Sum of all stage lengths, saturating at `Duration::MAX`.
    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |acc, s| acc.saturating_add(s.duration))
    }

    pub fn max_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Target VU count at `elapsed` into the run. Past the end of the
    /// profile the last stage's target holds.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut from = 0u32;
        let mut offset = Duration::ZERO;

        for stage in &self.stages {
            let end = offset.saturating_add(stage.duration);
            if elapsed < end {
                let progress =
                    (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
                let value = from as f64 + (stage.target as f64 - from as f64) * progress;
                return value.round() as u32;
            }
            from = stage.target;
            offset = end;
        }

        from
    }
}
