use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::driver::RampProfile;
use crate::error::{LoadTestError, Result};
use crate::journey::ThinkTime;

/// Steady-state duration used when `DURATION` cannot be parsed.
pub const FALLBACK_STEADY_SECS: u64 = 60;

/// Longest accepted steady stage (one year).
pub const MAX_STEADY_SECS: u64 = 365 * 24 * 3_600;

/// Longest accepted graceful-stop window (one day).
pub const MAX_GRACEFUL_STOP_SECS: u64 = 24 * 3_600;

/// Optional file merged below the environment.
pub const CONFIG_FILE: &str = "loadtest.toml";

const ENV_KEYS: &[&str] = &[
    "BASE_URL",
    "VUS",
    "DURATION",
    "CLOUD_PROJECT_ID",
    "THINK_TIME_MIN_MS",
    "THINK_TIME_MAX_MS",
    "HTTP_TIMEOUT_SECONDS",
    "GRACEFUL_STOP_SECONDS",
    "REPORT_INTERVAL_SECONDS",
    "SUMMARY_EXPORT",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub vus: u32,
    pub duration: DurationSetting,
    pub cloud_project_id: u64,
    pub think_time_min_ms: u64,
    pub think_time_max_ms: u64,
    pub http_timeout_seconds: u64,
    pub graceful_stop_seconds: u64,
    pub report_interval_seconds: u64,
    pub summary_export: Option<PathBuf>,
    pub thresholds: ThresholdConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            vus: 5,
            duration: DurationSetting::Text("1m".to_string()),
            cloud_project_id: 3_715_124,
            think_time_min_ms: 1_000,
            think_time_max_ms: 3_000,
            http_timeout_seconds: 60,
            graceful_stop_seconds: 30,
            report_interval_seconds: 10,
            summary_export: None,
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// Pass/fail limits applied to the aggregated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub check_rate: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            p90_ms: 1_200.0,
            p95_ms: 1_500.0,
            check_rate: 0.99,
        }
    }
}

/// Raw `DURATION` value. The environment provider hands over bare numbers as
/// integers, so both shapes have to be accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSetting {
    Seconds(u64),
    Fractional(f64),
    Text(String),
}

impl DurationSetting {
    pub fn as_secs(&self) -> u64 {
        match self {
            DurationSetting::Seconds(secs) => *secs,
            DurationSetting::Fractional(_) => FALLBACK_STEADY_SECS,
            DurationSetting::Text(text) => parse_duration_secs(text),
        }
    }
}

/// Parses `<n>`, `<n>s`, `<n>m` or `<n>h` into seconds. Anything else yields
/// [`FALLBACK_STEADY_SECS`].
pub fn parse_duration_secs(input: &str) -> u64 {
    let input = input.trim();
    let (digits, multiplier) = match input.char_indices().last() {
        Some((idx, 's')) => (&input[..idx], 1),
        Some((idx, 'm')) => (&input[..idx], 60),
        Some((idx, 'h')) => (&input[..idx], 3_600),
        _ => (input, 1),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return FALLBACK_STEADY_SECS;
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .unwrap_or(FALLBACK_STEADY_SECS)
}

/// Ramp length on either side of the steady stage: a tenth of it, rounded,
/// never below one second.
pub fn ramp_secs(steady_secs: u64) -> u64 {
    ((steady_secs as f64 / 10.0).round() as u64).max(1)
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// Defaults, then `loadtest.toml`, then the process environment.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(ENV_KEYS))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(LoadTestError::Config(format!(
                "BASE_URL must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }

        if self.vus == 0 {
            return Err(LoadTestError::Config("VUS must be at least 1".to_string()));
        }

        if self.think_time_min_ms > self.think_time_max_ms {
            return Err(LoadTestError::Config(format!(
                "THINK_TIME_MIN_MS ({}) exceeds THINK_TIME_MAX_MS ({})",
                self.think_time_min_ms, self.think_time_max_ms
            )));
        }

        let steady = self.duration.as_secs();
        if steady > MAX_STEADY_SECS {
            return Err(LoadTestError::Config(format!(
                "DURATION of {steady}s exceeds the {MAX_STEADY_SECS}s limit"
            )));
        }

        if self.graceful_stop_seconds > MAX_GRACEFUL_STOP_SECS {
            return Err(LoadTestError::Config(format!(
                "GRACEFUL_STOP_SECONDS ({}) exceeds the {MAX_GRACEFUL_STOP_SECS}s limit",
                self.graceful_stop_seconds
            )));
        }

        if self.http_timeout_seconds == 0 {
            return Err(LoadTestError::Config(
                "HTTP_TIMEOUT_SECONDS must be positive".to_string(),
            ));
        }

        let t = &self.thresholds;
        if t.p90_ms <= 0.0 || t.p95_ms <= 0.0 {
            return Err(LoadTestError::Config(
                "duration thresholds must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&t.check_rate) {
            return Err(LoadTestError::Config(
                "check rate threshold must be between 0 and 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn steady_duration(&self) -> Duration {
        Duration::from_secs(self.duration.as_secs())
    }

    pub fn ramp_duration(&self) -> Duration {
        Duration::from_secs(ramp_secs(self.duration.as_secs()))
    }

    pub fn ramp_profile(&self) -> RampProfile {
        RampProfile::from_steady(self.vus, self.steady_duration(), self.ramp_duration())
    }

    pub fn think_time(&self) -> ThinkTime {
        ThinkTime::new(
            Duration::from_millis(self.think_time_min_ms),
            Duration::from_millis(self.think_time_max_ms),
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn graceful_stop(&self) -> Duration {
        Duration::from_secs(self.graceful_stop_seconds)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_seconds.max(1))
    }
}
