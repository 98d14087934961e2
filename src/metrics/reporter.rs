//! Progress logging, end-of-run console summary and JSON export

use super::collector::MetricsCollector;
use super::thresholds::{ThresholdReport, ThresholdResult};
use super::types::{LatencyStats, Summary};
use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Log a progress line every `period` until `stop` fires.
pub async fn start_periodic_reporter(
    collector: MetricsCollector,
    period: Duration,
    stop: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => log_progress(&collector),
        }
    }
}

pub fn log_progress(collector: &MetricsCollector) {
    let summary = collector.snapshot();
    info!(
        elapsed_secs = summary.elapsed_secs.round() as u64,
        vus = summary.vus,
        iterations = summary.iterations.finished(),
        http_reqs = summary.http_reqs,
        http_req_failed = summary.http_req_failed,
        p95_ms = summary.http_req_duration.p95_ms,
        checks_rate = summary.check_rate().unwrap_or(0.0),
        "progress"
    );
}

fn latency_line(label: &str, stats: &LatencyStats) -> String {
    format!(
        "     {label:<22} avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
        stats.avg_ms, stats.min_ms, stats.med_ms, stats.max_ms, stats.p90_ms, stats.p95_ms
    )
}

/// Renders the final summary as plain text.
pub fn render_final_report(summary: &Summary, thresholds: &ThresholdReport) -> String {
    let mut out = Vec::new();
    let totals = summary.check_totals();

    out.push(String::new());
    out.push("  █ THRESHOLDS".to_string());
    out.push(String::new());
    for result in &thresholds.results {
        out.push(format!("    {} {}", mark(result.passed), describe(result)));
    }

    out.push(String::new());
    out.push("  █ CHECKS".to_string());
    out.push(String::new());
    for (name, tally) in &summary.checks {
        out.push(format!(
            "    {} {name:<40} {:>8} ✓ {:>6} ✗",
            mark(tally.fails == 0),
            tally.passes,
            tally.fails
        ));
    }
    out.push(format!(
        "     checks_succeeded: {:.2}% ({} out of {})",
        summary.check_rate().unwrap_or(0.0) * 100.0,
        totals.passes,
        totals.total()
    ));

    out.push(String::new());
    out.push("  █ HTTP".to_string());
    out.push(String::new());
    out.push(latency_line("http_req_duration", &summary.http_req_duration));
    for (step, stats) in &summary.steps {
        out.push(latency_line(&format!("  {{step:{step}}}"), stats));
    }
    out.push(format!(
        "     http_req_failed: {:.2}% ({} out of {})",
        summary.http_req_failed_rate() * 100.0,
        summary.http_req_failed,
        summary.http_reqs
    ));
    out.push(format!(
        "     http_reqs: {} ({:.2}/s)",
        summary.http_reqs,
        summary.requests_per_sec()
    ));

    out.push(String::new());
    out.push("  █ EXECUTION".to_string());
    out.push(String::new());
    out.push(latency_line("iteration_duration", &summary.iteration_duration));
    out.push(format!(
        "     iterations: {} completed, {} halted without token, {} halted without resource, {} interrupted",
        summary.iterations.completed,
        summary.iterations.halted_without_token,
        summary.iterations.halted_without_resource,
        summary.iterations.interrupted
    ));
    out.push(format!("     vus_max: {}", summary.vus_max));
    out.push(format!("     duration: {:.1}s", summary.elapsed_secs));
    out.push(String::new());

    out.join("\n")
}

pub fn print_final_report(summary: &Summary, thresholds: &ThresholdReport) {
    println!("{}", render_final_report(summary, thresholds));
}

fn mark(passed: bool) -> &'static str {
    if passed {
        "✓"
    } else {
        "✗"
    }
}

fn describe(result: &ThresholdResult) -> String {
    match result.observed {
        Some(observed) => format!("'{}' observed {:.4}", result.name, observed),
        None => format!("'{}' no samples", result.name),
    }
}

/// JSON document written to `SUMMARY_EXPORT`.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub project_id: u64,
    pub base_url: &'a str,
    pub passed: bool,
    pub thresholds: &'a [ThresholdResult],
    pub summary: &'a Summary,
}

pub fn write_json_report(path: &Path, report: &JsonReport<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
