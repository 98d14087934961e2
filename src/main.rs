use anyhow::Result;
use api_journey_load::{client, config, driver, journey, metrics, telemetry};
use client::ApiClient;
use config::Config;
use driver::LoadDriver;
use journey::JourneyRunner;
use metrics::{reporter, MetricsCollector, Thresholds};
use std::process::ExitCode;
use std::sync::Arc;
use telemetry::init_tracing;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    info!(
        base_url = %cfg.base_url,
        vus = cfg.vus,
        steady_secs = cfg.steady_duration().as_secs(),
        ramp_secs = cfg.ramp_duration().as_secs(),
        project_id = cfg.cloud_project_id,
        "load test plan"
    );

    let metrics = MetricsCollector::new();
    let client = ApiClient::new(&cfg.base_url, cfg.http_timeout(), metrics.clone())?;
    let runner = Arc::new(JourneyRunner::new(client, metrics.clone(), cfg.think_time()));

    if let Err(e) = runner.precheck().await {
        error!(error = %e, "availability precheck failed, aborting test run");
        return Ok(ExitCode::from(e.exit_code()));
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            telemetry::shutdown_signal().await;
            shutdown.cancel();
        });
    }

    let stop_reporting = CancellationToken::new();
    let progress = tokio::spawn(reporter::start_periodic_reporter(
        metrics.clone(),
        cfg.report_interval(),
        stop_reporting.clone(),
    ));

    let driver = LoadDriver::new(cfg.ramp_profile(), cfg.graceful_stop());
    let report = driver.run(runner, metrics.clone(), shutdown).await;

    stop_reporting.cancel();
    let _ = progress.await;

    let summary = metrics.snapshot();
    let verdict = Thresholds::from_config(&cfg.thresholds).evaluate(&summary);
    reporter::print_final_report(&summary, &verdict);

    if let Some(path) = &cfg.summary_export {
        let export = reporter::JsonReport {
            project_id: cfg.cloud_project_id,
            base_url: &cfg.base_url,
            passed: verdict.passed(),
            thresholds: &verdict.results,
            summary: &summary,
        };
        match reporter::write_json_report(path, &export) {
            Ok(()) => info!(path = %path.display(), "summary exported"),
            Err(e) => warn!(error = %e, "summary export failed"),
        }
    }

    if report.stopped_early {
        warn!("run was stopped before the load profile completed");
    }

    if verdict.passed() {
        info!(run_id = %summary.run_id, "all thresholds passed");
    } else {
        for breach in verdict.breached() {
            error!(threshold = %breach.name, observed = ?breach.observed, "threshold breached");
        }
    }
    Ok(ExitCode::from(verdict.exit_code()))
}
