//! Periodic invocation of the pipeline

use crate::pipeline::{Pipeline, RunError, RunReport, Severity};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};
use triangles_core::CancellationToken;

/// Log a finished run and return the line to print, if any
///
/// This is the single place run failures are classified; the loop keeps going
/// whatever the outcome.
pub fn report_outcome(outcome: &Result<RunReport, RunError>) -> Option<String> {
    match outcome {
        Ok(report) => {
            info!(
                "Run complete: record {} accepted by {}/{} relays",
                report
                    .record
                    .id
                    .map(|id| id.to_hex())
                    .unwrap_or_default(),
                report.broadcast.success_count(),
                report.broadcast.len()
            );
            for failure in report.broadcast.failures() {
                if let Err(e) = &failure.result {
                    warn!("  {}: {}", failure.relay, e);
                }
            }
            Some(report.share_url())
        }
        Err(e) => {
            match e.severity() {
                Severity::Transient => warn!("Run failed, retrying next interval: {}", e),
                Severity::Misconfiguration => error!("Run failed: {}", e),
            }
            None
        }
    }
}

/// Run once immediately, then every `period` until `shutdown` fires
pub async fn run_scheduled(pipeline: &Pipeline, period: Duration, shutdown: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Posting every {:?}", period);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        info!("Posting new kind 20...");
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => break,
            outcome = pipeline.run_once(&shutdown) => outcome,
        };
        if let Some(line) = report_outcome(&outcome) {
            println!("{}", line);
        }
    }

    info!("Scheduler stopped");
}

/// Single run; the error is returned so the process can exit non-zero
pub async fn run_single(pipeline: &Pipeline, shutdown: CancellationToken) -> Result<String, RunError> {
    let outcome = pipeline.run_once(&shutdown).await;
    report_outcome(&outcome);

    let line = outcome?.share_url();
    println!("{}", line);
    Ok(line)
}
