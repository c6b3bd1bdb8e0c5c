use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use futures_util::future::join_all;
use log::{error, info, warn};
use reqwest::Client;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    collector::runner::run_job,
    config::Config,
    exchanges::get_adapter,
    schema::{Job, JobOutcome, JobReport},
    sink::StreamSink,
};

// ------------------------------------------------------------
// Supervisor
// ------------------------------------------------------------
//
// Owns the lifetime of every polling task:
//
// - prepares adapters and sinks up front, so a broken output
//   directory fails the run before a single request is sent
// - spawns one task per job against a shared deadline and a
//   shared cancellation token
// - joins all tasks and aggregates their terminal states
//
// The aggregate decides the process exit code: zero only when
// every job completed normally. A background failure is never
// invisible.
//

/// Aggregated outcome of one collection run.
#[derive(Debug)]
pub struct Summary {
    pub completed: usize,
    pub degraded: usize,
    pub aborted: usize,
    pub reports: Vec<JobReport>,
}

impl Summary {
    pub fn from_reports(reports: Vec<JobReport>) -> Self {
        let mut summary = Self {
            completed: 0,
            degraded: 0,
            aborted: 0,
            reports: Vec::with_capacity(reports.len()),
        };
        for report in reports {
            match report.outcome {
                JobOutcome::Completed => summary.completed += 1,
                JobOutcome::Degraded => summary.degraded += 1,
                JobOutcome::Aborted => summary.aborted += 1,
            }
            summary.reports.push(report);
        }
        summary
    }

    pub fn all_completed(&self) -> bool {
        self.degraded == 0 && self.aborted == 0
    }
}

/// Runs the whole job list to completion and returns the
/// aggregated summary.
///
/// CONTRACT:
/// - `jobs` has already passed configuration validation
/// - every job gets exactly one task and one sink; the sink is
///   owned by that task until it terminates (write isolation
///   comes from this, not from locking)
///
/// CANCELLATION:
/// - Ctrl-C cancels the shared token; every task observes it at
///   its next loop iteration or suspension point
///
pub async fn run(cfg: &Config, jobs: Vec<Job>) -> anyhow::Result<Summary> {
    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .user_agent(concat!("rest-multi-collector/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")?;

    let deadline = Instant::now() + Duration::from_secs(cfg.collection_time_secs);
    let cancel = CancellationToken::new();

    // Prepare everything fallible before spawning anything, so
    // a failure here leaves no half-started run behind.
    let base_dir = Path::new(&cfg.base_dir);
    let mut prepared = Vec::with_capacity(jobs.len());
    for job in jobs {
        let adapter = get_adapter(&job.exchange)
            .with_context(|| format!("no adapter registered for '{}'", job.exchange))?;
        let sink = StreamSink::open(base_dir, &job.pair, &job.exchange, job.kind)
            .with_context(|| {
                format!(
                    "open stream {}/{}/{}",
                    job.pair,
                    job.exchange,
                    job.kind.as_str()
                )
            })?;
        prepared.push((job, adapter, sink));
    }

    // Interrupt watcher
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling all tasks");
                cancel.cancel();
            }
        });
    }

    let handles: Vec<_> = prepared
        .into_iter()
        .map(|(job, adapter, sink)| {
            tokio::spawn(run_job(
                adapter,
                client.clone(),
                job,
                sink,
                deadline,
                cancel.clone(),
                cfg.retry.clone(),
            ))
        })
        .collect();

    // Wait for every task to reach a terminal state.
    let mut reports = Vec::with_capacity(handles.len());
    let mut panicked = 0usize;
    for result in join_all(handles).await {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                // A panicking task has no report; count it as
                // aborted so it still fails the run.
                error!("polling task panicked: {}", e);
                panicked += 1;
            }
        }
    }

    let mut summary = Summary::from_reports(reports);
    summary.aborted += panicked;

    for report in &summary.reports {
        info!(
            "job {} {} {}: {} ({} records, {} errors)",
            report.exchange,
            report.pair,
            report.kind,
            report.outcome,
            report.records,
            report.errors
        );
    }
    info!(
        "summary: {} completed, {} degraded, {} aborted",
        summary.completed, summary.degraded, summary.aborted
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataKind;

    fn report(outcome: JobOutcome) -> JobReport {
        JobReport {
            exchange: "kraken".to_string(),
            pair: "BTC-USD".to_string(),
            kind: DataKind::Ticker,
            outcome,
            records: 1,
            errors: 0,
        }
    }

    #[test]
    fn summary_counts_terminal_states() {
        let summary = Summary::from_reports(vec![
            report(JobOutcome::Completed),
            report(JobOutcome::Completed),
            report(JobOutcome::Degraded),
            report(JobOutcome::Aborted),
        ]);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.aborted, 1);
        assert!(!summary.all_completed());
    }

    #[test]
    fn all_completed_only_without_failures() {
        let ok = Summary::from_reports(vec![report(JobOutcome::Completed)]);
        assert!(ok.all_completed());

        let empty = Summary::from_reports(Vec::new());
        assert!(empty.all_completed());
    }
}
