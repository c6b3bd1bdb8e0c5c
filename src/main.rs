use std::fs;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::info;
use tokio::time::sleep;

use rest_multi_collector::config::{self, Config};
use rest_multi_collector::metrics::METRICS;
use rest_multi_collector::supervisor;

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// This is the main runtime for the multi-exchange REST collector.
//
// Responsibilities:
// - Initialize logging
// - Load and validate configuration (fail fast, before any task)
// - Start the periodic metrics reporter
// - Run the supervisor to completion
// - Reflect the aggregate outcome in the exit code
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // --------------------------------------------------------
    // Load configuration from disk
    //
    // The config path can be overridden as the first CLI
    // argument; everything else is configuration-driven.
    // --------------------------------------------------------
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let cfg: Config = load_config(&path)?;

    // Expand and validate the job list. Unknown exchanges,
    // malformed pairs and unsupported kinds abort here, not
    // somewhere in a background task.
    let jobs = config::build_jobs(&cfg)?;

    info!(
        "starting {} job(s), collecting for {}s into {}",
        jobs.len(),
        cfg.collection_time_secs,
        cfg.base_dir
    );

    // --------------------------------------------------------
    // Start metrics reporter (periodic, low-noise)
    // --------------------------------------------------------
    tokio::spawn(async {
        loop {
            sleep(Duration::from_secs(10)).await;

            info!(
                "[METRICS] jobs={} polls={} records={} fetch_err={} write_err={} write_retries={}",
                METRICS.jobs_active.load(Ordering::Relaxed),
                METRICS.polls_total.load(Ordering::Relaxed),
                METRICS.records_written.load(Ordering::Relaxed),
                METRICS.fetch_errors.load(Ordering::Relaxed),
                METRICS.write_errors.load(Ordering::Relaxed),
                METRICS.write_retries.load(Ordering::Relaxed),
            );
        }
    });

    // --------------------------------------------------------
    // Run all polling tasks to a terminal state
    // --------------------------------------------------------
    let summary = supervisor::run(&cfg, jobs).await?;

    // Exit status reflects the aggregate: any degraded or
    // aborted job makes the run a failure.
    if !summary.all_completed() {
        std::process::exit(1);
    }
    Ok(())
}

// ------------------------------------------------------------
// Configuration loader
// ------------------------------------------------------------
//
// Reads a JSON configuration file from disk and deserializes
// it into the strongly typed `Config` structure.
//
fn load_config(path: &str) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)?;
    let cfg = serde_json::from_str(&data)?;
    Ok(cfg)
}
