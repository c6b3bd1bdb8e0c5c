use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::{error, info, warn};
use reqwest::Client;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RetryConfig,
    exchanges::adapter::ExchangeAdapter,
    metrics::METRICS,
    schema::{Job, JobOutcome, JobReport, Record},
    sink::StreamSink,
    util,
};

/// Attempts before a failing stream write abandons the task.
/// Losing the ability to persist is unrecoverable for a stream,
/// so the budget is small and fixed.
const WRITE_ATTEMPTS: u32 = 3;

/// Pause between stream write attempts.
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Runs the polling loop for exactly one job until a terminal
/// state is reached.
///
/// Loop shape:
/// - observe deadline and cancellation
/// - capture the wall-clock timestamp
/// - one adapter fetch
/// - append the resulting record (payload or error) to the sink
/// - pace the next poll, or back off after a failure
///
/// TERMINATION:
/// - Completed: the shared deadline elapsed (a zero-length run
///   completes without a single poll)
/// - Degraded: too many consecutive fetch failures
/// - Aborted: cancellation, or the stream became unwritable
///
/// GUARANTEES:
/// - Every captured record is either durably appended or the
///   task aborts; nothing is silently dropped
/// - Sleeps never overshoot the deadline
/// - Failures stay inside this task; neighbours are unaffected
///
pub async fn run_job(
    adapter: Arc<dyn ExchangeAdapter>,
    client: Client,
    job: Job,
    mut sink: StreamSink,
    deadline: Instant,
    cancel: CancellationToken,
    retry: RetryConfig,
) -> JobReport {
    info!(
        "collecting {} for {} on {}",
        job.kind, job.pair, job.exchange
    );
    METRICS.jobs_active.fetch_add(1, Ordering::Relaxed);

    let mut records = 0u64;
    let mut errors = 0u64;
    let mut consecutive_failures = 0u32;

    let outcome = loop {
        if Instant::now() >= deadline {
            break JobOutcome::Completed;
        }
        if cancel.is_cancelled() {
            break JobOutcome::Aborted;
        }

        let poll_start = Instant::now();
        let captured = util::now_ms();
        METRICS.polls_total.fetch_add(1, Ordering::Relaxed);

        // One fetch, one record. The next poll time depends on
        // whether the fetch succeeded.
        let next = match adapter.fetch(&client, &job).await {
            Ok(payload) => {
                consecutive_failures = 0;
                let record = Record::success(captured, &job, payload);
                if !append_with_retry(&mut sink, &record, &job).await {
                    break JobOutcome::Aborted;
                }
                records += 1;

                // Pace from the poll start so the cadence stays
                // stable regardless of request latency.
                poll_start + job.interval
            }

            Err(err) => {
                METRICS.fetch_errors.fetch_add(1, Ordering::Relaxed);
                consecutive_failures += 1;
                warn!(
                    "[{} {} {}] fetch failed ({}/{}): {}",
                    job.exchange,
                    job.pair,
                    job.kind,
                    consecutive_failures,
                    retry.max_consecutive_failures,
                    err
                );

                let record = Record::failure(captured, &job, &err);
                if !append_with_retry(&mut sink, &record, &job).await {
                    break JobOutcome::Aborted;
                }
                records += 1;
                errors += 1;

                if consecutive_failures >= retry.max_consecutive_failures {
                    error!(
                        "[{} {} {}] {} consecutive failures, abandoning task",
                        job.exchange, job.pair, job.kind, consecutive_failures
                    );
                    break JobOutcome::Degraded;
                }

                Instant::now() + backoff_delay(&retry, consecutive_failures)
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break JobOutcome::Aborted,
            _ = sleep_until(next.min(deadline)) => {}
        }
    };

    if let Err(e) = sink.flush() {
        error!(
            "[{} {} {}] final flush failed: {}",
            job.exchange, job.pair, job.kind, e
        );
    }

    METRICS.jobs_active.fetch_sub(1, Ordering::Relaxed);
    match outcome {
        JobOutcome::Completed => METRICS.jobs_completed.fetch_add(1, Ordering::Relaxed),
        JobOutcome::Degraded => METRICS.jobs_degraded.fetch_add(1, Ordering::Relaxed),
        JobOutcome::Aborted => METRICS.jobs_aborted.fetch_add(1, Ordering::Relaxed),
    };

    info!(
        "finished {} for {} on {}: {} ({} records, {} errors)",
        job.kind, job.pair, job.exchange, outcome, records, errors
    );

    JobReport {
        exchange: job.exchange.clone(),
        pair: job.pair.clone(),
        kind: job.kind,
        outcome,
        records,
        errors,
    }
}

/// Appends one record with a small fixed retry budget.
///
/// Returns false once the budget is exhausted; the caller
/// abandons the stream at that point.
async fn append_with_retry(sink: &mut StreamSink, record: &Record, job: &Job) -> bool {
    for attempt in 1..=WRITE_ATTEMPTS {
        match sink.append(record) {
            Ok(()) => {
                METRICS.records_written.fetch_add(1, Ordering::Relaxed);
                return true;
            }
            Err(e) => {
                METRICS.write_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[{} {} {}] write attempt {}/{} failed: {}",
                    job.exchange, job.pair, job.kind, attempt, WRITE_ATTEMPTS, e
                );
                if attempt < WRITE_ATTEMPTS {
                    METRICS.write_retries.fetch_add(1, Ordering::Relaxed);
                    sleep(WRITE_RETRY_DELAY).await;
                }
            }
        }
    }

    error!(
        "[{} {} {}] stream is unwritable, abandoning task",
        job.exchange, job.pair, job.kind
    );
    false
}

/// Exponential backoff with a hard cap and a little jitter so
/// parallel tasks failing together do not re-poll in lockstep.
fn backoff_delay(retry: &RetryConfig, consecutive_failures: u32) -> Duration {
    let exp = consecutive_failures.saturating_sub(1).min(16);
    let capped = retry
        .backoff_base_ms
        .saturating_mul(1u64 << exp)
        .min(retry.backoff_max_ms);
    let jitter = rand::random_range(0..=capped / 4);
    Duration::from_millis((capped + jitter).min(retry.backoff_max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base: u64, max: u64) -> RetryConfig {
        RetryConfig {
            max_consecutive_failures: 3,
            backoff_base_ms: base,
            backoff_max_ms: max,
        }
    }

    #[test]
    fn backoff_grows_and_stays_capped() {
        let retry = policy(500, 10_000);
        for failures in 1..=12u32 {
            let d = backoff_delay(&retry, failures);
            let exp = u64::from((failures - 1).min(16));
            let floor = (500u64 << exp).min(10_000);
            assert!(d >= Duration::from_millis(floor));
            assert!(d <= Duration::from_millis(10_000));
        }
    }

    #[test]
    fn backoff_never_exceeds_cap_even_with_jitter() {
        let retry = policy(8_000, 10_000);
        for _ in 0..50 {
            assert!(backoff_delay(&retry, 5) <= Duration::from_millis(10_000));
        }
    }

    #[test]
    fn first_backoff_starts_at_base() {
        let retry = policy(500, 10_000);
        let d = backoff_delay(&retry, 1);
        assert!(d >= Duration::from_millis(500));
        assert!(d <= Duration::from_millis(625));
    }
}
