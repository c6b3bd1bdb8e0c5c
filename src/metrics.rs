use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Global runtime metrics for the poller engine.
///
/// Purpose:
/// - Track active jobs
/// - Track throughput (polls / records written)
/// - Track failure classes (fetch vs write)
///
/// Design:
/// - Lock-free (Atomics)
/// - Cheap to update
/// - Safe in async + multithreaded contexts
#[derive(Default)]
pub struct RuntimeMetrics {
    // High-level
    pub jobs_active: AtomicUsize,

    // Throughput
    pub polls_total: AtomicUsize,
    pub records_written: AtomicUsize,

    // Failures
    pub fetch_errors: AtomicUsize,
    pub write_errors: AtomicUsize,
    pub write_retries: AtomicUsize,

    // Terminal states
    pub jobs_completed: AtomicUsize,
    pub jobs_degraded: AtomicUsize,
    pub jobs_aborted: AtomicUsize,
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));
