/// Collector module
///
/// This module groups all logic responsible for:
/// - Running one bounded polling loop per job
/// - Applying the retry/backoff policy
/// - Routing captured records into the job's stream sink
///
/// The collector layer acts as the scheduling layer between:
/// - Exchange adapters (Kraken, Bybit, Coinbase)
/// - The per-stream sinks (output layer)
///
/// Design notes:
/// - Exchange-specific logic MUST NOT live here
/// - One task owns one job, one adapter call at a time and one
///   sink; tasks never communicate with each other
/// - All heavy logic belongs to adapters or the sink
pub mod runner;
