use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::exchanges::get_adapter;
use crate::schema::{DataKind, Job, JobParams};
use crate::util;

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// This is the top-level configuration structure loaded from
// the config file (default `config.json`).
//
// It defines:
// - The shared collection deadline for the whole run
// - Output and HTTP settings
// - The retry policy applied by every polling task
// - Enabled exchanges and their per-kind parameters
//
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Wall-clock duration of the run in seconds, shared by all
    /// jobs. Zero is valid and produces an empty run.
    pub collection_time_secs: u64,

    /// Base output directory; streams are laid out underneath as
    /// <base_dir>/<pair>/<exchange>/<data_kind>.jsonl
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Poll interval applied to kinds without their own override
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,

    /// Retry/backoff policy for failing fetches
    #[serde(default)]
    pub retry: RetryConfig,

    /// List of exchange configurations
    pub exchanges: Vec<ExchangeConfig>,
}

// ------------------------------------------------------------
// Retry policy
// ------------------------------------------------------------
//
// Applied independently by every polling task.
//
// A failed fetch is recorded and retried with exponential
// backoff (base doubled per consecutive failure, capped at the
// maximum). Once `max_consecutive_failures` is reached the task
// gives up and reports itself as degraded.
//
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Consecutive fetch failures before the task degrades
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for the backoff delay in milliseconds
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

// ------------------------------------------------------------
// Exchange configuration
// ------------------------------------------------------------
//
// Configuration for a single exchange instance. Each enabled
// kind block becomes one job, i.e. one polling task and one
// output stream.
//
#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    /// Exchange identifier (e.g. "kraken", "bybit", "coinbase")
    pub name: String,

    /// Enables or disables this exchange at runtime
    pub enabled: bool,

    /// Trading pair in normalized form BASE-QUOTE
    /// Example: "BTC-USD"
    pub pair: String,

    /// Data kinds to collect; a present block enables the kind
    #[serde(default)]
    pub kinds: KindsConfig,
}

// ------------------------------------------------------------
// Per-kind blocks
// ------------------------------------------------------------
//
// A kind is enabled by the presence of its block; an empty
// object enables it with defaults. Every block accepts an
// optional `interval_ms` override.
//
#[derive(Debug, Deserialize, Clone, Default)]
pub struct KindsConfig {
    pub order_book: Option<OrderBookConfig>,
    pub trades: Option<TradesConfig>,
    pub candles: Option<CandlesConfig>,
    pub ticker: Option<TickerConfig>,
    pub spread: Option<SpreadConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OrderBookConfig {
    /// Order book depth (count on Kraken, limit on Bybit,
    /// level 1-3 on Coinbase)
    pub depth: Option<u32>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TradesConfig {
    /// Cursor for exchanges with incremental trade reads
    pub since: Option<i64>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CandlesConfig {
    /// Candle granularity in seconds; adapters reject values
    /// their exchange does not accept
    pub granularity_secs: Option<u32>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TickerConfig {
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SpreadConfig {
    /// Cursor for exchanges with incremental spread reads
    pub since: Option<i64>,
    pub interval_ms: Option<u64>,
}

impl KindsConfig {
    /// Expands the enabled blocks into (kind, params, interval
    /// override) triples, in a stable order.
    fn enabled(&self) -> Vec<(DataKind, JobParams, Option<u64>)> {
        let mut out = Vec::new();

        if let Some(ob) = &self.order_book {
            out.push((
                DataKind::OrderBook,
                JobParams {
                    depth: ob.depth,
                    ..JobParams::default()
                },
                ob.interval_ms,
            ));
        }
        if let Some(t) = &self.trades {
            out.push((
                DataKind::Trades,
                JobParams {
                    since: t.since,
                    ..JobParams::default()
                },
                t.interval_ms,
            ));
        }
        if let Some(c) = &self.candles {
            out.push((
                DataKind::Candles,
                JobParams {
                    granularity_secs: c.granularity_secs,
                    ..JobParams::default()
                },
                c.interval_ms,
            ));
        }
        if let Some(t) = &self.ticker {
            out.push((DataKind::Ticker, JobParams::default(), t.interval_ms));
        }
        if let Some(s) = &self.spread {
            out.push((
                DataKind::Spread,
                JobParams {
                    since: s.since,
                    ..JobParams::default()
                },
                s.interval_ms,
            ));
        }

        out
    }
}

// ------------------------------------------------------------
// Job construction
// ------------------------------------------------------------

/// Expands the configuration into the immutable job list.
///
/// Fails fast on the first invalid entry: unknown exchange,
/// malformed pair, a kind the exchange does not serve, or
/// parameters its API would reject. Nothing has been spawned or
/// written at this point, so a configuration mistake costs
/// nothing.
pub fn build_jobs(cfg: &Config) -> Result<Vec<Job>, ConfigError> {
    let mut jobs = Vec::new();

    for ex in cfg.exchanges.iter().filter(|e| e.enabled) {
        let adapter =
            get_adapter(&ex.name).ok_or_else(|| ConfigError::UnknownExchange(ex.name.clone()))?;

        if util::split_pair(&ex.pair).is_none() {
            return Err(ConfigError::InvalidPair(ex.pair.clone()));
        }

        for (kind, params, interval_ms) in ex.kinds.enabled() {
            if !adapter.supports(kind) {
                return Err(ConfigError::UnsupportedKind {
                    exchange: ex.name.clone(),
                    kind,
                });
            }

            let job = Job {
                exchange: ex.name.clone(),
                pair: ex.pair.clone(),
                kind,
                params,
                interval: Duration::from_millis(interval_ms.unwrap_or(cfg.default_interval_ms)),
            };
            adapter.validate(&job)?;
            jobs.push(job);
        }
    }

    if jobs.is_empty() {
        return Err(ConfigError::NoJobs);
    }
    Ok(jobs)
}

fn default_base_dir() -> String {
    "datasets".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Config {
        serde_json::from_str(json).expect("config parses")
    }

    #[test]
    fn full_config_expands_into_jobs() {
        let cfg = parse(
            r#"{
                "collection_time_secs": 60,
                "exchanges": [
                    {
                        "name": "kraken",
                        "enabled": true,
                        "pair": "BTC-USD",
                        "kinds": {
                            "order_book": { "depth": 10 },
                            "candles": { "granularity_secs": 60, "interval_ms": 5000 },
                            "ticker": {}
                        }
                    },
                    {
                        "name": "coinbase",
                        "enabled": true,
                        "pair": "BTC-USD",
                        "kinds": { "spread": {} }
                    }
                ]
            }"#,
        );

        let jobs = build_jobs(&cfg).unwrap();
        assert_eq!(jobs.len(), 4);

        let candles = jobs
            .iter()
            .find(|j| j.kind == DataKind::Candles)
            .unwrap();
        assert_eq!(candles.interval, Duration::from_millis(5000));
        assert_eq!(candles.params.granularity_secs, Some(60));

        let ticker = jobs.iter().find(|j| j.kind == DataKind::Ticker).unwrap();
        assert_eq!(ticker.interval, Duration::from_millis(1000));
    }

    #[test]
    fn disabled_exchanges_are_skipped() {
        let cfg = parse(
            r#"{
                "collection_time_secs": 5,
                "exchanges": [
                    { "name": "kraken", "enabled": true, "pair": "BTC-USD",
                      "kinds": { "ticker": {} } },
                    { "name": "nosuch", "enabled": false, "pair": "BTC-USD",
                      "kinds": { "ticker": {} } }
                ]
            }"#,
        );
        let jobs = build_jobs(&cfg).unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn unknown_exchange_fails_fast() {
        let cfg = parse(
            r#"{
                "collection_time_secs": 5,
                "exchanges": [
                    { "name": "binance", "enabled": true, "pair": "BTC-USDT",
                      "kinds": { "ticker": {} } }
                ]
            }"#,
        );
        assert!(matches!(
            build_jobs(&cfg),
            Err(ConfigError::UnknownExchange(_))
        ));
    }

    #[test]
    fn spread_on_bybit_fails_fast() {
        let cfg = parse(
            r#"{
                "collection_time_secs": 5,
                "exchanges": [
                    { "name": "bybit", "enabled": true, "pair": "BTC-USDT",
                      "kinds": { "spread": {} } }
                ]
            }"#,
        );
        assert!(matches!(
            build_jobs(&cfg),
            Err(ConfigError::UnsupportedKind { .. })
        ));
    }

    #[test]
    fn malformed_pair_fails_fast() {
        let cfg = parse(
            r#"{
                "collection_time_secs": 5,
                "exchanges": [
                    { "name": "kraken", "enabled": true, "pair": "BTCUSD",
                      "kinds": { "ticker": {} } }
                ]
            }"#,
        );
        assert!(matches!(build_jobs(&cfg), Err(ConfigError::InvalidPair(_))));
    }

    #[test]
    fn empty_job_list_is_an_error() {
        let cfg = parse(
            r#"{ "collection_time_secs": 5, "exchanges": [] }"#,
        );
        assert!(matches!(build_jobs(&cfg), Err(ConfigError::NoJobs)));
    }
}
