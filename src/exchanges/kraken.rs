use reqwest::Client;
use serde_json::Value;

use crate::{
    errors::{ConfigError, FetchError},
    schema::{DataKind, Job},
    util,
};

use super::adapter::ExchangeAdapter;

/// Kraken public REST adapter (Spot)
///
/// API:
/// https://api.kraken.com/0/public
///
/// Endpoints:
/// - Depth?pair={symbol}&count={depth}
/// - Trades?pair={symbol}[&since={cursor}]
/// - OHLC?pair={symbol}&interval={minutes}[&since={cursor}]
/// - Ticker?pair={symbol}
/// - Spread?pair={symbol}[&since={cursor}]
///
/// Kraken wraps every response in {"error": [], "result": {...}};
/// a non-empty error array is a rejected request, regardless of
/// HTTP status.
pub struct KrakenAdapter;

const API_BASE: &str = "https://api.kraken.com/0/public";

/// Kraken has no numeric error codes, only strings like
/// "EQuery:Unknown asset pair". This placeholder keeps the
/// normalized record shape uniform across exchanges.
const KRAKEN_ERROR_CODE: i64 = -1;

impl KrakenAdapter {
    fn request_url(&self, job: &Job) -> String {
        let symbol = util::symbol_to_exchange(self.name(), &job.pair);

        match job.kind {
            DataKind::OrderBook => {
                let count = job.params.depth.unwrap_or(10);
                format!("{API_BASE}/Depth?pair={symbol}&count={count}")
            }

            DataKind::Trades => match job.params.since {
                Some(since) => format!("{API_BASE}/Trades?pair={symbol}&since={since}"),
                None => format!("{API_BASE}/Trades?pair={symbol}"),
            },

            DataKind::Candles => {
                let interval = job.params.granularity_secs.unwrap_or(60) / 60;
                match job.params.since {
                    Some(since) => {
                        format!("{API_BASE}/OHLC?pair={symbol}&interval={interval}&since={since}")
                    }
                    None => format!("{API_BASE}/OHLC?pair={symbol}&interval={interval}"),
                }
            }

            DataKind::Ticker => format!("{API_BASE}/Ticker?pair={symbol}"),

            DataKind::Spread => match job.params.since {
                Some(since) => format!("{API_BASE}/Spread?pair={symbol}&since={since}"),
                None => format!("{API_BASE}/Spread?pair={symbol}"),
            },
        }
    }
}

/// Unwraps Kraken's `result` object down to the pair-keyed value.
///
/// Kraken keys the interesting data by its own pair spelling
/// (e.g. "XXBTZUSD") and adds a "last" cursor on some endpoints:
///
/// ```text
/// {"XXBTZUSD": [...], "last": "1688..."}
/// ```
///
/// When exactly one non-cursor entry exists, that entry is the
/// payload. Anything else is returned as-is.
fn unwrap_result(result: Value) -> Value {
    if let Value::Object(map) = &result {
        let mut entries = map.iter().filter(|(k, _)| k.as_str() != "last");
        if let Some((_, inner)) = entries.next() {
            if entries.next().is_none() {
                return inner.clone();
            }
        }
    }
    result
}

#[async_trait::async_trait]
impl ExchangeAdapter for KrakenAdapter {

    fn name(&self) -> &'static str {
        "kraken"
    }

    fn supports(&self, _kind: DataKind) -> bool {
        // Kraken serves all five kinds
        true
    }

    fn validate(&self, job: &Job) -> Result<(), ConfigError> {
        if job.kind == DataKind::Candles {
            let secs = job.params.granularity_secs.unwrap_or(60);
            if secs == 0 || secs % 60 != 0 {
                return Err(ConfigError::InvalidParams {
                    exchange: self.name().to_string(),
                    kind: job.kind,
                    reason: format!(
                        "granularity must be a whole number of minutes, got {}s",
                        secs
                    ),
                });
            }
        }

        if job.kind == DataKind::OrderBook {
            let depth = job.params.depth.unwrap_or(10);
            if !(1..=500).contains(&depth) {
                return Err(ConfigError::InvalidParams {
                    exchange: self.name().to_string(),
                    kind: job.kind,
                    reason: format!("depth must be within 1..=500, got {}", depth),
                });
            }
        }

        Ok(())
    }

    async fn fetch(&self, client: &Client, job: &Job) -> Result<Value, FetchError> {
        let url = self.request_url(job);

        let body = client.get(&url).send().await?.text().await?;
        let v: Value = serde_json::from_str(&body)?;

        // Non-empty error array means the request was rejected,
        // even when the HTTP status is 200.
        if let Some(errors) = v.get("error").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .filter_map(|e| e.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(FetchError::Exchange {
                    code: KRAKEN_ERROR_CODE,
                    message,
                });
            }
        }

        let result = v
            .get("result")
            .cloned()
            .ok_or_else(|| FetchError::encoding("kraken response has no result field"))?;

        Ok(unwrap_result(result))
    }
}
