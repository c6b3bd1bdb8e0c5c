use reqwest::Client;
use serde_json::Value;

use crate::{
    errors::{ConfigError, FetchError},
    schema::{DataKind, Job},
    util,
};

use super::adapter::ExchangeAdapter;

/// Coinbase Exchange REST adapter
///
/// API:
/// https://api.exchange.coinbase.com
///
/// Endpoints:
/// - /products/{pair}/book?level={1..3}
/// - /products/{pair}/trades
/// - /products/{pair}/candles?granularity={secs}
/// - /products/{pair}/ticker
/// - /products/{pair}/stats        (serves DataKind::Spread)
///
/// Coinbase signals errors through the HTTP status with a
/// {"message": "..."} body instead of a wrapped envelope.
///
/// NOTE:
/// Coinbase has no spread endpoint; the 24h/30d stats snapshot
/// fills that slot, matching what the exchange exposes for
/// spread-style statistics.
pub struct CoinbaseAdapter;

const API_BASE: &str = "https://api.exchange.coinbase.com";

/// The only candle granularities the API accepts, in seconds:
/// one minute, five minutes, fifteen minutes, one hour, six
/// hours and one day.
const COINBASE_GRANULARITIES: [u32; 6] = [60, 300, 900, 3600, 21_600, 86_400];

impl CoinbaseAdapter {
    fn request_url(&self, job: &Job) -> String {
        let product = util::symbol_to_exchange(self.name(), &job.pair);

        match job.kind {
            DataKind::OrderBook => {
                let level = job.params.depth.unwrap_or(2);
                format!("{API_BASE}/products/{product}/book?level={level}")
            }

            DataKind::Trades => format!("{API_BASE}/products/{product}/trades"),

            DataKind::Candles => {
                let granularity = job.params.granularity_secs.unwrap_or(60);
                format!("{API_BASE}/products/{product}/candles?granularity={granularity}")
            }

            DataKind::Ticker => format!("{API_BASE}/products/{product}/ticker"),

            DataKind::Spread => format!("{API_BASE}/products/{product}/stats"),
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for CoinbaseAdapter {

    fn name(&self) -> &'static str {
        "coinbase"
    }

    fn supports(&self, _kind: DataKind) -> bool {
        // All five kinds map onto product endpoints
        true
    }

    fn validate(&self, job: &Job) -> Result<(), ConfigError> {
        if job.kind == DataKind::Candles {
            let secs = job.params.granularity_secs.unwrap_or(60);
            if !COINBASE_GRANULARITIES.contains(&secs) {
                return Err(ConfigError::InvalidParams {
                    exchange: self.name().to_string(),
                    kind: job.kind,
                    reason: format!(
                        "granularity must be one of {:?} seconds, got {}",
                        COINBASE_GRANULARITIES, secs
                    ),
                });
            }
        }

        if job.kind == DataKind::OrderBook {
            let level = job.params.depth.unwrap_or(2);
            if !(1..=3).contains(&level) {
                return Err(ConfigError::InvalidParams {
                    exchange: self.name().to_string(),
                    kind: job.kind,
                    reason: format!("book level must be 1, 2 or 3, got {}", level),
                });
            }
        }

        Ok(())
    }

    async fn fetch(&self, client: &Client, job: &Job) -> Result<Value, FetchError> {
        let url = self.request_url(job);

        let resp = client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            // Error bodies look like {"message": "NotFound"};
            // fall back to the status line when the body is not
            // JSON (proxies, HTML error pages).
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request rejected")
                        .to_string()
                });
            return Err(FetchError::Exchange {
                code: i64::from(status.as_u16()),
                message,
            });
        }

        let v: Value = serde_json::from_str(&body)?;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JobParams;
    use std::time::Duration;

    fn job(kind: DataKind, params: JobParams) -> Job {
        Job {
            exchange: "coinbase".to_string(),
            pair: "BTC-USD".to_string(),
            kind,
            params,
            interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn book_url_keeps_product_id_and_maps_depth_to_level() {
        let j = job(
            DataKind::OrderBook,
            JobParams {
                depth: Some(3),
                ..JobParams::default()
            },
        );
        assert_eq!(
            CoinbaseAdapter.request_url(&j),
            "https://api.exchange.coinbase.com/products/BTC-USD/book?level=3"
        );
    }

    #[test]
    fn spread_kind_maps_to_stats_endpoint() {
        let j = job(DataKind::Spread, JobParams::default());
        assert_eq!(
            CoinbaseAdapter.request_url(&j),
            "https://api.exchange.coinbase.com/products/BTC-USD/stats"
        );
    }

    #[test]
    fn validate_rejects_off_grid_granularity() {
        let j = job(
            DataKind::Candles,
            JobParams {
                granularity_secs: Some(120),
                ..JobParams::default()
            },
        );
        assert!(CoinbaseAdapter.validate(&j).is_err());
    }

    #[test]
    fn validate_rejects_book_level_above_three() {
        let j = job(
            DataKind::OrderBook,
            JobParams {
                depth: Some(10),
                ..JobParams::default()
            },
        );
        assert!(CoinbaseAdapter.validate(&j).is_err());
    }
}
