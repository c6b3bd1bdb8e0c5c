use reqwest::Client;
use serde_json::Value;

use crate::{
    errors::{ConfigError, FetchError},
    schema::{DataKind, Job},
    util,
};

use super::adapter::ExchangeAdapter;

/// Bybit v5 market REST adapter (Spot)
///
/// API:
/// https://api.bybit.com/v5/market
///
/// Endpoints:
/// - orderbook?category=spot&symbol={symbol}&limit={depth}
/// - recent-trade?category=spot&symbol={symbol}
/// - kline?category=spot&symbol={symbol}&interval={minutes}
/// - tickers?category=spot&symbol={symbol}
///
/// Bybit wraps every response in {"retCode", "retMsg", "result"};
/// retCode != 0 is a rejected request.
///
/// Bybit has no spread endpoint, so DataKind::Spread is not
/// supported and is rejected at configuration time.
pub struct BybitAdapter;

const API_BASE: &str = "https://api.bybit.com/v5/market";

/// Kline intervals Bybit accepts, in minutes. 1440 maps onto the
/// "D" interval token.
const BYBIT_INTERVALS_MIN: [u32; 11] = [1, 3, 5, 15, 30, 60, 120, 240, 360, 720, 1440];

fn interval_token(minutes: u32) -> String {
    if minutes == 1440 {
        "D".to_string()
    } else {
        minutes.to_string()
    }
}

impl BybitAdapter {
    fn request_url(&self, job: &Job) -> String {
        let symbol = util::symbol_to_exchange(self.name(), &job.pair);

        match job.kind {
            DataKind::OrderBook => {
                let limit = job.params.depth.unwrap_or(50);
                format!("{API_BASE}/orderbook?category=spot&symbol={symbol}&limit={limit}")
            }

            DataKind::Trades => {
                format!("{API_BASE}/recent-trade?category=spot&symbol={symbol}")
            }

            DataKind::Candles => {
                let minutes = job.params.granularity_secs.unwrap_or(60) / 60;
                format!(
                    "{API_BASE}/kline?category=spot&symbol={symbol}&interval={}",
                    interval_token(minutes)
                )
            }

            DataKind::Ticker => {
                format!("{API_BASE}/tickers?category=spot&symbol={symbol}")
            }

            // Rejected by supports(); unreachable for scheduled jobs
            DataKind::Spread => {
                format!("{API_BASE}/tickers?category=spot&symbol={symbol}")
            }
        }
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for BybitAdapter {

    fn name(&self) -> &'static str {
        "bybit"
    }

    fn supports(&self, kind: DataKind) -> bool {
        !matches!(kind, DataKind::Spread)
    }

    fn validate(&self, job: &Job) -> Result<(), ConfigError> {
        if job.kind == DataKind::Candles {
            let secs = job.params.granularity_secs.unwrap_or(60);
            let minutes = secs / 60;
            if secs % 60 != 0 || !BYBIT_INTERVALS_MIN.contains(&minutes) {
                return Err(ConfigError::InvalidParams {
                    exchange: self.name().to_string(),
                    kind: job.kind,
                    reason: format!(
                        "granularity {}s is not a supported kline interval",
                        secs
                    ),
                });
            }
        }

        if job.kind == DataKind::OrderBook {
            let limit = job.params.depth.unwrap_or(50);
            if !(1..=200).contains(&limit) {
                return Err(ConfigError::InvalidParams {
                    exchange: self.name().to_string(),
                    kind: job.kind,
                    reason: format!("depth must be within 1..=200, got {}", limit),
                });
            }
        }

        Ok(())
    }

    async fn fetch(&self, client: &Client, job: &Job) -> Result<Value, FetchError> {
        let url = self.request_url(job);

        let body = client.get(&url).send().await?.text().await?;
        let v: Value = serde_json::from_str(&body)?;

        let ret_code = v
            .get("retCode")
            .and_then(|c| c.as_i64())
            .ok_or_else(|| FetchError::encoding("bybit response has no retCode field"))?;

        if ret_code != 0 {
            let message = v
                .get("retMsg")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(FetchError::Exchange {
                code: ret_code,
                message,
            });
        }

        v.get("result")
            .cloned()
            .ok_or_else(|| FetchError::encoding("bybit response has no result field"))
    }
}
