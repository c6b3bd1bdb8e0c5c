use std::time::Duration;

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::errors::FetchError;

// ------------------------------------------------------------
// Data kinds
// ------------------------------------------------------------
//
// The logical data channels the engine can poll.
//
// Each exchange adapter maps these onto its own REST endpoints.
// Not every exchange supports every kind; unsupported kinds are
// rejected during job construction, before any task starts.
//
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Order book snapshot (depth controlled by job params)
    OrderBook,

    /// Recent public trades
    Trades,

    /// OHLC candles (granularity controlled by job params)
    Candles,

    /// Last trade / best bid-ask / 24h volume snapshot
    Ticker,

    /// Recent bid-ask spreads (24h stats on exchanges without a
    /// dedicated spread endpoint)
    Spread,
}

impl DataKind {
    /// Stable name used for stream file names and log output.
    ///
    /// CONTRACT:
    /// - Must match the serde snake_case representation
    /// - Must never change once data has been collected
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::OrderBook => "order_book",
            DataKind::Trades => "trades",
            DataKind::Candles => "candles",
            DataKind::Ticker => "ticker",
            DataKind::Spread => "spread",
        }
    }

    /// All kinds, in the order they appear in configuration.
    pub fn all() -> [DataKind; 5] {
        [
            DataKind::OrderBook,
            DataKind::Trades,
            DataKind::Candles,
            DataKind::Ticker,
            DataKind::Spread,
        ]
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ------------------------------------------------------------
// Job
// ------------------------------------------------------------
//
// One (exchange, pair, data kind) polling assignment.
//
// A job is constructed once from configuration, validated, and
// then never mutated. Exactly one task owns one job for the
// lifetime of a collection run.
//
#[derive(Debug, Clone)]
pub struct Job {
    /// Exchange identifier (e.g. "kraken", "bybit", "coinbase")
    pub exchange: String,

    /// Trading pair in normalized BASE-QUOTE form (e.g. "BTC-USD")
    pub pair: String,

    /// Logical data kind to poll
    pub kind: DataKind,

    /// Kind-specific request parameters
    pub params: JobParams,

    /// Time between two poll starts
    pub interval: Duration,
}

/// Kind-specific request parameters.
///
/// Only the fields relevant for the job's kind are set. The
/// adapter decides how each maps onto its wire format: depth
/// becomes `count` on Kraken, `limit` on Bybit, `level` on
/// Coinbase.
#[derive(Debug, Clone, Default)]
pub struct JobParams {
    /// Order book depth / level
    pub depth: Option<u32>,

    /// Candle granularity in seconds
    pub granularity_secs: Option<u32>,

    /// Cursor for endpoints that support incremental reads
    pub since: Option<i64>,
}

// ------------------------------------------------------------
// Record
// ------------------------------------------------------------
//
// One captured sample, either a successful payload or a
// normalized error. Exactly one of the two fields is present;
// the constructors below are the only way to build a record,
// so the invariant holds everywhere.
//
// Records are append-only. The engine never mutates or deletes
// a record after it has been handed to the sink.
//
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Capture time, milliseconds since Unix epoch
    pub ts: i64,

    /// Trading pair in normalized form
    pub pair: String,

    /// Logical data kind of the owning stream
    pub kind: DataKind,

    /// Successful response body, normalized by the adapter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Normalized error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RecordError>,
}

impl Record {
    pub fn success(ts: i64, job: &Job, payload: Value) -> Self {
        Self {
            ts,
            pair: job.pair.clone(),
            kind: job.kind,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(ts: i64, job: &Job, err: &FetchError) -> Self {
        Self {
            ts,
            pair: job.pair.clone(),
            kind: job.kind,
            payload: None,
            error: Some(RecordError::from(err)),
        }
    }
}

/// Normalized error description stored inside an error record.
///
/// No raw wire shapes reach this struct; adapters translate
/// exchange envelopes into `FetchError` first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordError {
    /// Error class: "network", "exchange" or "encoding"
    pub kind: String,

    /// Exchange-provided numeric code, where one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    /// Human-readable message
    pub message: String,
}

impl From<&FetchError> for RecordError {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::Network(e) => Self {
                kind: "network".to_string(),
                code: None,
                message: e.to_string(),
            },
            FetchError::Exchange { code, message } => Self {
                kind: "exchange".to_string(),
                code: Some(*code),
                message: message.clone(),
            },
            FetchError::Encoding(e) => Self {
                kind: "encoding".to_string(),
                code: None,
                message: e.to_string(),
            },
        }
    }
}

// ------------------------------------------------------------
// Task outcomes
// ------------------------------------------------------------

/// Terminal state of one job's polling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Deadline elapsed normally (includes a zero-length run)
    Completed,

    /// Abandoned after too many consecutive fetch failures
    Degraded,

    /// Cancelled externally, or the stream became unwritable
    Aborted,
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobOutcome::Completed => "completed",
            JobOutcome::Degraded => "degraded",
            JobOutcome::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Per-task report handed back to the supervisor.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub exchange: String,
    pub pair: String,
    pub kind: DataKind,
    pub outcome: JobOutcome,

    /// Records appended to the stream (payload and error records)
    pub records: u64,

    /// Error records among them
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> Job {
        Job {
            exchange: "kraken".to_string(),
            pair: "BTC-USD".to_string(),
            kind: DataKind::Ticker,
            params: JobParams::default(),
            interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn success_record_has_payload_and_no_error() {
        let r = Record::success(1_700_000_000_000, &job(), json!({"last": "42000.1"}));
        assert!(r.payload.is_some());
        assert!(r.error.is_none());
    }

    #[test]
    fn failure_record_has_error_and_no_payload() {
        let err = FetchError::Exchange {
            code: 1,
            message: "invalid pair".to_string(),
        };
        let r = Record::failure(1_700_000_000_000, &job(), &err);
        assert!(r.payload.is_none());
        let e = r.error.expect("error field");
        assert_eq!(e.kind, "exchange");
        assert_eq!(e.code, Some(1));
        assert_eq!(e.message, "invalid pair");
    }

    #[test]
    fn serialized_record_omits_absent_field() {
        let ok = Record::success(1, &job(), json!([1, 2, 3]));
        let line = serde_json::to_string(&ok).unwrap();
        assert!(line.contains("\"payload\""));
        assert!(!line.contains("\"error\""));

        let err = FetchError::Exchange {
            code: 10001,
            message: "params error".to_string(),
        };
        let bad = Record::failure(2, &job(), &err);
        let line = serde_json::to_string(&bad).unwrap();
        assert!(line.contains("\"error\""));
        assert!(!line.contains("\"payload\""));
    }

    #[test]
    fn data_kind_names_are_stable() {
        for kind in DataKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
