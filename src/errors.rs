use thiserror::Error;

use crate::schema::DataKind;

// ------------------------------------------------------------
// Fetch errors
// ------------------------------------------------------------
//
// Everything that can go wrong during one adapter call.
//
// The distinction matters for the scheduler: all three variants
// are recoverable (recorded and retried with backoff), but they
// are recorded with different error classes so downstream
// consumers can tell a flaky network apart from a rejected
// request.
//
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: DNS, TLS, connect, timeout.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The exchange answered, but with a non-success envelope
    /// (non-zero return code, non-empty error field, 4xx/5xx).
    ///
    /// IMPORTANT:
    /// This is an error, never data. The original response body
    /// does not leave the adapter.
    #[error("exchange error {code}: {message}")]
    Exchange { code: i64, message: String },

    /// The body was not the JSON shape the adapter expected.
    #[error("malformed response body: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl FetchError {
    /// Builds an `Encoding` error for a body that parsed as JSON
    /// but is missing the structure the adapter relies on.
    pub(crate) fn encoding(msg: impl Into<String>) -> Self {
        FetchError::Encoding(<serde_json::Error as serde::de::Error>::custom(msg.into()))
    }
}

// ------------------------------------------------------------
// Configuration errors
// ------------------------------------------------------------
//
// All of these are fatal at startup. Nothing is spawned and no
// file is touched until every job has passed validation.
//
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown exchange '{0}'")]
    UnknownExchange(String),

    #[error("exchange '{exchange}' does not support {kind}")]
    UnsupportedKind { exchange: String, kind: DataKind },

    #[error("pair '{0}' is not in BASE-QUOTE form")]
    InvalidPair(String),

    #[error("{exchange} {kind}: {reason}")]
    InvalidParams {
        exchange: String,
        kind: DataKind,
        reason: String,
    },

    #[error("no enabled exchange produced any job")]
    NoJobs,
}
