use reqwest::Client;
use serde_json::Value;

use crate::errors::{ConfigError, FetchError};
use crate::schema::{DataKind, Job};

/// ExchangeAdapter is the core abstraction layer between:
/// - The generic polling runtime
/// - Exchange-specific REST APIs
///
/// Each exchange implementation must:
/// - Declare which data kinds it serves
/// - Build and perform one request per fetch
/// - Normalize the success/error envelope
///
/// DESIGN GOALS:
/// - Zero exchange-specific logic outside adapters
/// - One adapter per exchange
/// - Uniform payload/error shape across all exchanges
///
/// THREAD SAFETY:
/// - Must be Send + Sync
/// - Adapter instances are shared across tasks
///
#[async_trait::async_trait]
pub trait ExchangeAdapter: Send + Sync {

    /// Returns the canonical exchange name.
    ///
    /// CONTRACT:
    /// - Must match `exchange.name` in configuration
    /// - Used for logging, symbol conversion and the output
    ///   directory layout
    ///
    /// EXAMPLES:
    /// - "kraken"
    /// - "bybit"
    /// - "coinbase"
    ///
    fn name(&self) -> &'static str;

    /// Whether this exchange serves the given data kind.
    ///
    /// Unsupported kinds are a configuration error, detected
    /// during job construction. A task is never spawned for a
    /// kind the adapter cannot fetch.
    fn supports(&self, kind: DataKind) -> bool;

    /// Validates kind-specific job parameters.
    ///
    /// Called once per job at startup, after `supports`. This is
    /// the place to reject parameters the exchange would refuse
    /// at runtime (granularity sets, order book levels), so a
    /// misconfigured run fails before any file is created.
    fn validate(&self, _job: &Job) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Performs exactly one request for the job and unwraps the
    /// exchange envelope.
    ///
    /// RETURNS:
    /// - Ok(payload): the normalized successful response body
    /// - Err(FetchError): transport failure, non-success
    ///   envelope, or an undecodable body
    ///
    /// RESPONSIBILITIES:
    /// - Build the request URL from job pair/params
    /// - Inspect the exchange-specific envelope
    /// - Report a non-success envelope as an error, never as data
    ///
    /// MUST NOT:
    /// - Retry (retry policy lives in the scheduler)
    /// - Sleep or pace (pacing lives in the scheduler)
    /// - Mutate shared state
    ///
    async fn fetch(&self, client: &Client, job: &Job) -> Result<Value, FetchError>;
}
