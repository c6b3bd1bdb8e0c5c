//! Exchange adapter registry and factory
//!
//! This module provides:
//! - Central registration of all supported exchanges
//! - A factory function to resolve adapters by name
//!
//! All exchange-specific logic must live in dedicated adapter modules.
//! The rest of the application must interact exclusively through
//! the `ExchangeAdapter` trait.

pub mod adapter;
mod bybit;
mod coinbase;
mod kraken;

use std::sync::Arc;
use adapter::ExchangeAdapter;

/// Returns an exchange adapter instance by name.
///
/// This function acts as a **central factory / registry** for all
/// supported exchanges.
///
/// DESIGN:
/// - Keeps adapter creation in one place
/// - Avoids string-based logic scattered across the codebase
/// - Enables compile-time visibility of supported exchanges
///
/// PARAMETERS:
/// - `name`: Exchange identifier from configuration
///
/// RETURNS:
/// - `Some(Arc<dyn ExchangeAdapter>)` if the exchange is supported
/// - `None` if the exchange is unknown
///
/// CONTRACT:
/// - `name` MUST match the `exchange.name` field in the config file
/// - Adapter names must be lowercase and stable
///
/// THREADING:
/// - Adapters are wrapped in `Arc`
/// - The same adapter instance may be shared across tasks
///
pub fn get_adapter(name: &str) -> Option<Arc<dyn ExchangeAdapter>> {
    match name {
        "kraken" => Some(Arc::new(kraken::KrakenAdapter)),
        "bybit" => Some(Arc::new(bybit::BybitAdapter)),
        "coinbase" => Some(Arc::new(coinbase::CoinbaseAdapter)),
        _ => None,
    }
}
