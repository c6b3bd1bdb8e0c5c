/// Utility helpers used by all collectors.
///
/// This module contains:
/// - Symbol conversion helpers
/// - Time helpers
///
/// IMPORTANT:
/// - No exchange-specific business logic should live here.
/// - This module must remain lightweight and deterministic.
///
/// Exchange-specific behavior should be handled in:
/// - adapters
/// - exchange configuration
/// - adapter implementations
///

/// Returns the current Unix timestamp in milliseconds.
///
/// This is the capture time stamped onto every record, so all
/// streams in one run share the same clock.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Splits a normalized pair into (base, quote).
///
/// Target format:
///     BASE-QUOTE
///
/// Examples:
/// - "BTC-USD"  -> Some(("BTC", "USD"))
/// - "ETH-USDT" -> Some(("ETH", "USDT"))
/// - "BTCUSD"   -> None
///
/// Validation of pair correctness happens during job
/// construction; adapters may assume a valid shape.
pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (base, quote) = pair.split_once('-')?;
    if base.is_empty() || quote.is_empty() {
        return None;
    }
    Some((base, quote))
}

/// Kraken uses its own naming convention for a few assets
/// (e.g. BTC -> XBT). Everything else passes through unchanged.
const KRAKEN_NAME_CONVENTION: [(&str, &str); 2] = [
    ("BTC", "XBT"),
    ("DOGE", "XDG"),
];

fn kraken_currency(currency: &str) -> &str {
    for (ours, theirs) in KRAKEN_NAME_CONVENTION {
        if currency == ours {
            return theirs;
        }
    }
    currency
}

/// Convert an internal pair into the exchange-specific symbol.
///
/// Input:
/// - exchange: exchange identifier (e.g. "kraken", "bybit")
/// - pair: internal format "BASE-QUOTE"
///
/// Output:
/// - Exchange-specific symbol representation
///
/// Examples:
/// - ("kraken", "BTC-USD")    -> "XBTUSD"
/// - ("bybit", "BTC-USDT")    -> "BTCUSDT"
/// - ("coinbase", "BTC-USD")  -> "BTC-USD"
///
/// Centralized conversion keeps configuration files
/// exchange-agnostic.
pub fn symbol_to_exchange(exchange: &str, pair: &str) -> String {
    match exchange {
        "kraken" => match split_pair(pair) {
            Some((base, quote)) => {
                format!("{}{}", kraken_currency(base), kraken_currency(quote))
            }
            None => pair.replace('-', ""),
        },
        "bybit" => pair.replace('-', ""),
        "coinbase" => pair.to_string(),
        _ => pair.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_pair_accepts_base_quote() {
        assert_eq!(split_pair("BTC-USD"), Some(("BTC", "USD")));
        assert_eq!(split_pair("ETH-USDT"), Some(("ETH", "USDT")));
    }

    #[test]
    fn split_pair_rejects_malformed_input() {
        assert_eq!(split_pair("BTCUSD"), None);
        assert_eq!(split_pair("-USD"), None);
        assert_eq!(split_pair("BTC-"), None);
    }

    #[test]
    fn kraken_symbol_uses_xbt() {
        assert_eq!(symbol_to_exchange("kraken", "BTC-USD"), "XBTUSD");
        assert_eq!(symbol_to_exchange("kraken", "ETH-USD"), "ETHUSD");
    }

    #[test]
    fn bybit_symbol_strips_separator() {
        assert_eq!(symbol_to_exchange("bybit", "BTC-USDT"), "BTCUSDT");
    }

    #[test]
    fn coinbase_symbol_is_unchanged() {
        assert_eq!(symbol_to_exchange("coinbase", "BTC-USD"), "BTC-USD");
    }
}
