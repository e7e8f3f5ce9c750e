use std::str::FromStr;

/// Runtime configuration, resolved once at startup from the environment.
///
/// Every knob has a default so the server comes up with nothing but a feed
/// URL; `DATABASE_URL` is optional and toggles persistence and the audit
/// trail.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream feed websocket URL.
    pub feed_url: String,
    /// Symbols subscribed at startup when the database has none.
    pub feed_symbols: Vec<String>,
    /// PostgreSQL connection URL. `None` disables persistence.
    pub database_url: Option<String>,
    /// Max connections in the database pool.
    pub db_pool_size: u32,
    /// Tick count that triggers a durable-storage flush.
    pub batch_size: usize,
    /// Period of the broadcast scheduler, milliseconds.
    pub broadcast_interval_ms: u64,
    /// Wait before reconnecting after the feed drops, milliseconds.
    pub reconnect_backoff_ms: u64,
    /// Delay between consecutive subscribe requests, milliseconds.
    pub subscribe_delay_ms: u64,
    /// HTTP/WebSocket bind address.
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            feed_url: std::env::var("FEED_URL")
                .unwrap_or_else(|_| "wss://ws.finnhub.io".to_string()),
            feed_symbols: std::env::var("FEED_SYMBOLS")
                .map(|raw| parse_symbol_list(&raw))
                .unwrap_or_else(|_| vec!["OANDA:EUR_USD".to_string()]),
            database_url: std::env::var("DATABASE_URL").ok(),
            db_pool_size: env_or("DB_POOL_MAX_SIZE", 10),
            batch_size: env_or("TICK_BATCH_SIZE", 10),
            broadcast_interval_ms: env_or("BROADCAST_INTERVAL_MS", 500),
            reconnect_backoff_ms: env_or("FEED_RECONNECT_BACKOFF_MS", 1_000),
            subscribe_delay_ms: env_or("FEED_SUBSCRIBE_DELAY_MS", 50),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_list() {
        let symbols = parse_symbol_list("OANDA:EUR_USD, OANDA:GBP_USD,,OANDA:USD_JPY ");
        assert_eq!(
            symbols,
            vec!["OANDA:EUR_USD", "OANDA:GBP_USD", "OANDA:USD_JPY"]
        );
    }

    #[test]
    fn test_parse_symbol_list_empty() {
        assert!(parse_symbol_list("").is_empty());
    }
}
