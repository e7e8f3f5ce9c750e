use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fixed half-spread applied around the traded price.
///
/// The feed delivers trades, not quotes; bid and ask are synthesized as
/// `price * (1 - SPREAD)` and `price * (1 + SPREAD)`.
pub const SPREAD: Decimal = dec!(0.0001);

/// A single priced quote event for one tradable instrument.
///
/// Immutable once constructed. The decoder creates it; the cache and the
/// persister each receive their own copy, so neither side shares mutable
/// state with the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceTick {
    /// Instrument identifier, e.g. "OANDA:EUR_USD".
    pub symbol: String,
    /// Traded price as reported by the feed.
    pub price: Decimal,
    /// Synthesized bid, `price * (1 - SPREAD)`.
    pub bid: Decimal,
    /// Synthesized ask, `price * (1 + SPREAD)`.
    pub ask: Decimal,
    /// Exchange event time, epoch milliseconds.
    pub event_time_ms: i64,
}

impl PriceTick {
    /// Build a tick from a traded price, deriving bid and ask at the fixed
    /// spread.
    pub fn from_trade(symbol: impl Into<String>, price: Decimal, event_time_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            bid: price * (Decimal::ONE - SPREAD),
            ask: price * (Decimal::ONE + SPREAD),
            event_time_ms,
        }
    }

    /// Event time as a UTC timestamp, if the millisecond value is in range.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.event_time_ms).single()
    }
}
