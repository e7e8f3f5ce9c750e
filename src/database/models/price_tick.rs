use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use crate::models::PriceTick;

/// Persisted tick row.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::database::schema::price_ticks)]
#[diesel(primary_key(id))]
pub struct PriceTickRecord {
    pub id: i64,
    pub symbol: String,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub event_time_ms: i64,
    /// When this row was inserted, set by the database.
    pub created_at: DateTime<Utc>,
}

impl From<PriceTickRecord> for PriceTick {
    fn from(record: PriceTickRecord) -> Self {
        Self {
            symbol: record.symbol,
            price: record.price,
            bid: record.bid,
            ask: record.ask,
            event_time_ms: record.event_time_ms,
        }
    }
}

/// New tick for batch insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::database::schema::price_ticks)]
pub struct NewPriceTick {
    pub symbol: String,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub event_time_ms: i64,
}

impl From<&PriceTick> for NewPriceTick {
    fn from(tick: &PriceTick) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            price: tick.price,
            bid: tick.bid,
            ask: tick.ask,
            event_time_ms: tick.event_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_price_tick_from_domain() {
        let tick = PriceTick::from_trade("OANDA:EUR_USD", dec!(1.0850), 1_700_000_000_000);
        let row = NewPriceTick::from(&tick);

        assert_eq!(row.symbol, "OANDA:EUR_USD");
        assert_eq!(row.price, dec!(1.0850));
        assert_eq!(row.bid, tick.bid);
        assert_eq!(row.ask, tick.ask);
        assert_eq!(row.event_time_ms, 1_700_000_000_000);
    }
}
