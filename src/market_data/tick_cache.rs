use dashmap::DashMap;

use crate::models::PriceTick;

/// Concurrent last-value store, one slot per instrument symbol.
///
/// Writes are last-writer-wins by arrival order: an out-of-order tick simply
/// replaces the slot, with no check against event time. Sharded locking means
/// a snapshot never blocks writers for its whole lifetime.
#[derive(Default)]
pub struct TickCache {
    slots: DashMap<String, PriceTick>,
}

impl TickCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Unconditional overwrite of the symbol's slot.
    pub fn set(&self, tick: PriceTick) {
        self.slots.insert(tick.symbol.clone(), tick);
    }

    /// Latest tick for the symbol, if one has been seen.
    pub fn get(&self, symbol: &str) -> Option<PriceTick> {
        self.slots.get(symbol).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every slot. Each shard is locked only while its
    /// entries are copied out, so concurrent writers proceed.
    pub fn snapshot(&self) -> Vec<(String, PriceTick)> {
        self.slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Currently known symbol set.
    pub fn symbols(&self) -> Vec<String> {
        self.slots.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn tick(symbol: &str, price: Decimal, event_time_ms: i64) -> PriceTick {
        PriceTick::from_trade(symbol, price, event_time_ms)
    }

    #[test]
    fn test_get_missing_symbol() {
        let cache = TickCache::new();
        assert!(cache.get("OANDA:EUR_USD").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_write_wins_per_symbol() {
        let cache = TickCache::new();

        cache.set(tick("OANDA:EUR_USD", dec!(1.0850), 10));
        cache.set(tick("OANDA:GBP_USD", dec!(1.2500), 11));
        cache.set(tick("OANDA:EUR_USD", dec!(1.0860), 12));

        assert_eq!(cache.get("OANDA:EUR_USD").unwrap().price, dec!(1.0860));
        assert_eq!(cache.get("OANDA:GBP_USD").unwrap().price, dec!(1.2500));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_arrival_order_beats_event_time() {
        let cache = TickCache::new();

        // The second write carries an older event time; it still wins.
        cache.set(tick("OANDA:EUR_USD", dec!(1.0860), 20));
        cache.set(tick("OANDA:EUR_USD", dec!(1.0850), 10));

        assert_eq!(cache.get("OANDA:EUR_USD").unwrap().price, dec!(1.0850));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let cache = TickCache::new();
        cache.set(tick("A", dec!(1.0), 1));

        let snapshot = cache.snapshot();
        cache.set(tick("A", dec!(2.0), 2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1.price, dec!(1.0));
        assert_eq!(cache.get("A").unwrap().price, dec!(2.0));
    }

    #[test]
    fn test_symbols_reflect_known_set() {
        let cache = TickCache::new();
        cache.set(tick("A", dec!(1.0), 1));
        cache.set(tick("B", dec!(2.0), 2));

        let mut symbols = cache.symbols();
        symbols.sort();
        assert_eq!(symbols, vec!["A", "B"]);
    }

    #[test]
    fn test_snapshot_under_concurrent_writes() {
        let cache = Arc::new(TickCache::new());
        let writer_cache = Arc::clone(&cache);

        let writer = std::thread::spawn(move || {
            for i in 0..1_000i64 {
                writer_cache.set(tick("A", Decimal::from(i), i));
                writer_cache.set(tick("B", Decimal::from(i), i));
            }
        });

        // Every observed value must be one some writer actually produced.
        for _ in 0..100 {
            for (symbol, observed) in cache.snapshot() {
                assert!(observed.price >= Decimal::ZERO);
                assert!(observed.price < Decimal::from(1_000));
                assert!(symbol == "A" || symbol == "B");
            }
        }

        writer.join().unwrap();
    }
}
