use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::PriceTick;

use super::repositories::TickRepository;

/// Counters for monitoring the persister.
#[derive(Debug, Clone)]
pub struct PersisterStats {
    /// Ticks sitting in the pending batch right now.
    pub pending: usize,
    /// Value of the flush counter right now.
    pub counter: usize,
    /// Flushes dispatched (lifetime).
    pub flushes: u64,
    /// Ticks accepted by the store (lifetime).
    pub persisted: u64,
    /// Ticks dropped because a store write failed (lifetime).
    pub dropped: u64,
}

#[derive(Default)]
struct PendingBatch {
    ticks: Vec<PriceTick>,
    counter: usize,
}

/// Accumulates decoded ticks and flushes them to the durable store in
/// bounded batches.
///
/// One counter is shared across all symbols, so a burst on a single symbol
/// triggers a flush bundling ticks from every symbol. The enqueue that
/// crosses the threshold swaps the batch for an empty one and resets the
/// counter inside one critical section; concurrent enqueues can neither
/// double-flush nor lose ticks. The store write itself runs outside the
/// lock, off the ingestion hot path.
///
/// A failed store write drops the batch without retry: persistence here is
/// at-most-once. The counter resets regardless of the write outcome.
pub struct BatchPersister {
    store: Arc<dyn TickRepository>,
    threshold: usize,
    pending: Mutex<PendingBatch>,
    flushes: AtomicU64,
    persisted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl BatchPersister {
    pub fn new(store: Arc<dyn TickRepository>, threshold: usize) -> Self {
        Self {
            store,
            threshold: threshold.max(1),
            pending: Mutex::new(PendingBatch::default()),
            flushes: AtomicU64::new(0),
            persisted: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append a tick to the pending batch; the enqueue that reaches the
    /// threshold dispatches the whole batch to the store.
    pub fn enqueue(&self, tick: PriceTick) {
        let drained = {
            let mut pending = self.pending.lock();
            pending.ticks.push(tick);
            pending.counter += 1;

            if pending.counter >= self.threshold && !pending.ticks.is_empty() {
                pending.counter = 0;
                Some(std::mem::take(&mut pending.ticks))
            } else {
                None
            }
        };

        if let Some(batch) = drained {
            self.flushes.fetch_add(1, Ordering::Relaxed);
            // Fire and forget; the enqueue path never waits on the store.
            tokio::spawn(Self::write_batch(
                Arc::clone(&self.store),
                batch,
                Arc::clone(&self.persisted),
                Arc::clone(&self.dropped),
            ));
        }
    }

    /// Flush whatever is pending regardless of the counter, waiting for the
    /// store write to finish. Called on graceful shutdown so a sub-threshold
    /// remainder is not silently lost.
    pub async fn flush_pending(&self) {
        let drained = {
            let mut pending = self.pending.lock();
            pending.counter = 0;
            if pending.ticks.is_empty() {
                None
            } else {
                Some(std::mem::take(&mut pending.ticks))
            }
        };

        if let Some(batch) = drained {
            self.flushes.fetch_add(1, Ordering::Relaxed);
            Self::write_batch(
                Arc::clone(&self.store),
                batch,
                Arc::clone(&self.persisted),
                Arc::clone(&self.dropped),
            )
            .await;
        }
    }

    pub fn stats(&self) -> PersisterStats {
        let pending = self.pending.lock();
        PersisterStats {
            pending: pending.ticks.len(),
            counter: pending.counter,
            flushes: self.flushes.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    async fn write_batch(
        store: Arc<dyn TickRepository>,
        batch: Vec<PriceTick>,
        persisted: Arc<AtomicU64>,
        dropped: Arc<AtomicU64>,
    ) {
        let count = batch.len();

        match tokio::task::spawn_blocking(move || store.insert_batch(&batch)).await {
            Ok(Ok(inserted)) => {
                persisted.fetch_add(inserted as u64, Ordering::Relaxed);
                tracing::debug!(inserted, "persisted tick batch");
            }
            Ok(Err(e)) => {
                dropped.fetch_add(count as u64, Ordering::Relaxed);
                tracing::error!("failed to persist batch of {count} ticks: {e}");
            }
            Err(e) => {
                dropped.fetch_add(count as u64, Ordering::Relaxed);
                tracing::error!("persistence task failed for {count} ticks: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repositories::tests::{FailingTickRepository, RecordingTickRepository};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn tick(symbol: &str, n: i64) -> PriceTick {
        PriceTick::from_trade(symbol, Decimal::from(n), n)
    }

    #[tokio::test]
    async fn test_threshold_enqueues_trigger_exactly_one_flush() {
        let (store, mut batches) = RecordingTickRepository::channel();
        let persister = BatchPersister::new(Arc::new(store), 10);

        for i in 0..10 {
            persister.enqueue(tick("OANDA:EUR_USD", i));
        }

        // The swap happened on the tenth enqueue itself.
        let stats = persister.stats();
        assert_eq!(stats.counter, 0);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.flushes, 1);

        let batch = tokio::time::timeout(Duration::from_secs(1), batches.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch.len(), 10);

        // No second flush ever arrives.
        assert!(batches.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_flush_bundles_ticks_across_symbols() {
        let (store, mut batches) = RecordingTickRepository::channel();
        let persister = BatchPersister::new(Arc::new(store), 5);

        persister.enqueue(tick("A", 1));
        persister.enqueue(tick("B", 2));
        persister.enqueue(tick("A", 3));
        persister.enqueue(tick("C", 4));
        persister.enqueue(tick("A", 5));

        let batch = tokio::time::timeout(Duration::from_secs(1), batches.recv())
            .await
            .unwrap()
            .unwrap();

        let symbols: Vec<&str> = batch.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A", "B", "A", "C", "A"]);
    }

    #[tokio::test]
    async fn test_sub_threshold_ticks_stay_pending() {
        let (store, mut batches) = RecordingTickRepository::channel();
        let persister = BatchPersister::new(Arc::new(store), 10);

        for i in 0..9 {
            persister.enqueue(tick("OANDA:EUR_USD", i));
        }

        let stats = persister.stats();
        assert_eq!(stats.pending, 9);
        assert_eq!(stats.counter, 9);
        assert_eq!(stats.flushes, 0);
        assert!(batches.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_flush_pending_drains_the_remainder() {
        let (store, mut batches) = RecordingTickRepository::channel();
        let persister = BatchPersister::new(Arc::new(store), 10);

        for i in 0..3 {
            persister.enqueue(tick("OANDA:EUR_USD", i));
        }
        persister.flush_pending().await;

        let batch = batches.try_recv().unwrap();
        assert_eq!(batch.len(), 3);

        let stats = persister.stats();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.counter, 0);
        assert_eq!(stats.persisted, 3);
    }

    #[tokio::test]
    async fn test_flush_pending_on_empty_batch_is_a_no_op() {
        let (store, mut batches) = RecordingTickRepository::channel();
        let persister = BatchPersister::new(Arc::new(store), 10);

        persister.flush_pending().await;

        assert_eq!(persister.stats().flushes, 0);
        assert!(batches.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_store_failure_drops_the_batch_and_continues() {
        let persister = BatchPersister::new(Arc::new(FailingTickRepository), 2);

        persister.enqueue(tick("OANDA:EUR_USD", 1));
        persister.enqueue(tick("OANDA:EUR_USD", 2));

        // Counter already reset; the loss is recorded once the write settles.
        assert_eq!(persister.stats().counter, 0);

        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if persister.stats().dropped == 2 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dropped counter settles");

        // Ingestion keeps going after the failure.
        persister.enqueue(tick("OANDA:EUR_USD", 3));
        assert_eq!(persister.stats().pending, 1);
    }

    #[tokio::test]
    async fn test_next_cycle_starts_clean_after_flush() {
        let (store, mut batches) = RecordingTickRepository::channel();
        let persister = BatchPersister::new(Arc::new(store), 3);

        for i in 0..6 {
            persister.enqueue(tick("OANDA:EUR_USD", i));
        }

        let first = tokio::time::timeout(Duration::from_secs(1), batches.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), batches.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        assert_eq!(persister.stats().flushes, 2);
    }
}
