use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::registry::SubscriptionRegistry;
use crate::websocket::{Broadcaster, WsMessage};

use super::tick_cache::TickCache;

/// Fixed-interval task that fans the latest cached price for every symbol
/// out to that symbol's subscribers.
///
/// Delivery is advisory last-value push: at most one snapshot per interval,
/// not every intermediate tick. A failed push to one member is logged and
/// skipped; it never aborts the cycle or affects other members.
pub struct BroadcastScheduler {
    cache: Arc<TickCache>,
    registry: Arc<SubscriptionRegistry>,
    broadcaster: Broadcaster,
    period: Duration,
}

impl BroadcastScheduler {
    pub fn new(
        cache: Arc<TickCache>,
        registry: Arc<SubscriptionRegistry>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            cache,
            registry,
            broadcaster,
            period: Duration::from_millis(500),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Run broadcast cycles on the configured period until cancelled.
    /// Cancellation is observed between cycles; a cycle itself never blocks
    /// on I/O, so shutdown is prompt.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(period = ?self.period, "broadcast scheduler started");

        let mut ticker = tokio::time::interval(self.period);
        // A slow cycle must not be followed by a burst of catch-up cycles.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.broadcast_cycle(),
            }
        }

        tracing::info!("broadcast scheduler stopped");
    }

    /// One Idle -> Broadcasting -> Idle transition: snapshot the cache and
    /// push each symbol's latest tick to its group members.
    pub fn broadcast_cycle(&self) {
        let snapshot = self.cache.snapshot();
        if snapshot.is_empty() {
            tracing::debug!("cache is empty, nothing to broadcast");
            return;
        }

        tracing::debug!(symbols = snapshot.len(), "broadcasting cached prices");

        for (symbol, tick) in snapshot {
            let members = self.registry.members_of(&symbol);
            if members.is_empty() {
                continue;
            }

            let delivered = self
                .broadcaster
                .send_to_members(&members, &WsMessage::from(tick));
            tracing::trace!(%symbol, delivered, total = members.len(), "pushed price update");
        }
    }
}
