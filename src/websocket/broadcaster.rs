use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::registry::ConnectionId;

use super::messages::WsMessage;

/// A send to a connection whose outbound queue is gone, usually because the
/// client disconnected mid-cycle.
#[derive(Debug, Error)]
#[error("connection {0} is no longer reachable")]
pub struct PushError(pub ConnectionId);

/// Push transport over per-connection outbound queues.
///
/// Every websocket connection registers an unbounded channel; whoever holds
/// the broadcaster can push to single connections or fan out to a member
/// list. A send to a vanished connection fails on its own and never affects
/// the other members.
#[derive(Clone, Default)]
pub struct Broadcaster {
    connections: Arc<DashMap<ConnectionId, mpsc::UnboundedSender<WsMessage>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Register a connection and get its outbound queue.
    pub fn register(&self, connection: ConnectionId) -> mpsc::UnboundedReceiver<WsMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(connection, tx);
        rx
    }

    pub fn unregister(&self, connection: &ConnectionId) {
        self.connections.remove(connection);
    }

    /// Queue one message for one connection.
    pub fn send_to(&self, connection: &ConnectionId, message: WsMessage) -> Result<(), PushError> {
        match self.connections.get(connection) {
            Some(tx) => tx.send(message).map_err(|_| PushError(*connection)),
            None => Err(PushError(*connection)),
        }
    }

    /// Fan one message out to every member; a failed member is logged and
    /// skipped. Returns how many sends succeeded.
    pub fn send_to_members(&self, members: &[ConnectionId], message: &WsMessage) -> usize {
        let mut delivered = 0;
        for connection in members {
            match self.send_to(connection, message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("dropping push: {e}"),
            }
        }
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn update(symbol: &str) -> WsMessage {
        WsMessage::from(crate::models::PriceTick::from_trade(symbol, dec!(1.0), 1))
    }

    #[tokio::test]
    async fn test_register_send_unregister() {
        let broadcaster = Broadcaster::new();
        let connection = Uuid::new_v4();

        let mut rx = broadcaster.register(connection);
        assert_eq!(broadcaster.connection_count(), 1);

        broadcaster.send_to(&connection, update("A")).unwrap();
        assert!(matches!(rx.recv().await, Some(WsMessage::PriceUpdate { .. })));

        broadcaster.unregister(&connection);
        assert_eq!(broadcaster.connection_count(), 0);
        assert!(broadcaster.send_to(&connection, update("A")).is_err());
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection_fails() {
        let broadcaster = Broadcaster::new();
        assert!(broadcaster.send_to(&Uuid::new_v4(), update("A")).is_err());
    }

    #[tokio::test]
    async fn test_send_to_members_isolates_failures() {
        let broadcaster = Broadcaster::new();
        let dead = Uuid::new_v4();
        let live_a = Uuid::new_v4();
        let live_b = Uuid::new_v4();

        drop(broadcaster.register(dead));
        let mut rx_a = broadcaster.register(live_a);
        let mut rx_b = broadcaster.register(live_b);

        let delivered =
            broadcaster.send_to_members(&[dead, live_a, live_b], &update("OANDA:EUR_USD"));

        assert_eq!(delivered, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }
}
