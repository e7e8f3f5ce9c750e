use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::database::BatchPersister;
use crate::market_data::TickCache;

use super::envelope::{decode_message, FeedCommand, FeedMessage};

/// Errors from the upstream feed transport.
///
/// All of them are transient from the pipeline's point of view: the run loop
/// backs off, reconnects and resubscribes. Nothing here is surfaced to
/// callers.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("feed stream closed by upstream")]
    StreamClosed,
}

/// Owns the upstream connection lifecycle: connect, subscribe, dispatch
/// inbound messages, detect disconnect, reconnect with resubscription
/// replay.
///
/// Decoded ticks flow to the cache (overwrite) and the persister (enqueue).
/// A decode failure on one message is logged and discarded; it never tears
/// down the connection.
pub struct FeedConnector {
    url: String,
    /// Symbols subscribed at startup. Reconnects resubscribe to the union of
    /// these and whatever the cache has seen since, so subscriptions added
    /// at runtime survive a reconnect.
    configured_symbols: Vec<String>,
    cache: Arc<TickCache>,
    persister: Arc<BatchPersister>,
    reconnect_backoff: Duration,
    subscribe_delay: Duration,
}

impl FeedConnector {
    pub fn new(
        url: String,
        configured_symbols: Vec<String>,
        cache: Arc<TickCache>,
        persister: Arc<BatchPersister>,
    ) -> Self {
        Self {
            url,
            configured_symbols,
            cache,
            persister,
            reconnect_backoff: Duration::from_millis(1_000),
            subscribe_delay: Duration::from_millis(50),
        }
    }

    /// Override the reconnect backoff and the inter-subscribe pacing delay.
    pub fn with_timing(mut self, reconnect_backoff: Duration, subscribe_delay: Duration) -> Self {
        self.reconnect_backoff = reconnect_backoff;
        self.subscribe_delay = subscribe_delay;
        self
    }

    /// Run the connection lifecycle until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut attempt: u64 = 0;

        while !cancel.is_cancelled() {
            if attempt > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.reconnect_backoff) => {}
                }
            }
            attempt += 1;

            match self.connect_and_stream(&cancel).await {
                // Only a cancellation exits the inner loop cleanly.
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        "feed connection lost: {e}; reconnecting in {:?}",
                        self.reconnect_backoff
                    );
                }
            }
        }

        tracing::info!("feed connector stopped");
    }

    /// One connection lifetime: subscribe, then pump messages until the
    /// stream dies or the token fires.
    async fn connect_and_stream(&self, cancel: &CancellationToken) -> Result<(), FeedError> {
        tracing::info!(url = %self.url, "connecting to upstream feed");
        let (mut stream, _) = connect_async(self.url.as_str()).await?;
        tracing::info!("feed connected");

        let symbols = self.subscription_targets();
        tracing::info!(count = symbols.len(), "subscribing to symbols");

        for symbol in &symbols {
            let command = FeedCommand::Subscribe {
                symbol: symbol.clone(),
            };
            match serde_json::to_string(&command) {
                Ok(payload) => {
                    stream.send(Message::Text(payload)).await?;
                    tracing::debug!(%symbol, "subscribed");
                }
                Err(e) => tracing::error!(%symbol, "failed to encode subscribe request: {e}"),
            }

            // Pacing between subscribe requests; upstream rate-limits.
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.subscribe_delay) => {}
            }
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                next = stream.next() => match next {
                    Some(Ok(message)) => self.handle_frame(message),
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(FeedError::StreamClosed),
                }
            }
        }
    }

    /// Symbols to (re)subscribe: the configured list plus every symbol the
    /// cache currently knows, deduplicated, configured entries first.
    pub fn subscription_targets(&self) -> Vec<String> {
        let mut targets = self.configured_symbols.clone();
        for symbol in self.cache.symbols() {
            if !targets.contains(&symbol) {
                targets.push(symbol);
            }
        }
        targets
    }

    fn handle_frame(&self, message: Message) {
        match message {
            Message::Text(text) => self.handle_text(&text),
            // Transport-level keepalives; tungstenite answers pings itself.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(frame) => tracing::warn!(?frame, "upstream sent close frame"),
            _ => {}
        }
    }

    /// Handle one raw text payload from the feed: classify, decode, forward
    /// each tick to the cache and the persister. Decode failures are logged
    /// and dropped.
    pub fn handle_text(&self, raw: &str) {
        match decode_message(raw) {
            Ok(FeedMessage::Ping) => tracing::debug!("keepalive from feed"),
            Ok(FeedMessage::Trades(ticks)) => {
                for tick in ticks {
                    tracing::debug!(symbol = %tick.symbol, price = %tick.price, "tick");
                    self.persister.enqueue(tick.clone());
                    self.cache.set(tick);
                }
            }
            Ok(FeedMessage::Other) => {}
            Err(e) => tracing::warn!("discarding malformed feed message: {e}"),
        }
    }
}
