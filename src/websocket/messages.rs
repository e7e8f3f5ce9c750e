use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::PriceTick;

/// Server -> client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Latest price for a subscribed symbol, pushed on the broadcast
    /// interval.
    PriceUpdate {
        symbol: String,
        price: Decimal,
        bid: Decimal,
        ask: Decimal,
        event_time_ms: i64,
    },
    /// Subscription confirmation
    Subscribed { symbol: String },
    /// Unsubscription confirmation
    Unsubscribed { symbol: String },
    /// Error message
    Error { message: String },
}

impl From<PriceTick> for WsMessage {
    fn from(tick: PriceTick) -> Self {
        WsMessage::PriceUpdate {
            symbol: tick.symbol,
            price: tick.price,
            bid: tick.bid,
            ask: tick.ask,
            event_time_ms: tick.event_time_ms,
        }
    }
}

/// Client -> server subscription requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { symbol: String },
    Unsubscribe { symbol: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_update_wire_format() {
        let tick = PriceTick::from_trade("OANDA:EUR_USD", dec!(1.0850), 1_700_000_000_000);
        let json = serde_json::to_value(WsMessage::from(tick)).unwrap();

        assert_eq!(json["type"], "price_update");
        assert_eq!(json["symbol"], "OANDA:EUR_USD");
        assert_eq!(json["price"], "1.0850");
    }

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"subscribe","symbol":"OANDA:EUR_USD"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { symbol } if symbol == "OANDA:EUR_USD"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"unsubscribe","symbol":"OANDA:EUR_USD"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unsubscribe { .. }));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let parsed: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"action":"shout","symbol":"X"}"#);
        assert!(parsed.is_err());
    }
}
