use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PriceTick;

/// Raw upstream envelope. `type` discriminates trade batches from keepalives.
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Vec<FeedTrade>,
}

/// One trade entry inside a `trade` envelope.
#[derive(Debug, Deserialize)]
pub struct FeedTrade {
    #[serde(rename = "s")]
    pub symbol: String,
    /// The feed sends the price as a decimal string.
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "t")]
    pub event_time_ms: i64,
}

/// Control message sent to the upstream feed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedCommand {
    Subscribe { symbol: String },
    Unsubscribe { symbol: String },
}

/// Failure to turn one raw feed payload into ticks. Always isolated to the
/// offending message; the connection and the run loop keep going.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed feed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unparseable price {price:?} for {symbol}")]
    Price { symbol: String, price: String },
}

/// Classified inbound feed message.
#[derive(Debug)]
pub enum FeedMessage {
    /// Keepalive from upstream; nothing to do.
    Ping,
    /// Ticks decoded from a `trade` envelope.
    Trades(Vec<PriceTick>),
    /// Any other envelope type; ignored.
    Other,
}

/// Decode one raw feed payload into a classified message.
pub fn decode_message(raw: &str) -> Result<FeedMessage, DecodeError> {
    let envelope: FeedEnvelope = serde_json::from_str(raw)?;

    match envelope.kind.as_str() {
        "ping" => Ok(FeedMessage::Ping),
        "trade" => {
            let mut ticks = Vec::with_capacity(envelope.data.len());
            for trade in envelope.data {
                let price = Decimal::from_str(&trade.price).map_err(|_| DecodeError::Price {
                    symbol: trade.symbol.clone(),
                    price: trade.price.clone(),
                })?;
                ticks.push(PriceTick::from_trade(trade.symbol, price, trade.event_time_ms));
            }
            Ok(FeedMessage::Trades(ticks))
        }
        _ => Ok(FeedMessage::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_trade_envelope() {
        let raw = r#"{"type":"trade","data":[{"s":"OANDA:EUR_USD","p":"1.0850","t":1700000000000}]}"#;

        let ticks = match decode_message(raw).unwrap() {
            FeedMessage::Trades(ticks) => ticks,
            other => panic!("expected trades, got {other:?}"),
        };

        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].symbol, "OANDA:EUR_USD");
        assert_eq!(ticks[0].price, dec!(1.0850));
        assert_eq!(ticks[0].bid, dec!(1.08489150));
        assert_eq!(ticks[0].ask, dec!(1.08510850));
        assert_eq!(ticks[0].event_time_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_decode_multi_trade_envelope() {
        let raw = r#"{"type":"trade","data":[
            {"s":"OANDA:EUR_USD","p":"1.0850","t":1},
            {"s":"OANDA:GBP_USD","p":"1.2500","t":2}
        ]}"#;

        let ticks = match decode_message(raw).unwrap() {
            FeedMessage::Trades(ticks) => ticks,
            other => panic!("expected trades, got {other:?}"),
        };

        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1].symbol, "OANDA:GBP_USD");
    }

    #[test]
    fn test_decode_ping() {
        assert!(matches!(
            decode_message(r#"{"type":"ping"}"#).unwrap(),
            FeedMessage::Ping
        ));
    }

    #[test]
    fn test_decode_unknown_type_is_ignored() {
        assert!(matches!(
            decode_message(r#"{"type":"news","headline":"x"}"#).unwrap(),
            FeedMessage::Other
        ));
    }

    #[test]
    fn test_decode_malformed_json_fails() {
        assert!(matches!(
            decode_message("not json"),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_bad_price_fails() {
        let raw = r#"{"type":"trade","data":[{"s":"OANDA:EUR_USD","p":"??","t":1}]}"#;

        match decode_message(raw) {
            Err(DecodeError::Price { symbol, price }) => {
                assert_eq!(symbol, "OANDA:EUR_USD");
                assert_eq!(price, "??");
            }
            other => panic!("expected price error, got {other:?}"),
        }
    }

    #[test]
    fn test_feed_command_wire_format() {
        let json = serde_json::to_string(&FeedCommand::Subscribe {
            symbol: "OANDA:EUR_USD".to_string(),
        })
        .unwrap();

        assert_eq!(json, r#"{"type":"subscribe","symbol":"OANDA:EUR_USD"}"#);
    }
}
