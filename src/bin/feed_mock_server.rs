//! Mock upstream feed for local testing.
//!
//! Speaks the upstream wire protocol: accepts subscribe/unsubscribe control
//! messages and pushes `trade` envelopes with random-walk prices for every
//! subscribed symbol, plus the occasional `ping`. Point the main server at it
//! with `FEED_URL=ws://127.0.0.1:8181`.

use std::collections::HashMap;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use tokio::time::{interval, Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_mock_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("FEED_MOCK_ADDR").unwrap_or_else(|_| "127.0.0.1:8181".to_string());
    let app = Router::new().route("/", get(upgrade));

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    println!("🎭 Mock feed server ready!");
    println!("🔌 WebSocket: ws://{addr}");
    println!(r#"   Send: {{"type":"subscribe","symbol":"OANDA:EUR_USD"}}"#);
    println!("   Trades stream every 200 ms per subscribed symbol\n");

    axum::serve(listener, app).await.unwrap();
}

async fn upgrade(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(handle_feed_client)
}

async fn handle_feed_client(mut socket: WebSocket) {
    tracing::info!("feed client connected");

    let mut prices: HashMap<String, f64> = HashMap::new();
    let mut trade_timer = interval(Duration::from_millis(200));
    let mut ping_timer = interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_control(&text, &mut prices),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("feed client error: {e}");
                        break;
                    }
                }
            }

            _ = trade_timer.tick() => {
                if prices.is_empty() {
                    continue;
                }
                let envelope = next_trades(&mut prices);
                if socket.send(Message::Text(envelope)).await.is_err() {
                    break;
                }
            }

            _ = ping_timer.tick() => {
                let ping = json!({"type": "ping"}).to_string();
                if socket.send(Message::Text(ping)).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("feed client disconnected");
}

fn handle_control(text: &str, prices: &mut HashMap<String, f64>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        tracing::warn!("ignoring malformed control message: {text}");
        return;
    };

    let kind = value["type"].as_str().unwrap_or_default();
    let Some(symbol) = value["symbol"].as_str() else {
        return;
    };

    match kind {
        "subscribe" => {
            prices.entry(symbol.to_string()).or_insert_with(seed_price);
            tracing::info!(symbol, "subscribed");
        }
        "unsubscribe" => {
            prices.remove(symbol);
            tracing::info!(symbol, "unsubscribed");
        }
        _ => {}
    }
}

/// One trade envelope carrying a random-walk step for every symbol.
fn next_trades(prices: &mut HashMap<String, f64>) -> String {
    let now_ms = Utc::now().timestamp_millis();
    let mut rng = rand::rng();

    let data: Vec<serde_json::Value> = prices
        .iter_mut()
        .map(|(symbol, price)| {
            *price *= 1.0 + rng.random_range(-0.0005..0.0005);
            json!({
                "s": symbol,
                "p": format!("{price:.5}"),
                "t": now_ms,
            })
        })
        .collect();

    json!({"type": "trade", "data": data}).to_string()
}

fn seed_price() -> f64 {
    rand::rng().random_range(0.8..1.6)
}
