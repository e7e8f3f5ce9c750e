// Library Crate Root
// lib.rs

pub mod api;
pub mod config;
pub mod database;
pub mod feed;
pub mod market_data;
pub mod models;
pub mod registry;
pub mod websocket;

// pub use = re-export at crate root
pub use api::create_router;
pub use config::Config;
pub use database::BatchPersister;
pub use feed::FeedConnector;
pub use market_data::{BroadcastScheduler, TickCache};
pub use models::PriceTick;
pub use registry::{ConnectionId, SubscriptionRegistry};
pub use websocket::Broadcaster;
