use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Symbols currently present in the tick cache
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SymbolsResponse {
    pub count: usize,
    pub symbols: Vec<String>,
}

/// Service health summary
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Symbols with a cached price.
    pub symbols_cached: usize,
    /// Websocket clients currently connected.
    pub connections: usize,
    pub timestamp: DateTime<Utc>,
}
