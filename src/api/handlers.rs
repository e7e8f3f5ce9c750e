use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::database::repositories::TickRepository;
use crate::market_data::TickCache;
use crate::websocket::Broadcaster;

use super::responses::*;

/// Shared state for the read-side endpoints.
#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<TickCache>,
    pub broadcaster: Broadcaster,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SymbolQuery {
    /// Instrument symbol, e.g. "OANDA:EUR_USD".
    pub symbol: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentTicksQuery {
    /// Instrument symbol, e.g. "OANDA:EUR_USD".
    pub symbol: String,
    /// Maximum number of ticks to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        symbols_cached: state.cache.len(),
        connections: state.broadcaster.connection_count(),
        timestamp: Utc::now(),
    })
}

/// Latest cached price for a symbol
#[utoipa::path(
    get,
    path = "/api/v1/forex/current-price",
    tag = "Forex",
    params(SymbolQuery),
    responses(
        (status = 200, description = "Latest tick for the symbol", body = crate::models::PriceTick),
        (status = 404, description = "Symbol not in cache", body = ErrorResponse)
    )
)]
pub async fn get_current_price(
    State(state): State<ApiState>,
    Query(params): Query<SymbolQuery>,
) -> Response {
    match state.cache.get(&params.symbol) {
        Some(tick) => (StatusCode::OK, Json(tick)).into_response(),
        None => {
            tracing::debug!(symbol = %params.symbol, "symbol not found in cache");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "not_found".to_string(),
                    message: format!("symbol {} not found", params.symbol),
                }),
            )
                .into_response()
        }
    }
}

/// Symbols with a cached price
#[utoipa::path(
    get,
    path = "/api/v1/forex/symbols",
    tag = "Forex",
    responses(
        (status = 200, description = "Known symbol set", body = SymbolsResponse)
    )
)]
pub async fn get_available_symbols(State(state): State<ApiState>) -> impl IntoResponse {
    let mut symbols = state.cache.symbols();
    symbols.sort();

    Json(SymbolsResponse {
        count: symbols.len(),
        symbols,
    })
}

/// Recent persisted ticks for a symbol, newest first
#[utoipa::path(
    get,
    path = "/api/v1/forex/recent-ticks",
    tag = "Forex",
    params(RecentTicksQuery),
    responses(
        (status = 200, description = "Recent ticks, most recent first", body = [crate::models::PriceTick]),
        (status = 500, description = "Store query failed", body = ErrorResponse)
    )
)]
pub async fn get_recent_ticks(
    State(repository): State<Arc<dyn TickRepository>>,
    Query(params): Query<RecentTicksQuery>,
) -> Response {
    let symbol = params.symbol;
    let limit = params.limit.clamp(1, 500);

    let repo = Arc::clone(&repository);
    let query_symbol = symbol.clone();
    match tokio::task::spawn_blocking(move || repo.recent_ticks(&query_symbol, limit)).await {
        Ok(Ok(ticks)) => (StatusCode::OK, Json(ticks)).into_response(),
        Ok(Err(e)) => {
            tracing::error!(%symbol, "recent-ticks query failed: {e}");
            store_error_response()
        }
        Err(e) => {
            tracing::error!(%symbol, "recent-ticks task failed: {e}");
            store_error_response()
        }
    }
}

fn store_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "store_error".to_string(),
            message: "failed to query recent ticks".to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceTick;
    use rust_decimal_macros::dec;

    fn state() -> ApiState {
        ApiState {
            cache: Arc::new(TickCache::new()),
            broadcaster: Broadcaster::new(),
        }
    }

    #[tokio::test]
    async fn test_current_price_found() {
        let state = state();
        state
            .cache
            .set(PriceTick::from_trade("OANDA:EUR_USD", dec!(1.0850), 1));

        let response = get_current_price(
            State(state),
            Query(SymbolQuery {
                symbol: "OANDA:EUR_USD".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_current_price_not_found() {
        let response = get_current_price(
            State(state()),
            Query(SymbolQuery {
                symbol: "OANDA:EUR_USD".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recent_ticks_surfaces_store_errors() {
        use crate::database::repositories::tests::FailingTickRepository;

        let repository: Arc<dyn TickRepository> = Arc::new(FailingTickRepository);
        let response = get_recent_ticks(
            State(repository),
            Query(RecentTicksQuery {
                symbol: "OANDA:EUR_USD".to_string(),
                limit: 50,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
