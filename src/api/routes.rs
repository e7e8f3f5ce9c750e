use axum::{routing::get, Router};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::database::repositories::TickRepository;
use crate::market_data::TickCache;
use crate::registry::SubscriptionRegistry;
use crate::websocket::{websocket_handler, Broadcaster, WsState};

use super::handlers::*;
use super::openapi::ApiDoc;

/// Create the API router with Swagger UI and WebSocket support.
///
/// The recent-ticks route is only mounted when a tick store is configured;
/// without a database the read surface is cache-only.
pub fn create_router(
    cache: Arc<TickCache>,
    broadcaster: Broadcaster,
    registry: Arc<SubscriptionRegistry>,
    tick_repository: Option<Arc<dyn TickRepository>>,
) -> Router {
    let ws_state = Arc::new(WsState {
        broadcaster: broadcaster.clone(),
        registry,
    });

    let api_state = ApiState { cache, broadcaster };

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // WebSocket endpoint
        .route("/ws", get(websocket_handler))
        .with_state(ws_state)
        // Read-side endpoints
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/forex/current-price", get(get_current_price))
        .route("/api/v1/forex/symbols", get(get_available_symbols))
        .with_state(api_state);

    if let Some(repository) = tick_repository {
        let history_router = Router::new()
            .route("/api/v1/forex/recent-ticks", get(get_recent_ticks))
            .with_state(repository);

        router.merge(history_router)
    } else {
        router
    }
}
