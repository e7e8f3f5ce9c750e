use utoipa::OpenApi;

use super::handlers;
use super::responses::{ErrorResponse, HealthResponse, SymbolsResponse};
use crate::models::PriceTick;

/// OpenAPI documentation for the read-side endpoints.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Forex Notification API",
        description = "Live forex price cache, persistence and subscriber fan-out",
        version = "0.1.0"
    ),
    paths(
        handlers::health_check,
        handlers::get_current_price,
        handlers::get_available_symbols,
        handlers::get_recent_ticks,
    ),
    components(schemas(PriceTick, ErrorResponse, SymbolsResponse, HealthResponse)),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Forex", description = "Price queries")
    )
)]
pub struct ApiDoc;
