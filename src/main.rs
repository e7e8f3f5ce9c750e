use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forex_notification_api::database::repositories::{
    AuditSink, PgAuditSink, PgSymbolRepository, PgTickRepository, SymbolRepository, TickRepository,
};
use forex_notification_api::database::{establish_pool, DatabaseError};
use forex_notification_api::{
    create_router, BatchPersister, BroadcastScheduler, Broadcaster, Config, FeedConnector,
    PriceTick, SubscriptionRegistry, TickCache,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forex_notification_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let cache = Arc::new(TickCache::new());
    let broadcaster = Broadcaster::new();

    // Database is optional; without it the service runs cache-only.
    let database = initialize_database(&config);

    let registry = Arc::new(match &database {
        Some(db) => SubscriptionRegistry::with_audit(Arc::clone(&db.audit_sink)),
        None => SubscriptionRegistry::new(),
    });

    let store: Arc<dyn TickRepository> = match &database {
        Some(db) => Arc::clone(&db.tick_repository),
        None => Arc::new(DiscardingTickStore),
    };
    let persister = Arc::new(BatchPersister::new(store, config.batch_size));

    let initial_symbols = initial_symbols(&config, database.as_ref()).await;
    tracing::info!(count = initial_symbols.len(), "resolved startup symbol list");

    let cancel = CancellationToken::new();

    // Feed connector: upstream ingestion into cache + persister
    let connector = FeedConnector::new(
        config.feed_url.clone(),
        initial_symbols,
        Arc::clone(&cache),
        Arc::clone(&persister),
    )
    .with_timing(
        Duration::from_millis(config.reconnect_backoff_ms),
        Duration::from_millis(config.subscribe_delay_ms),
    );
    let feed_cancel = cancel.clone();
    let feed_handle = tokio::spawn(async move { connector.run(feed_cancel).await });

    // Broadcast scheduler: cache snapshots to subscribed clients
    let scheduler = BroadcastScheduler::new(
        Arc::clone(&cache),
        Arc::clone(&registry),
        broadcaster.clone(),
    )
    .with_period(Duration::from_millis(config.broadcast_interval_ms));
    let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

    let app = create_router(
        Arc::clone(&cache),
        broadcaster,
        registry,
        database.as_ref().map(|db| Arc::clone(&db.tick_repository)),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind server address");

    tracing::info!("🚀 Forex notification API running on http://{}", config.bind_addr);
    tracing::info!("📚 Swagger UI: http://{}/swagger-ui", config.bind_addr);
    tracing::info!("🔌 WebSocket: ws://{}/ws", config.bind_addr);
    tracing::info!(r#"   Subscribe: {{"action":"subscribe","symbol":"OANDA:EUR_USD"}}"#);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Stop the pipeline, then flush the sub-threshold remainder so it is not
    // silently lost on shutdown.
    cancel.cancel();
    let _ = feed_handle.await;
    let _ = scheduler_handle.await;
    persister.flush_pending().await;

    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("shutdown signal received");
}

struct DatabaseHandles {
    tick_repository: Arc<dyn TickRepository>,
    symbol_repository: Arc<dyn SymbolRepository>,
    audit_sink: Arc<dyn AuditSink>,
}

/// Initialize the connection pool and repositories (only if DATABASE_URL is
/// set). A connection failure degrades to cache-only operation rather than
/// aborting startup.
fn initialize_database(config: &Config) -> Option<DatabaseHandles> {
    let url = config.database_url.as_ref()?;

    match establish_pool(url, config.db_pool_size) {
        Ok(pool) => {
            tracing::info!("✅ database connected");
            Some(DatabaseHandles {
                tick_repository: Arc::new(PgTickRepository::new(pool.clone())),
                symbol_repository: Arc::new(PgSymbolRepository::new(pool.clone())),
                audit_sink: Arc::new(PgAuditSink::new(pool)),
            })
        }
        Err(e) => {
            tracing::error!("failed to connect to database: {e}");
            tracing::warn!("⚠️  continuing without persistence or audit trail");
            None
        }
    }
}

/// Startup subscription list: active symbols from the catalog when a
/// database is configured, the FEED_SYMBOLS env list otherwise.
async fn initial_symbols(config: &Config, database: Option<&DatabaseHandles>) -> Vec<String> {
    if let Some(db) = database {
        let repository = Arc::clone(&db.symbol_repository);
        match tokio::task::spawn_blocking(move || repository.active_symbols()).await {
            Ok(Ok(symbols)) if !symbols.is_empty() => {
                tracing::info!(count = symbols.len(), "loaded active symbols from database");
                return symbols;
            }
            Ok(Ok(_)) => tracing::warn!("no active symbols in database, using FEED_SYMBOLS"),
            Ok(Err(e)) => tracing::warn!("failed to load symbols from database: {e}"),
            Err(e) => tracing::warn!("symbol load task failed: {e}"),
        }
    }

    config.feed_symbols.clone()
}

/// Stand-in tick store when no database is configured: batches are accepted
/// and discarded.
struct DiscardingTickStore;

impl TickRepository for DiscardingTickStore {
    fn insert_batch(&self, ticks: &[PriceTick]) -> Result<usize, DatabaseError> {
        tracing::debug!(count = ticks.len(), "no database configured, discarding batch");
        Ok(ticks.len())
    }

    fn recent_ticks(&self, _symbol: &str, _limit: i64) -> Result<Vec<PriceTick>, DatabaseError> {
        Ok(Vec::new())
    }
}
