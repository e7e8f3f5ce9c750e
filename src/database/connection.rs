use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use thiserror::Error;

/// Type alias for the PostgreSQL connection pool
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Type alias for a pooled connection
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("diesel error: {0}")]
    Diesel(#[from] diesel::result::Error),
}

/// Build a connection pool and verify one connection can be checked out.
pub fn establish_pool(database_url: &str, pool_size: u32) -> Result<PgPool, DatabaseError> {
    tracing::info!(pool_size, "establishing database connection pool");

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(pool_size)
        .build(manager)
        .map_err(|e| DatabaseError::Pool(e.to_string()))?;

    let _ = pool.get().map_err(|e| DatabaseError::Pool(e.to_string()))?;
    tracing::info!("database connection successful");

    Ok(pool)
}
