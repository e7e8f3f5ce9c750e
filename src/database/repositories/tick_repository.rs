use diesel::prelude::*;

use crate::database::connection::{DatabaseError, PgPool};
use crate::database::models::{NewPriceTick, PriceTickRecord};
use crate::database::schema::price_ticks;
use crate::models::PriceTick;

/// Durable tick store consumed by the batch persister and the recent-ticks
/// query. Methods block on I/O; callers run them off the async hot path
/// (`spawn_blocking`).
pub trait TickRepository: Send + Sync {
    /// Write the whole batch as one bulk insert. Returns the row count.
    fn insert_batch(&self, ticks: &[PriceTick]) -> Result<usize, DatabaseError>;

    /// Most recent ticks for a symbol, newest first by event time.
    fn recent_ticks(&self, symbol: &str, limit: i64) -> Result<Vec<PriceTick>, DatabaseError>;
}

/// PostgreSQL-backed implementation.
pub struct PgTickRepository {
    pool: PgPool,
}

impl PgTickRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<crate::database::connection::PgPooledConnection, DatabaseError> {
        self.pool.get().map_err(|e| DatabaseError::Pool(e.to_string()))
    }
}

impl TickRepository for PgTickRepository {
    fn insert_batch(&self, ticks: &[PriceTick]) -> Result<usize, DatabaseError> {
        if ticks.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let rows: Vec<NewPriceTick> = ticks.iter().map(NewPriceTick::from).collect();

        let inserted = diesel::insert_into(price_ticks::table)
            .values(&rows)
            .execute(&mut conn)?;

        tracing::debug!(inserted, "batch inserted ticks");
        Ok(inserted)
    }

    fn recent_ticks(&self, symbol: &str, limit: i64) -> Result<Vec<PriceTick>, DatabaseError> {
        let mut conn = self.conn()?;

        let rows = price_ticks::table
            .filter(price_ticks::symbol.eq(symbol))
            .order(price_ticks::event_time_ms.desc())
            .limit(limit)
            .select(PriceTickRecord::as_select())
            .load::<PriceTickRecord>(&mut conn)?;

        Ok(rows.into_iter().map(PriceTick::from).collect())
    }
}
