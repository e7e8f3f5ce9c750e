use diesel::prelude::*;

use crate::database::connection::{DatabaseError, PgPool};
use crate::database::models::ForexSymbol;
use crate::database::schema::forex_symbols;

/// Instrument catalog lookups.
pub trait SymbolRepository: Send + Sync {
    /// Symbols flagged active, i.e. the startup subscription list.
    fn active_symbols(&self) -> Result<Vec<String>, DatabaseError>;
}

/// PostgreSQL-backed implementation.
pub struct PgSymbolRepository {
    pool: PgPool,
}

impl PgSymbolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SymbolRepository for PgSymbolRepository {
    fn active_symbols(&self) -> Result<Vec<String>, DatabaseError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        let rows = forex_symbols::table
            .filter(forex_symbols::is_active.eq(true))
            .select(ForexSymbol::as_select())
            .load::<ForexSymbol>(&mut conn)?;

        Ok(rows.into_iter().map(|row| row.symbol).collect())
    }
}
