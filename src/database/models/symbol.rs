use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Instrument catalog entry. Rows with `is_active` set drive the startup
/// subscription list.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::database::schema::forex_symbols)]
#[diesel(primary_key(id))]
pub struct ForexSymbol {
    pub id: i64,
    pub symbol: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}
