use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// One row of the subscribe/unsubscribe audit trail.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::database::schema::subscription_audits)]
pub struct NewSubscriptionAudit {
    pub user_id: String,
    pub symbol: String,
    pub action: String,
    pub at: DateTime<Utc>,
}
