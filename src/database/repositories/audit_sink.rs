use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::database::connection::{DatabaseError, PgPool};
use crate::database::models::NewSubscriptionAudit;
use crate::database::schema::subscription_audits;

/// What happened to a subscription, as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Subscribe,
    Unsubscribe,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Subscribe => "SUBSCRIBE",
            AuditAction::Unsubscribe => "UNSUBSCRIBE",
        }
    }
}

/// Collaborator that records subscribe/unsubscribe events. Callers treat it
/// as fire-and-forget: a failed write is logged by the caller and nothing
/// else happens.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        user_id: &str,
        symbol: &str,
        action: AuditAction,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
}

/// PostgreSQL-backed implementation.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(
        &self,
        user_id: &str,
        symbol: &str,
        action: AuditAction,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let row = NewSubscriptionAudit {
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            action: action.as_str().to_string(),
            at,
        };
        let pool = self.pool.clone();

        // Diesel blocks; keep it off the async worker threads.
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| DatabaseError::Pool(e.to_string()))?;
            diesel::insert_into(subscription_audits::table)
                .values(&row)
                .execute(&mut conn)?;
            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Pool(format!("audit task failed: {e}")))?
    }
}
