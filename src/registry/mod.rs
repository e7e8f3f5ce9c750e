use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::database::repositories::{AuditAction, AuditSink};

/// Identifier for one client connection.
pub type ConnectionId = Uuid;

#[derive(Default)]
struct Memberships {
    by_symbol: HashMap<String, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, HashSet<String>>,
}

/// Bidirectional membership mapping between connections and instrument
/// groups.
///
/// Both directions are updated under a single lock, so a symbol appears in
/// the forward map exactly when some connection holds the matching reverse
/// entry, and `members_of` is linearizable with every mutation.
///
/// Joins and leaves are reported fire-and-forget to the audit sink; an audit
/// failure is logged and never blocks or fails the registry operation.
pub struct SubscriptionRegistry {
    memberships: RwLock<Memberships>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            memberships: RwLock::new(Memberships::default()),
            audit: None,
        }
    }

    pub fn with_audit(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            memberships: RwLock::new(Memberships::default()),
            audit: Some(audit),
        }
    }

    /// Add the connection to the symbol's group. Idempotent; returns whether
    /// the membership is new.
    pub fn join(&self, connection: ConnectionId, user_id: &str, symbol: &str) -> bool {
        let added = {
            let mut memberships = self.memberships.write();
            let added = memberships
                .by_symbol
                .entry(symbol.to_string())
                .or_default()
                .insert(connection);
            memberships
                .by_connection
                .entry(connection)
                .or_default()
                .insert(symbol.to_string());
            added
        };

        tracing::info!(%connection, user_id, symbol, "subscribed");
        self.report(user_id, symbol, AuditAction::Subscribe);
        added
    }

    /// Remove the connection from the symbol's group. Idempotent; a second
    /// leave is a no-op.
    pub fn leave(&self, connection: ConnectionId, user_id: &str, symbol: &str) -> bool {
        let removed = {
            let mut memberships = self.memberships.write();
            let removed = memberships
                .by_symbol
                .get_mut(symbol)
                .map(|members| members.remove(&connection))
                .unwrap_or(false);
            if memberships
                .by_symbol
                .get(symbol)
                .is_some_and(HashSet::is_empty)
            {
                memberships.by_symbol.remove(symbol);
            }
            if let Some(symbols) = memberships.by_connection.get_mut(&connection) {
                symbols.remove(symbol);
                if symbols.is_empty() {
                    memberships.by_connection.remove(&connection);
                }
            }
            removed
        };

        tracing::info!(%connection, user_id, symbol, "unsubscribed");
        self.report(user_id, symbol, AuditAction::Unsubscribe);
        removed
    }

    /// Current members of the symbol's group, for fan-out.
    pub fn members_of(&self, symbol: &str) -> Vec<ConnectionId> {
        self.memberships
            .read()
            .by_symbol
            .get(symbol)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove every membership the connection holds, in time proportional to
    /// its subscription count. Returns the symbols it was subscribed to.
    /// Cleanup on disconnect is not audited; only explicit joins and leaves
    /// are.
    pub fn drop_connection(&self, connection: ConnectionId) -> Vec<String> {
        let mut memberships = self.memberships.write();

        let symbols: Vec<String> = memberships
            .by_connection
            .remove(&connection)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();

        for symbol in &symbols {
            if let Some(members) = memberships.by_symbol.get_mut(symbol) {
                members.remove(&connection);
                if members.is_empty() {
                    memberships.by_symbol.remove(symbol);
                }
            }
        }

        symbols
    }

    /// Number of symbols the connection is subscribed to.
    pub fn subscription_count(&self, connection: &ConnectionId) -> usize {
        self.memberships
            .read()
            .by_connection
            .get(connection)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Symbols that currently have at least one member.
    pub fn subscribed_symbols(&self) -> Vec<String> {
        self.memberships.read().by_symbol.keys().cloned().collect()
    }

    fn report(&self, user_id: &str, symbol: &str, action: AuditAction) {
        let Some(sink) = &self.audit else { return };

        let sink = Arc::clone(sink);
        let user_id = user_id.to_string();
        let symbol = symbol.to_string();
        tokio::spawn(async move {
            if let Err(e) = sink.record(&user_id, &symbol, action, Utc::now()).await {
                tracing::warn!(%user_id, %symbol, "audit write failed: {e}");
            }
        });
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
