pub mod audit_sink;
pub mod symbol_repository;
pub mod tick_repository;

pub use audit_sink::{AuditAction, AuditSink, PgAuditSink};
pub use symbol_repository::{PgSymbolRepository, SymbolRepository};
pub use tick_repository::{PgTickRepository, TickRepository};
