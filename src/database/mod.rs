pub mod batch_persister;
pub mod connection;
pub mod models;
pub mod repositories;
pub mod schema;

pub use batch_persister::{BatchPersister, PersisterStats};
pub use connection::{establish_pool, DatabaseError, PgPool, PgPooledConnection};
