pub mod connection;
pub mod error;
pub mod models;
pub mod postgres_backend;
pub mod schema;
pub mod session;
pub mod sql;

pub use connection::{DatabaseError, DbPool, PoolSettings, create_connection_pool, run_migrations};
pub use postgres_backend::PostgresBackend;
