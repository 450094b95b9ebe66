use diesel::{
    Connection, PgConnection,
    r2d2::{self, ConnectionManager},
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::stores::StoreError;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Pool error: {0}")]
    PoolError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) | DatabaseError::PoolError(msg) => {
                StoreError::Connection(msg)
            }
            DatabaseError::ConfigurationError(msg) | DatabaseError::MigrationError(msg) => {
                StoreError::Initialization(msg)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub database_url: String,
    pub max_size: u32,
    pub min_idle: u32,
    pub connection_timeout: Duration,
}

impl PoolSettings {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            min_idle: 1,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

pub fn create_connection_pool(settings: &PoolSettings) -> Result<DbPool, DatabaseError> {
    if settings.database_url.is_empty() {
        return Err(DatabaseError::ConfigurationError(
            "DATABASE_URL not set".to_string(),
        ));
    }
    if settings.min_idle > settings.max_size {
        return Err(DatabaseError::ConfigurationError(format!(
            "min idle connections ({}) exceeds pool size ({})",
            settings.min_idle, settings.max_size
        )));
    }

    let manager = ConnectionManager::<PgConnection>::new(settings.database_url.clone());

    let pool = r2d2::Pool::builder()
        .max_size(settings.max_size)
        .min_idle(Some(settings.min_idle))
        .connection_timeout(settings.connection_timeout)
        .build(manager)
        .map_err(|e| DatabaseError::PoolError(e.to_string()))?;

    info!(
        "Database pool ready (max_size={}, min_idle={})",
        settings.max_size, settings.min_idle
    );
    Ok(pool)
}

/// A single connection outside the pool, used by the migration step.
pub fn get_database_connection(database_url: &str) -> Result<PgConnection, DatabaseError> {
    PgConnection::establish(database_url).map_err(|e| DatabaseError::ConnectionError(e.to_string()))
}

pub fn get_connection_from_pool(
    pool: &DbPool,
    max_wait: Duration,
) -> Result<DbConnection, DatabaseError> {
    pool.get_timeout(max_wait)
        .map_err(|e| DatabaseError::PoolError(e.to_string()))
}

pub fn run_migrations(conn: &mut PgConnection) -> Result<(), DatabaseError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_rejects_missing_url() {
        let err = create_connection_pool(&PoolSettings::new("")).unwrap_err();
        assert!(matches!(err, DatabaseError::ConfigurationError(_)));
        assert!(matches!(StoreError::from(err), StoreError::Initialization(_)));
    }

    #[test]
    fn test_pool_rejects_min_idle_above_size() {
        let mut settings = PoolSettings::new("postgres://localhost/ingest");
        settings.max_size = 2;
        settings.min_idle = 3;
        assert!(matches!(
            create_connection_pool(&settings),
            Err(DatabaseError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_pool_errors_map_to_connection() {
        let err = StoreError::from(DatabaseError::PoolError("timed out".to_string()));
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
