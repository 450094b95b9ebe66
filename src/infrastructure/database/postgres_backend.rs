use async_trait::async_trait;
use diesel::prelude::*;
use std::any::Any;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::stores::{
    Backend, IsolationLevel, StoreError, StoreResult, TransactionOptions, UnitOfWork,
};
use crate::infrastructure::database::connection::{
    DatabaseError, DbPool, PoolSettings, create_connection_pool, get_connection_from_pool,
    run_migrations,
};
use crate::infrastructure::database::session::PgSession;

const PING_WAIT: Duration = Duration::from_secs(2);

/// Postgres through an r2d2 pool. Every transaction runs on a blocking
/// thread with its own pooled connection.
pub struct PostgresBackend {
    pool: DbPool,
}

impl PostgresBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn connect(settings: &PoolSettings, migrate: bool) -> Result<Self, DatabaseError> {
        let pool = create_connection_pool(settings)?;
        if migrate {
            let mut conn = get_connection_from_pool(&pool, settings.connection_timeout)?;
            run_migrations(&mut conn)?;
        }
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn transaction(
        &self,
        options: TransactionOptions,
        work: UnitOfWork,
    ) -> StoreResult<Box<dyn Any + Send>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || run_transaction(&pool, options, work))
            .await
            .map_err(|e| StoreError::Unknown(format!("transaction task failed: {}", e)))?
    }

    async fn ping(&self) -> StoreResult<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let mut conn = get_connection_from_pool(&pool, PING_WAIT)?;
            diesel::sql_query("SELECT 1").execute(&mut conn)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unknown(format!("ping task failed: {}", e)))?
    }

    fn supports_raw_sql(&self) -> bool {
        true
    }
}

fn run_transaction(
    pool: &DbPool,
    options: TransactionOptions,
    work: UnitOfWork,
) -> StoreResult<Box<dyn Any + Send>> {
    let started = Instant::now();
    let mut conn = pool.get_timeout(options.max_wait).map_err(|e| {
        warn!("No connection available within {:?}: {}", options.max_wait, e);
        StoreError::Transaction(format!(
            "could not acquire a connection within {:?}",
            options.max_wait
        ))
    })?;

    let builder = conn.build_transaction();
    let mut builder = match options.isolation_level {
        // Postgres runs READ UNCOMMITTED as READ COMMITTED.
        Some(IsolationLevel::ReadUncommitted) | Some(IsolationLevel::ReadCommitted) => {
            builder.read_committed()
        }
        Some(IsolationLevel::RepeatableRead) => builder.repeatable_read(),
        Some(IsolationLevel::Serializable) => builder.serializable(),
        None => builder,
    };

    let result = builder.run(|conn| {
        let timeout_ms = options.timeout.as_millis().max(1);
        diesel::sql_query(format!("SET LOCAL statement_timeout = {}", timeout_ms)).execute(conn)?;
        let mut session = PgSession::new(conn, started, options.timeout);
        let value = work(&mut session)?;
        session.check_deadline()?;
        Ok::<_, StoreError>(value)
    });

    if let Err(err) = &result {
        debug!("Transaction rolled back after {:?}: {}", started.elapsed(), err);
    }
    result
}
