use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::stores::{Backend, StoreError, StoreResult, TransactionOptions, UnitOfWork};
use crate::infrastructure::memory::Tables;

/// Process-local store. Transactions are serialized behind one async mutex;
/// each runs against a copy of the tables that replaces the original only
/// on commit, so every isolation level behaves as serializable.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn transaction(
        &self,
        options: TransactionOptions,
        work: UnitOfWork,
    ) -> StoreResult<Box<dyn Any + Send>> {
        let mut guard = tokio::time::timeout(options.max_wait, self.tables.lock())
            .await
            .map_err(|_| {
                warn!("No transaction slot within {:?}", options.max_wait);
                StoreError::Transaction(format!(
                    "could not start a transaction within {:?}",
                    options.max_wait
                ))
            })?;

        let started = Instant::now();
        let mut working = guard.clone();
        let value = work(&mut working)?;
        let elapsed = started.elapsed();
        if elapsed > options.timeout {
            debug!("Rolling back a transaction that ran for {:?}", elapsed);
            return Err(StoreError::Transaction(format!(
                "transaction ran for {:?}, longer than its {:?} timeout",
                elapsed, options.timeout
            )));
        }
        *guard = working;
        Ok(value)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn supports_raw_sql(&self) -> bool {
        false
    }
}
