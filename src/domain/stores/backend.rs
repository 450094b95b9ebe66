use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::stores::{Connection, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl FromStr for IsolationLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ReadUncommitted" => Ok(IsolationLevel::ReadUncommitted),
            "ReadCommitted" => Ok(IsolationLevel::ReadCommitted),
            "RepeatableRead" => Ok(IsolationLevel::RepeatableRead),
            "Serializable" => Ok(IsolationLevel::Serializable),
            _ => Err(StoreError::validation(format!(
                "Invalid isolation level: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// How long to wait for a connection / transaction slot.
    pub max_wait: Duration,
    /// Longest the unit of work may run before it is rolled back.
    pub timeout: Duration,
    /// `None` keeps the backend's default.
    pub isolation_level: Option<IsolationLevel>,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_millis(2000),
            timeout: Duration::from_millis(5000),
            isolation_level: None,
        }
    }
}

/// Work run against a connection inside one transaction. The boxed result is
/// handed back to the caller, which downcasts it to the concrete type.
pub type UnitOfWork =
    Box<dyn FnOnce(&mut dyn Connection) -> StoreResult<Box<dyn Any + Send>> + Send>;

#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Commits when `work` returns `Ok`, rolls back otherwise.
    async fn transaction(
        &self,
        options: TransactionOptions,
        work: UnitOfWork,
    ) -> StoreResult<Box<dyn Any + Send>>;

    async fn ping(&self) -> StoreResult<()>;

    /// Whether `execute_raw` can run SQL.
    fn supports_raw_sql(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_from_str() {
        assert_eq!(
            "Serializable".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
        assert!("serializable".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_default_options() {
        let options = TransactionOptions::default();
        assert_eq!(options.max_wait, Duration::from_secs(2));
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.isolation_level.is_none());
    }
}
