use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::stores::{IsolationLevel, StoreError, TransactionOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl From<ConfigError> for StoreError {
    fn from(error: ConfigError) -> Self {
        StoreError::Initialization(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgres,
    Memory,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "memory" => Ok(BackendKind::Memory),
            _ => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub min_idle: u32,
    pub run_migrations: bool,
    pub transaction: TransactionOptions,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which returns `None` for unset names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => BackendKind::Postgres,
        };
        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        if backend == BackendKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let isolation_level = match lookup("TX_ISOLATION_LEVEL") {
            Some(value) => Some(value.parse::<IsolationLevel>().map_err(|_| ConfigError::Invalid {
                name: "TX_ISOLATION_LEVEL",
                value,
            })?),
            None => None,
        };

        let config = Self {
            backend,
            database_url,
            pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", 10)?,
            min_idle: parse_or(&lookup, "DATABASE_MIN_IDLE", 1)?,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
            transaction: TransactionOptions {
                max_wait: Duration::from_millis(parse_or(&lookup, "TX_MAX_WAIT_MS", 2000)?),
                timeout: Duration::from_millis(parse_or(&lookup, "TX_TIMEOUT_MS", 5000)?),
                isolation_level,
            },
            port: parse_or(&lookup, "PORT", 3000)?,
        };

        if config.pool_size == 0 {
            return Err(ConfigError::Invalid {
                name: "DATABASE_POOL_SIZE",
                value: "0".to_string(),
            });
        }
        Ok(config)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/ingest")])).unwrap();
        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.min_idle, 1);
        assert!(config.run_migrations);
        assert_eq!(config.transaction, TransactionOptions::default());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
        let config = AppConfig::from_lookup(lookup(&[("STORE_BACKEND", "memory")])).unwrap();
        assert_eq!(config.backend, BackendKind::Memory);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("TX_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TX_TIMEOUT_MS", .. }));

        let err = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("TX_ISOLATION_LEVEL", "Snapshot"),
        ]))
        .unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Initialization(_)));

        assert!(AppConfig::from_lookup(lookup(&[("STORE_BACKEND", "sqlite")])).is_err());
    }

    #[test]
    fn test_transaction_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("TX_MAX_WAIT_MS", "250"),
            ("TX_TIMEOUT_MS", "10000"),
            ("TX_ISOLATION_LEVEL", "Serializable"),
        ]))
        .unwrap();
        assert_eq!(config.transaction.max_wait, Duration::from_millis(250));
        assert_eq!(config.transaction.timeout, Duration::from_secs(10));
        assert_eq!(
            config.transaction.isolation_level,
            Some(IsolationLevel::Serializable)
        );
    }
}
