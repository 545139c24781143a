use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SqlChainError;
use crate::executor::Executor;
use crate::pool::DatabasePool;

/// Backend selected by a configuration file or command-line flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Sqlite,
    Postgres,
}

fn default_max_size() -> u32 {
    8
}

fn default_connection_timeout_secs() -> u64 {
    30
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

/// Pool settings.
///
/// `target` is a file path for SQLite and a connection string
/// (`host=... user=... dbname=...` or `postgres://...`) for PostgreSQL.
/// Every SQLite connection opened on `:memory:` gets its own private database, so use a file
/// path whenever more than one connection is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOptions {
    pub db_type: DatabaseType,
    pub target: String,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    /// SQLite only: `PRAGMA foreign_keys = ON` on every new connection.
    #[serde(default = "default_true")]
    pub foreign_keys: bool,
    /// SQLite only: how long a statement waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl PoolOptions {
    fn with_defaults(db_type: DatabaseType, target: String) -> Self {
        Self {
            db_type,
            target,
            max_size: default_max_size(),
            connection_timeout_secs: default_connection_timeout_secs(),
            foreign_keys: true,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> PoolOptionsBuilder {
        PoolOptionsBuilder {
            opts: Self::with_defaults(DatabaseType::Sqlite, path.into()),
        }
    }

    #[must_use]
    pub fn postgres(connection_string: impl Into<String>) -> PoolOptionsBuilder {
        PoolOptionsBuilder {
            opts: Self::with_defaults(DatabaseType::Postgres, connection_string.into()),
        }
    }

    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// # Errors
    /// Returns `SqlChainError::ConfigError` for an empty target, a zero pool size or a zero
    /// checkout timeout.
    pub fn validate(&self) -> Result<(), SqlChainError> {
        if self.target.trim().is_empty() {
            return Err(SqlChainError::ConfigError(
                "target (path or connection string) is required".to_string(),
            ));
        }
        if self.max_size == 0 {
            return Err(SqlChainError::ConfigError(
                "max_size must be at least 1".to_string(),
            ));
        }
        if self.connection_timeout_secs == 0 {
            return Err(SqlChainError::ConfigError(
                "connection_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`PoolOptions`].
#[derive(Debug, Clone)]
pub struct PoolOptionsBuilder {
    opts: PoolOptions,
}

impl PoolOptionsBuilder {
    #[must_use]
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.opts.max_size = max_size;
        self
    }

    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.opts.connection_timeout_secs = timeout.as_secs();
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn finish(self) -> PoolOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` from these options.
    ///
    /// # Errors
    /// See [`ConfigAndPool::new`].
    pub async fn build(self) -> Result<ConfigAndPool, SqlChainError> {
        ConfigAndPool::new(self.finish()).await
    }
}

/// A ready pool plus the options it was built from.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct ConfigAndPool {
    pub pool: DatabasePool,
    pub db_type: DatabaseType,
    pub options: PoolOptions,
}

impl ConfigAndPool {
    /// Validate `options` and open a pool for the selected backend.
    ///
    /// # Errors
    /// - `ConfigError` for invalid options or a backend this build was compiled without.
    /// - `ConnectionError` if the pool cannot open its first connection.
    pub async fn new(options: PoolOptions) -> Result<Self, SqlChainError> {
        options.validate()?;
        let pool = match options.db_type {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                DatabasePool::Sqlite(crate::sqlite::SqlitePool::open(&options).await?)
            }
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => {
                DatabasePool::Postgres(crate::postgres::PostgresPool::open(&options).await?)
            }
            #[allow(unreachable_patterns)]
            other => {
                return Err(SqlChainError::ConfigError(format!(
                    "backend {other:?} is not enabled in this build"
                )));
            }
        };
        info!(db_type = ?options.db_type, max_size = options.max_size, "pool ready");
        Ok(Self {
            pool,
            db_type: options.db_type,
            options,
        })
    }

    /// Parse options from JSON and build the pool.
    ///
    /// # Errors
    /// `ConfigError` if the JSON does not describe valid [`PoolOptions`]; otherwise as
    /// [`ConfigAndPool::new`].
    pub async fn from_json(json: &str) -> Result<Self, SqlChainError> {
        let options: PoolOptions = serde_json::from_str(json)
            .map_err(|e| SqlChainError::ConfigError(format!("invalid pool options: {e}")))?;
        Self::new(options).await
    }

    /// A fresh executor sharing this pool.
    #[must_use]
    pub fn executor(&self) -> Executor<DatabasePool> {
        Executor::new(self.pool.clone())
    }
}
