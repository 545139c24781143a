//! `SQLite` backend: a bb8 pool of `rusqlite` connections whose statements run on
//! `spawn_blocking` workers.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};

use crate::config::PoolOptions;
use crate::error::{DriverError, SqlChainError};
use crate::pool::{ConnectionPool, PooledHandle};
use crate::results::{RawMutation, RowSet};
use crate::types::RowValues;

mod manager;
pub mod params;
mod query;

pub use manager::{SharedSqliteConnection, SqliteManager};

pub(crate) async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, DriverError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, DriverError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| DriverError::Worker(format!("sqlite spawn_blocking join error: {e}")))?
}

/// Cloneable `SQLite` pool.
#[derive(Clone)]
pub struct SqlitePool {
    pool: Pool<SqliteManager>,
}

impl SqlitePool {
    /// Build the pool and smoke-test one connection.
    ///
    /// # Errors
    /// Returns `SqlChainError::ConnectionError` if the pool cannot be created or the database
    /// file cannot be opened.
    pub async fn open(options: &PoolOptions) -> Result<Self, SqlChainError> {
        let manager = SqliteManager::new(options.target.clone())
            .foreign_keys(options.foreign_keys)
            .busy_timeout(options.busy_timeout());
        let pool = Pool::builder()
            .max_size(options.max_size)
            .connection_timeout(options.connection_timeout())
            .build(manager)
            .await
            .map_err(|e| SqlChainError::ConnectionError(format!("sqlite pool error: {e}")))?;

        {
            let conn = pool
                .get()
                .await
                .map_err(|e| SqlChainError::ConnectionError(format!("sqlite checkout error: {e}")))?;
            run_blocking(Arc::clone(&*conn), |c| {
                c.execute_batch("PRAGMA journal_mode = WAL;")
                    .map_err(DriverError::from)
            })
            .await
            .map_err(|e| SqlChainError::ConnectionError(format!("sqlite setup error: {e}")))?;
        }

        Ok(Self { pool })
    }

    /// Wrap an existing bb8 pool.
    #[must_use]
    pub fn from_pool(pool: Pool<SqliteManager>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn inner(&self) -> &Pool<SqliteManager> {
        &self.pool
    }
}

impl fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlitePool")
            .field("state", &self.pool.state())
            .finish()
    }
}

#[async_trait]
impl ConnectionPool for SqlitePool {
    type Handle = SqliteHandle;

    async fn acquire(&self) -> Result<Self::Handle, DriverError> {
        let conn = self.pool.get_owned().await?;
        Ok(SqliteHandle { conn })
    }
}

/// A pooled `SQLite` connection.
///
/// Returned to the pool on drop. A connection dropped with an open transaction is reported
/// broken by [`SqliteManager`], so bb8 closes it and `SQLite` discards the uncommitted work.
pub struct SqliteHandle {
    conn: PooledConnection<'static, SqliteManager>,
}

impl SqliteHandle {
    fn shared(&self) -> SharedSqliteConnection {
        Arc::clone(&*self.conn)
    }

    async fn batch(&self, sql: &'static str) -> Result<(), DriverError> {
        run_blocking(self.shared(), move |c| {
            c.execute_batch(sql).map_err(DriverError::from)
        })
        .await
    }
}

impl fmt::Debug for SqliteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteHandle").finish_non_exhaustive()
    }
}

#[async_trait]
impl PooledHandle for SqliteHandle {
    async fn begin(&mut self) -> Result<(), DriverError> {
        self.batch("BEGIN").await
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.batch("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.batch("ROLLBACK").await
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<RowSet, DriverError> {
        let sql = sql.to_owned();
        let values = params::to_sqlite_values(params);
        run_blocking(self.shared(), move |c| query::build_row_set(c, &sql, &values)).await
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RawMutation, DriverError> {
        let sql = sql.to_owned();
        let values = params::to_sqlite_values(params);
        run_blocking(self.shared(), move |c| query::execute_mutation(c, &sql, &values)).await
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError> {
        let sql = sql.to_owned();
        run_blocking(self.shared(), move |c| {
            c.execute_batch(&sql).map_err(DriverError::from)
        })
        .await
    }
}
