//! PostgreSQL backend built on `tokio-postgres` and bb8.
//!
//! Statements are written with `?` placeholders and rewritten to `$1, $2, ...` just before they
//! are prepared. Postgres reports no last-insert id, so `MutationResult::insert_id` is always
//! `None` here.

use std::fmt;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tokio::runtime::Handle;
use tracing::warn;

use crate::config::PoolOptions;
use crate::error::{DriverError, SqlChainError};
use crate::placeholders::{PlaceholderStyle, rewrite_placeholders};
use crate::pool::{ConnectionPool, PooledHandle};
use crate::results::{RawMutation, RowSet};
use crate::types::RowValues;

mod manager;
mod params;
mod query;

pub use manager::{PgConnection, PgManager, PgTxStatus};

/// Cloneable Postgres pool.
#[derive(Clone)]
pub struct PostgresPool {
    pool: Pool<PgManager>,
}

impl PostgresPool {
    /// # Errors
    /// - `ConfigError` if `options.target` is not a valid connection string.
    /// - `ConnectionError` if the pool cannot be created.
    pub async fn open(options: &PoolOptions) -> Result<Self, SqlChainError> {
        let config: tokio_postgres::Config = options
            .target
            .parse()
            .map_err(|e| SqlChainError::ConfigError(format!("invalid postgres target: {e}")))?;
        let pool = Pool::builder()
            .max_size(options.max_size)
            .connection_timeout(options.connection_timeout())
            .build(PgManager::new(config))
            .await
            .map_err(|e| SqlChainError::ConnectionError(format!("postgres pool error: {e}")))?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: Pool<PgManager>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn inner(&self) -> &Pool<PgManager> {
        &self.pool
    }
}

impl fmt::Debug for PostgresPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresPool")
            .field("state", &self.pool.state())
            .finish()
    }
}

#[async_trait]
impl ConnectionPool for PostgresPool {
    type Handle = PostgresHandle;

    async fn acquire(&self) -> Result<Self::Handle, DriverError> {
        let conn = self.pool.get_owned().await?;
        Ok(PostgresHandle { conn: Some(conn) })
    }
}

/// A pooled Postgres client.
///
/// The transaction status lives on the pooled [`PgConnection`], so a connection given back
/// with an open or aborted transaction is closed by the pool rather than reused.
pub struct PostgresHandle {
    conn: Option<PooledConnection<'static, PgManager>>,
}

impl PostgresHandle {
    fn conn(&mut self) -> Result<&mut PgConnection, DriverError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| DriverError::Other("postgres connection already taken".into()))
    }
}

/// Once a statement fails inside a transaction, Postgres rejects everything up to the end of
/// the block and answers `COMMIT` with a rollback. Remember that so `commit` can say so.
fn settle<T>(
    conn: &mut PgConnection,
    result: Result<T, tokio_postgres::Error>,
) -> Result<T, DriverError> {
    if result.is_err() && conn.tx_status == PgTxStatus::Open {
        conn.tx_status = PgTxStatus::Aborted;
    }
    result.map_err(DriverError::from)
}

impl fmt::Debug for PostgresHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresHandle")
            .field("tx_status", &self.conn.as_ref().map(|c| c.tx_status))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PooledHandle for PostgresHandle {
    async fn begin(&mut self) -> Result<(), DriverError> {
        let conn = self.conn()?;
        conn.client.batch_execute("BEGIN").await?;
        conn.tx_status = PgTxStatus::Open;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        let conn = self.conn()?;
        if conn.tx_status == PgTxStatus::Aborted {
            conn.client.batch_execute("ROLLBACK").await?;
            conn.tx_status = PgTxStatus::Idle;
            return Err(DriverError::Other(
                "transaction was aborted by an earlier failed statement and has been rolled back"
                    .into(),
            ));
        }
        if let Err(e) = conn.client.batch_execute("COMMIT").await {
            conn.tx_status = PgTxStatus::Aborted;
            return Err(e.into());
        }
        conn.tx_status = PgTxStatus::Idle;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        let conn = self.conn()?;
        conn.client.batch_execute("ROLLBACK").await?;
        conn.tx_status = PgTxStatus::Idle;
        Ok(())
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<RowSet, DriverError> {
        let sql = rewrite_placeholders(sql, PlaceholderStyle::Numbered);
        let conn = self.conn()?;
        let result = async {
            let stmt = conn.client.prepare(&sql).await?;
            let rows = conn.client.query(&stmt, &params::as_refs(params)).await?;
            Ok::<_, tokio_postgres::Error>((stmt, rows))
        }
        .await;
        let (stmt, rows) = settle(conn, result)?;
        query::build_row_set(&stmt, &rows)
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RawMutation, DriverError> {
        let sql = rewrite_placeholders(sql, PlaceholderStyle::Numbered);
        let conn = self.conn()?;
        let result = async {
            let stmt = conn.client.prepare(&sql).await?;
            conn.client.execute(&stmt, &params::as_refs(params)).await
        }
        .await;
        Ok(RawMutation {
            affected_rows: settle(conn, result)?,
            last_insert_id: None,
        })
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError> {
        let conn = self.conn()?;
        let result = conn.client.batch_execute(sql).await;
        settle(conn, result)
    }

    fn abandon(&mut self) {
        if self
            .conn
            .as_ref()
            .is_none_or(|c| c.tx_status == PgTxStatus::Idle)
        {
            return;
        }
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    match conn.client.batch_execute("ROLLBACK").await {
                        Ok(()) => conn.tx_status = PgTxStatus::Idle,
                        Err(e) => {
                            warn!(error = %e, "postgres rollback of abandoned transaction failed");
                        }
                    }
                });
            }
            // Dropped with a non-idle status, so the pool closes it.
            Err(_) => warn!("no runtime to roll back abandoned postgres transaction; discarding connection"),
        }
    }
}
