//! The narrow interface the executor consumes from a connection pool, and the
//! [`ConnectionManager`] that acquires and releases handles through it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DriverError, SqlChainError};
use crate::results::{RawMutation, RowSet};
use crate::types::RowValues;

mod any;

pub use any::{DatabaseHandle, DatabasePool};

/// One exclusively-owned physical connection checked out of a pool.
#[async_trait]
pub trait PooledHandle: Send + 'static {
    async fn begin(&mut self) -> Result<(), DriverError>;

    async fn commit(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Run a row-returning statement.
    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<RowSet, DriverError>;

    /// Run a statement that changes data.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RawMutation, DriverError>;

    /// Run one or more statements with no bound parameters.
    async fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError>;

    /// Synchronous last-chance cleanup for a handle dropped mid-transaction.
    ///
    /// Called from `Drop`, so it must not block on the async runtime.
    fn abandon(&mut self) {}
}

/// Source of [`PooledHandle`]s.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    type Handle: PooledHandle;

    /// Check out a handle, waiting for one to become available.
    async fn acquire(&self) -> Result<Self::Handle, DriverError>;

    /// Give a handle back. The default drops it, which returns RAII pool guards.
    async fn release(&self, handle: Self::Handle) {
        drop(handle);
    }
}

/// Acquires one handle per logical unit of work and releases it when that work is done.
///
/// `release` takes the handle by value, so a handle cannot be released twice.
pub struct ConnectionManager<P: ConnectionPool> {
    pool: Arc<P>,
}

impl<P: ConnectionPool> ConnectionManager<P> {
    #[must_use]
    pub fn new(pool: P) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[must_use]
    pub fn from_shared(pool: Arc<P>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// Check out a handle.
    ///
    /// # Errors
    /// Returns `SqlChainError::ConnectionError` if the pool is exhausted or unreachable.
    pub async fn acquire(&self) -> Result<P::Handle, SqlChainError> {
        let handle = self
            .pool
            .acquire()
            .await
            .map_err(|e| SqlChainError::ConnectionError(e.to_string()))?;
        debug!("connection acquired");
        Ok(handle)
    }

    pub async fn release(&self, handle: P::Handle) {
        self.pool.release(handle).await;
        debug!("connection released");
    }
}

impl<P: ConnectionPool> Clone for ConnectionManager<P> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<P: ConnectionPool> fmt::Debug for ConnectionManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager").finish_non_exhaustive()
    }
}
