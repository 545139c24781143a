use async_trait::async_trait;

use super::{ConnectionPool, PooledHandle};
use crate::error::DriverError;
use crate::results::{RawMutation, RowSet};
use crate::types::RowValues;

#[cfg(feature = "postgres")]
use crate::postgres::{PostgresHandle, PostgresPool};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteHandle, SqlitePool};

/// Pool for whichever backend a [`ConfigAndPool`](crate::config::ConfigAndPool) was built for.
#[derive(Debug, Clone)]
pub enum DatabasePool {
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PostgresPool),
}

/// Handle checked out of a [`DatabasePool`].
#[derive(Debug)]
pub enum DatabaseHandle {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteHandle),
    #[cfg(feature = "postgres")]
    Postgres(PostgresHandle),
}

macro_rules! dispatch {
    ($handle:expr, $h:ident => $call:expr) => {
        match $handle {
            #[cfg(feature = "sqlite")]
            DatabaseHandle::Sqlite($h) => $call,
            #[cfg(feature = "postgres")]
            DatabaseHandle::Postgres($h) => $call,
        }
    };
}

#[async_trait]
impl PooledHandle for DatabaseHandle {
    async fn begin(&mut self) -> Result<(), DriverError> {
        dispatch!(self, h => h.begin().await)
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        dispatch!(self, h => h.commit().await)
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        dispatch!(self, h => h.rollback().await)
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<RowSet, DriverError> {
        dispatch!(self, h => h.query(sql, params).await)
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RawMutation, DriverError> {
        dispatch!(self, h => h.execute(sql, params).await)
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError> {
        dispatch!(self, h => h.execute_batch(sql).await)
    }

    fn abandon(&mut self) {
        dispatch!(self, h => h.abandon());
    }
}

#[async_trait]
impl ConnectionPool for DatabasePool {
    type Handle = DatabaseHandle;

    async fn acquire(&self) -> Result<Self::Handle, DriverError> {
        match self {
            #[cfg(feature = "sqlite")]
            DatabasePool::Sqlite(pool) => pool.acquire().await.map(DatabaseHandle::Sqlite),
            #[cfg(feature = "postgres")]
            DatabasePool::Postgres(pool) => pool.acquire().await.map(DatabaseHandle::Postgres),
        }
    }
}
