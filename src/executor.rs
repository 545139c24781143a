//! Chainable executor: builds a statement and runs it on the right connection.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::builder::{Clauses, Statement, StatementBuilder};
use crate::error::SqlChainError;
use crate::pool::{ConnectionManager, ConnectionPool, PooledHandle};
use crate::results::{MutationResult, QueryResult};
use crate::transaction::{RollbackOutcome, TransactionController, TransactionState};
use crate::types::StatementKind;

/// Runs statements accumulated through [`Clauses`] on a pooled connection.
///
/// Outside a transaction each [`execute`](Executor::execute) acquires its own handle and gives
/// it back before returning. While a transaction is active every statement uses the
/// transaction's handle, which stays checked out until commit or rollback.
///
/// The builder is drained on every `execute`, success or failure, so the next chain starts
/// from an empty statement.
pub struct Executor<P: ConnectionPool> {
    builder: StatementBuilder,
    transaction: TransactionController<P>,
    connections: ConnectionManager<P>,
}

impl<P: ConnectionPool> Executor<P> {
    #[must_use]
    pub fn new(pool: P) -> Self {
        Self::from_manager(ConnectionManager::new(pool))
    }

    /// Share one pool between several executors.
    #[must_use]
    pub fn from_shared(pool: Arc<P>) -> Self {
        Self::from_manager(ConnectionManager::from_shared(pool))
    }

    #[must_use]
    pub fn from_manager(connections: ConnectionManager<P>) -> Self {
        Self {
            builder: StatementBuilder::new(),
            transaction: TransactionController::new(connections.clone()),
            connections,
        }
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionManager<P> {
        &self.connections
    }

    /// Statement text accumulated so far.
    #[must_use]
    pub fn sql(&self) -> String {
        self.builder.sql()
    }

    #[must_use]
    pub fn builder(&self) -> &StatementBuilder {
        &self.builder
    }

    #[must_use]
    pub fn transaction_state(&self) -> TransactionState {
        self.transaction.state()
    }

    /// # Errors
    /// See [`TransactionController::begin_transaction`].
    pub async fn begin_transaction(&mut self) -> Result<(), SqlChainError> {
        self.transaction.begin_transaction().await
    }

    /// # Errors
    /// See [`TransactionController::commit`].
    pub async fn commit(&mut self) -> Result<(), SqlChainError> {
        self.transaction.commit().await
    }

    /// See [`TransactionController::rollback`].
    pub async fn rollback(&mut self) -> RollbackOutcome {
        self.transaction.rollback().await
    }

    /// Drain the builder and run the statement.
    ///
    /// SELECT statements yield [`QueryResult::Rows`]; INSERT, UPDATE and CALL yield
    /// [`QueryResult::Mutation`]. A failing statement inside a transaction leaves the
    /// transaction active; the caller decides whether to roll back.
    ///
    /// # Errors
    /// - `ValidationError` if the statement is malformed; nothing is sent.
    /// - `ConnectionError` if no handle could be acquired outside a transaction.
    /// - `QueryExecutionError` if the database rejected the statement.
    pub async fn execute(&mut self) -> Result<QueryResult, SqlChainError> {
        let statement = self.builder.take();
        let kind = statement.validate()?;
        debug!(
            kind = ?kind,
            params = statement.params.len(),
            in_transaction = self.transaction.is_active(),
            sql = %statement.text,
            "executing statement"
        );

        if let Some(handle) = self.transaction.handle_mut() {
            return run(handle, kind, &statement).await;
        }

        let mut handle = self.connections.acquire().await?;
        let result = run(&mut handle, kind, &statement).await;
        self.connections.release(handle).await;
        result
    }

    /// Run raw SQL with no bound parameters, typically DDL or multi-statement scripts.
    ///
    /// Uses the transaction's handle when one is active. The builder is left untouched.
    ///
    /// # Errors
    /// `ConnectionError` or `QueryExecutionError`, as for [`execute`](Executor::execute).
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlChainError> {
        debug!(in_transaction = self.transaction.is_active(), "executing batch");
        if let Some(handle) = self.transaction.handle_mut() {
            return handle
                .execute_batch(sql)
                .await
                .map_err(|e| SqlChainError::execution(sql, e));
        }

        let mut handle = self.connections.acquire().await?;
        let result = handle.execute_batch(sql).await;
        self.connections.release(handle).await;
        result.map_err(|e| SqlChainError::execution(sql, e))
    }
}

async fn run<H: PooledHandle>(
    handle: &mut H,
    kind: StatementKind,
    statement: &Statement,
) -> Result<QueryResult, SqlChainError> {
    let outcome = if kind.returns_rows() {
        handle
            .query(&statement.text, &statement.params)
            .await
            .map(QueryResult::Rows)
    } else {
        handle
            .execute(&statement.text, &statement.params)
            .await
            .map(|raw| QueryResult::Mutation(MutationResult::classify(kind, raw)))
    };
    outcome.map_err(|e| SqlChainError::execution(statement.text.clone(), e))
}

impl<P: ConnectionPool> Clauses for Executor<P> {
    fn statement_mut(&mut self) -> &mut StatementBuilder {
        &mut self.builder
    }
}

impl<P: ConnectionPool> fmt::Debug for Executor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("builder", &self.builder)
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}
