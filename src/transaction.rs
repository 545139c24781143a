//! Transaction state machine and the connection handle it owns while active.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{DriverError, SqlChainError};
use crate::pool::{ConnectionManager, ConnectionPool, PooledHandle};

/// Whether a [`TransactionController`] currently holds an open transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionState {
    #[default]
    Idle,
    Active,
}

impl TransactionState {
    /// Legal transitions: Idle → Active via begin, Active → Idle via commit or rollback.
    fn check(self, op: &str, to: TransactionState) -> Result<(), SqlChainError> {
        match (self, to) {
            (TransactionState::Idle, TransactionState::Active)
            | (TransactionState::Active, TransactionState::Idle) => Ok(()),
            (TransactionState::Active, TransactionState::Active) => Err(
                SqlChainError::StateError(format!("{op}: transaction already active")),
            ),
            (TransactionState::Idle, TransactionState::Idle) => Err(SqlChainError::StateError(
                format!("{op}: no active transaction"),
            )),
        }
    }
}

/// Best-effort status returned by [`TransactionController::rollback`].
///
/// The connection has been released in every case; `Failed` only reports that the ROLLBACK
/// command itself errored.
#[derive(Debug)]
pub enum RollbackOutcome {
    RolledBack,
    /// Nothing to roll back; the controller was idle.
    NotActive,
    Failed(DriverError),
}

impl RollbackOutcome {
    /// True unless the ROLLBACK command reported an error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !matches!(self, RollbackOutcome::Failed(_))
    }
}

/// Owns the Idle/Active state machine and, while active, the transaction's connection handle.
///
/// Every statement run through the owning executor while the state is `Active` uses the held
/// handle; it goes back to the pool on commit or rollback. Dropping an active controller calls
/// [`PooledHandle::abandon`] and drops the handle; a backend pool never reuses a connection
/// that is still inside a transaction.
pub struct TransactionController<P: ConnectionPool> {
    connections: ConnectionManager<P>,
    state: TransactionState,
    handle: Option<P::Handle>,
}

impl<P: ConnectionPool> TransactionController<P> {
    #[must_use]
    pub fn new(connections: ConnectionManager<P>) -> Self {
        Self {
            connections,
            state: TransactionState::Idle,
            handle: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Acquire a handle and open a transaction on it.
    ///
    /// # Errors
    /// - `StateError` if a transaction is already active; the held handle is kept.
    /// - `ConnectionError` if no handle could be acquired.
    /// - `QueryExecutionError` if BEGIN failed; the fresh handle is released.
    pub async fn begin_transaction(&mut self) -> Result<(), SqlChainError> {
        self.state.check("begin", TransactionState::Active)?;

        let mut handle = self.connections.acquire().await?;
        if let Err(err) = handle.begin().await {
            self.connections.release(handle).await;
            return Err(SqlChainError::execution("BEGIN", err));
        }

        self.handle = Some(handle);
        self.state = TransactionState::Active;
        debug!("transaction started");
        Ok(())
    }

    /// Commit and release the held handle.
    ///
    /// # Errors
    /// - `StateError` if no transaction is active.
    /// - `QueryExecutionError` if COMMIT failed. A rollback is attempted, the handle is still
    ///   released and the controller returns to `Idle`.
    pub async fn commit(&mut self) -> Result<(), SqlChainError> {
        self.state.check("commit", TransactionState::Idle)?;
        let mut handle = self.take_handle()?;

        let committed = handle.commit().await;
        if committed.is_err()
            && let Err(rollback_err) = handle.rollback().await
        {
            warn!(error = %rollback_err, "rollback after failed commit also failed");
        }
        self.connections.release(handle).await;
        self.state = TransactionState::Idle;

        committed.map_err(|err| SqlChainError::execution("COMMIT", err))?;
        debug!("transaction committed");
        Ok(())
    }

    /// Roll back and release the held handle.
    ///
    /// The handle is released and the state reset to `Idle` whether or not the ROLLBACK command
    /// succeeds; a failure is logged and reported through [`RollbackOutcome::Failed`] instead of
    /// an error. Calling this while idle is a no-op.
    pub async fn rollback(&mut self) -> RollbackOutcome {
        if self.state == TransactionState::Idle {
            return RollbackOutcome::NotActive;
        }
        let Some(mut handle) = self.handle.take() else {
            self.state = TransactionState::Idle;
            return RollbackOutcome::NotActive;
        };

        let outcome = match handle.rollback().await {
            Ok(()) => RollbackOutcome::RolledBack,
            Err(err) => {
                warn!(error = %err, "rollback failed; releasing connection anyway");
                RollbackOutcome::Failed(err)
            }
        };
        self.connections.release(handle).await;
        self.state = TransactionState::Idle;
        debug!("transaction rolled back");
        outcome
    }

    /// The transaction's handle, if one is active.
    pub(crate) fn handle_mut(&mut self) -> Option<&mut P::Handle> {
        self.handle.as_mut()
    }

    fn take_handle(&mut self) -> Result<P::Handle, SqlChainError> {
        self.handle.take().ok_or_else(|| {
            self.state = TransactionState::Idle;
            SqlChainError::StateError("active transaction has no connection".into())
        })
    }
}

impl<P: ConnectionPool> Drop for TransactionController<P> {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            warn!("transaction dropped while active; rolling back");
            handle.abandon();
        }
    }
}

impl<P: ConnectionPool> fmt::Debug for TransactionController<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionController")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Run a block inside a transaction on an [`Executor`](crate::executor::Executor).
///
/// - Begins a transaction on `$executor`.
/// - Commits when the block yields `Ok(_)`.
/// - Rolls back when it yields `Err(_)` (including early `?` returns) and hands the error back.
///
/// The block must evaluate to `Result<T, SqlChainError>`; the macro evaluates to the same type.
///
/// ```rust,no_run
/// use sql_chain::prelude::*;
///
/// # async fn demo(mut exec: Executor<SqlitePool>) -> Result<(), SqlChainError> {
/// let user_id = sql_chain::transaction!(exec, {
///     let user = exec
///         .insert("users", [("email", "a@b.com"), ("pass", "x")])
///         .execute()
///         .await?
///         .into_mutation()?;
///     let user_id = user.insert_id.unwrap_or_default();
///     exec.insert("ratings", [("userID", user_id), ("rate", 5)])
///         .execute()
///         .await?;
///     Ok::<_, SqlChainError>(user_id)
/// })?;
/// # let _ = user_id;
/// # Ok(()) }
/// ```
#[macro_export]
macro_rules! transaction {
    ($executor:ident, $body:block) => {{
        match $executor.begin_transaction().await {
            Err(begin_err) => Err(begin_err),
            Ok(()) => {
                let __sql_chain_tx_body: ::std::result::Result<_, $crate::SqlChainError> =
                    async { $body }.await;
                match __sql_chain_tx_body {
                    Ok(value) => $executor.commit().await.map(|()| value),
                    Err(error) => {
                        let _ = $executor.rollback().await;
                        Err(error)
                    }
                }
            }
        }
    }};
}
