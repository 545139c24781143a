//! Convenient imports for common functionality.
//!
//! `use sql_chain::prelude::*;` brings the clause trait into scope along with the executor,
//! result and configuration types.

pub use crate::builder::{Clauses, Connector, Statement, StatementBuilder};
pub use crate::config::{ConfigAndPool, DatabaseType, PoolOptions, PoolOptionsBuilder};
pub use crate::error::{DriverError, SqlChainError};
pub use crate::executor::Executor;
pub use crate::placeholders::{PlaceholderStyle, count_placeholders, rewrite_placeholders};
pub use crate::pool::{
    ConnectionManager, ConnectionPool, DatabaseHandle, DatabasePool, PooledHandle,
};
pub use crate::results::{MutationResult, QueryResult, RawMutation, Row, RowSet};
pub use crate::transaction::{RollbackOutcome, TransactionController, TransactionState};
pub use crate::types::{JoinKind, RowValues, StatementKind};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PgConnection, PgManager, PgTxStatus, PostgresHandle, PostgresPool};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteHandle, SqliteManager, SqlitePool};
