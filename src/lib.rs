//! Fluent SQL statement builder with pooled, transaction-aware execution.
//!
//! Chain clauses on an [`Executor`], then `execute().await`. Values are always bound to `?`
//! placeholders; identifiers are written verbatim.
//!
//! ```rust,no_run
//! use sql_chain::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlChainError> {
//! let cap = PoolOptions::sqlite("app.db").max_size(4).build().await?;
//! let mut exec = cap.executor();
//!
//! exec.begin_transaction().await?;
//! let user = exec
//!     .insert("users", [("email", "a@b.com"), ("pass", "hash")])
//!     .execute()
//!     .await?
//!     .into_mutation()?;
//! exec.insert("ratings", [("userID", RowValues::from(user.insert_id)), ("rate", 5.into())])
//!     .execute()
//!     .await?;
//! exec.commit().await?;
//!
//! let rows = exec
//!     .select("users", ["userID", "email"])
//!     .where_("email", "=", "a@b.com")
//!     .execute()
//!     .await?
//!     .into_rows()?;
//! assert_eq!(rows.len(), 1);
//! # Ok(()) }
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable at least one backend feature: `sqlite` or `postgres`");

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod placeholders;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use builder::{Clauses, Connector, Statement, StatementBuilder};
pub use config::{ConfigAndPool, DatabaseType, PoolOptions};
pub use error::{DriverError, SqlChainError};
pub use executor::Executor;
pub use results::{MutationResult, QueryResult, Row, RowSet};
pub use transaction::{RollbackOutcome, TransactionController, TransactionState};
pub use types::{JoinKind, RowValues, StatementKind};
