use thiserror::Error;

/// Failures reported by the pool/driver layer underneath the executor.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error("pool error: {0}")]
    Pool(String),

    #[error("worker error: {0}")]
    Worker(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SqlChainError {
    /// Illegal transaction-state transition (double begin, commit while idle).
    #[error("Transaction state error: {0}")]
    StateError(String),

    /// The accumulated statement is malformed and was never sent.
    #[error("Statement validation error: {0}")]
    ValidationError(String),

    /// The pool could not supply a connection handle.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The database rejected the statement. `statement` holds placeholder text only.
    #[error("Query execution error for `{statement}`: {source}")]
    QueryExecutionError {
        statement: String,
        #[source]
        source: DriverError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SqlChainError {
    pub(crate) fn execution(statement: impl Into<String>, source: DriverError) -> Self {
        SqlChainError::QueryExecutionError {
            statement: statement.into(),
            source,
        }
    }

    /// True for failures the database reported while running a statement.
    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        matches!(self, SqlChainError::QueryExecutionError { .. })
    }
}

impl<E> From<bb8::RunError<E>> for DriverError
where
    E: std::fmt::Display,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::User(e) => DriverError::Pool(e.to_string()),
            bb8::RunError::TimedOut => {
                DriverError::Pool("timed out waiting for a pooled connection".into())
            }
        }
    }
}
