use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::ManageConnection;
use tokio::sync::Mutex;

use super::run_blocking;
use crate::error::DriverError;

/// A `rusqlite` connection shared with the blocking worker that runs its statements.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// bb8 manager for file-backed `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: String,
    foreign_keys: bool,
    busy_timeout: Duration,
}

impl SqliteManager {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            foreign_keys: true,
            busy_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn open(&self) -> Result<rusqlite::Connection, rusqlite::Error> {
        let conn = rusqlite::Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        if self.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        Ok(conn)
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = DriverError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let manager = self.clone();
        async move {
            let conn = tokio::task::spawn_blocking(move || manager.open())
                .await
                .map_err(|e| DriverError::Worker(format!("sqlite open join error: {e}")))??;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |c| {
                c.execute_batch("SELECT 1").map_err(DriverError::from)
            })
            .await
        }
    }

    /// A connection handed back with an open transaction (or still in use) is not reused.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.try_lock().map_or(true, |c| !c.is_autocommit())
    }
}
