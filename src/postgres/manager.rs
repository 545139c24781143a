use std::future::Future;

use bb8::ManageConnection;
use tokio_postgres::{Client, NoTls};
use tracing::warn;

/// Where a pooled connection stands relative to `BEGIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PgTxStatus {
    #[default]
    Idle,
    Open,
    /// A statement failed after `BEGIN`; the server will roll back whatever ends the block.
    Aborted,
}

/// A Postgres client plus the transaction status this crate drove it into.
#[derive(Debug)]
pub struct PgConnection {
    pub(crate) client: Client,
    pub(crate) tx_status: PgTxStatus,
}

impl PgConnection {
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn tx_status(&self) -> PgTxStatus {
        self.tx_status
    }
}

/// bb8 manager for Postgres clients.
///
/// A connection returned while its transaction is still open or aborted is reported broken,
/// so bb8 closes it instead of handing it to the next caller.
#[derive(Debug, Clone)]
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }
}

impl ManageConnection for PgManager {
    type Connection = PgConnection;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    warn!(error = %e, "postgres connection task ended");
                }
            });
            Ok(PgConnection {
                client,
                tx_status: PgTxStatus::Idle,
            })
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.client.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.client.is_closed() || conn.tx_status != PgTxStatus::Idle
    }
}
