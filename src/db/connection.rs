// Row-level access: one live connection per handle, statements executed one
// at a time. Used by the schema initializer and the single-row inserts.

use async_trait::async_trait;
use sqlx::any::install_default_drivers;
use sqlx::{AnyConnection, Connection};
use tracing::{debug, info};

use crate::config::{Backend, DatabaseConfig};
use crate::db::arguments;
use crate::error::Error;
use crate::models::dataset::Value;

/// Outcome of a single executed statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Executed {
    pub rows_affected: u64,
    /// Key assigned to the inserted row, when the statement inserted one.
    pub last_insert_id: Option<i64>,
}

/// A handle that executes one statement at a time.
#[async_trait]
pub trait RowConnector: Send {
    fn backend(&self) -> Backend;

    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<Executed, sqlx::Error>;

    /// Runs a query returning a single integer, e.g. `SELECT COUNT(*) ...` or
    /// `INSERT ... RETURNING <key>`.
    async fn fetch_scalar(&mut self, query: &str, params: &[Value]) -> Result<i64, sqlx::Error>;

    async fn close(self) -> Result<(), Error>
    where
        Self: Sized;
}

/// Live connection to one database. Dropping it releases the connection;
/// [`RowConnection::close`] does so gracefully.
pub struct RowConnection {
    conn: AnyConnection,
    backend: Backend,
    target: String,
}

/// Opens a connection to the database described by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<RowConnection, Error> {
    install_default_drivers();

    let options = config.connect_options()?;
    let conn = AnyConnection::connect_with(&options)
        .await
        .map_err(Error::Connection)?;

    info!("Connected to {}", config);

    Ok(RowConnection {
        conn,
        backend: config.backend,
        target: config.to_string(),
    })
}

#[async_trait]
impl RowConnector for RowConnection {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<Executed, sqlx::Error> {
        let args = arguments(params)?;
        let result = sqlx::query_with(statement, args)
            .execute(&mut self.conn)
            .await?;

        Ok(Executed {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn fetch_scalar(&mut self, query: &str, params: &[Value]) -> Result<i64, sqlx::Error> {
        let args = arguments(params)?;
        sqlx::query_scalar_with::<_, i64, _>(query, args)
            .fetch_one(&mut self.conn)
            .await
    }

    async fn close(self) -> Result<(), Error> {
        debug!("Closing connection to {}", self.target);
        self.conn.close().await.map_err(Error::Connection)
    }
}
