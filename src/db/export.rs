// Bulk append of a `Dataset` into a table. Goes through its own pool and
// multi-row INSERTs rather than the row-level connection.

use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyConnection, AnyPool, Connection};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::db::{arguments, Dialect};
use crate::error::Error;
use crate::models::dataset::Dataset;
use crate::validation::validate_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Rows per INSERT statement. Capped so a statement never exceeds the
    /// backend's bind parameter limit.
    pub batch_size: usize,
    /// Commit all batches together, or none of them.
    pub transactional: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            transactional: false,
        }
    }
}

/// Appends datasets to tables.
#[async_trait]
pub trait BulkExporter {
    /// Appends every row of `dataset` to `table_name`, returning the number of
    /// rows written. Existing rows are left untouched.
    async fn export_table(
        &self,
        dataset: &Dataset,
        table_name: &str,
        config: &DatabaseConfig,
    ) -> Result<u64, Error>;
}

#[derive(Debug, Clone, Default)]
pub struct PoolExporter {
    options: ExportOptions,
}

impl PoolExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    fn rows_per_batch(&self, dialect: Dialect, columns: usize) -> usize {
        let by_params = dialect.max_bind_params() / columns.max(1);
        self.options.batch_size.min(by_params).max(1)
    }
}

/// Appends `dataset` to `table_name` with the default [`ExportOptions`].
pub async fn export_table(
    dataset: &Dataset,
    table_name: &str,
    config: &DatabaseConfig,
) -> Result<u64, Error> {
    PoolExporter::default()
        .export_table(dataset, table_name, config)
        .await
}

#[async_trait]
impl BulkExporter for PoolExporter {
    async fn export_table(
        &self,
        dataset: &Dataset,
        table_name: &str,
        config: &DatabaseConfig,
    ) -> Result<u64, Error> {
        validate_identifier(table_name).map_err(|e| Error::rejected(table_name, e.to_string()))?;
        for column in dataset.column_names() {
            validate_identifier(column).map_err(|e| Error::rejected(table_name, e.to_string()))?;
        }

        install_default_drivers();
        let options = config.connect_options()?;
        let pool: AnyPool = AnyPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(Error::Connection)?;

        let result = self.write(&pool, dataset, table_name, config).await;
        pool.close().await;

        match &result {
            Ok(written) => info!("Exported {} rows into {} on {}", written, table_name, config),
            Err(e) => warn!("Export into {} on {} failed: {}", table_name, config, e),
        }
        result
    }
}

impl PoolExporter {
    async fn write(
        &self,
        pool: &AnyPool,
        dataset: &Dataset,
        table_name: &str,
        config: &DatabaseConfig,
    ) -> Result<u64, Error> {
        let dialect = config.backend.dialect();
        let mut conn = pool.acquire().await.map_err(Error::Connection)?;

        check_columns(&mut *conn, dialect, dataset, table_name).await?;
        if dataset.is_empty() {
            return Ok(0);
        }

        let rows_per_batch = self.rows_per_batch(dialect, dataset.num_columns());

        if !self.options.transactional {
            return insert_batches(&mut *conn, dialect, dataset, table_name, rows_per_batch).await;
        }

        let mut tx = conn.begin().await.map_err(|e| Error::write(table_name, e))?;
        // Dropping `tx` on error rolls every batch back.
        let written = insert_batches(&mut *tx, dialect, dataset, table_name, rows_per_batch).await?;
        tx.commit().await.map_err(|e| Error::write(table_name, e))?;

        Ok(written)
    }
}

/// Rejects datasets carrying a column the destination table lacks.
async fn check_columns(
    conn: &mut AnyConnection,
    dialect: Dialect,
    dataset: &Dataset,
    table_name: &str,
) -> Result<(), Error> {
    let table_columns: Vec<String> = sqlx::query_scalar(dialect.table_columns_query())
        .bind(table_name.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| Error::write(table_name, e))?;

    if table_columns.is_empty() {
        return Err(Error::rejected(table_name, "table does not exist"));
    }

    let unknown: Vec<&str> = dataset
        .column_names()
        .filter(|c| !table_columns.iter().any(|t| t.eq_ignore_ascii_case(c)))
        .collect();

    if !unknown.is_empty() {
        return Err(Error::rejected(
            table_name,
            format!("columns not in table: {}", unknown.join(", ")),
        ));
    }

    Ok(())
}

async fn insert_batches(
    conn: &mut AnyConnection,
    dialect: Dialect,
    dataset: &Dataset,
    table_name: &str,
    rows_per_batch: usize,
) -> Result<u64, Error> {
    let column_list = dataset
        .column_names()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let row_placeholders = format!("({})", vec!["?"; dataset.num_columns()].join(", "));
    let table = dialect.quote_ident(table_name);

    let total = dataset.num_rows();
    let mut written = 0;

    for start in (0..total).step_by(rows_per_batch) {
        let end = (start + rows_per_batch).min(total);
        let statement = format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            column_list,
            vec![row_placeholders.as_str(); end - start].join(", ")
        );

        let args = arguments((start..end).flat_map(|row| dataset.row(row)))
            .map_err(|e| Error::write(table_name, e))?;
        let result = sqlx::query_with(&statement, args)
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::write(table_name, e))?;

        written += result.rows_affected();
        debug!("Wrote rows {}..{} of {} into {}", start, end, total, table_name);
    }

    Ok(written)
}
