use tracing::{debug, info};

use crate::db::connection::RowConnector;
use crate::db::Table;
use crate::error::Error;
use crate::models::dataset::Value;

/// Subset of the schema a target database needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchemaProfile {
    /// All six tables.
    Full,
    /// Addresses and ScamAddresses only.
    Scam,
}

impl SchemaProfile {
    pub fn tables(&self) -> &'static [Table] {
        match self {
            SchemaProfile::Full => &Table::ALL,
            SchemaProfile::Scam => &[Table::Addresses, Table::ScamAddresses],
        }
    }
}

pub async fn table_exists<C>(handle: &mut C, name: &str) -> Result<bool, Error>
where
    C: RowConnector + ?Sized,
{
    let query = handle.backend().dialect().table_exists_query();
    let count = handle
        .fetch_scalar(query, &[Value::from(name)])
        .await
        .map_err(Error::Query)?;

    Ok(count > 0)
}

/// Creates `table` unless it already exists. Fails without touching the
/// database when one of its parent tables is missing.
pub async fn create_table<C>(handle: &mut C, table: Table) -> Result<(), Error>
where
    C: RowConnector + ?Sized,
{
    for parent in table.parents() {
        if !table_exists(handle, parent.name()).await? {
            return Err(Error::ReferentialIntegrity {
                table: table.name().to_string(),
                detail: format!("parent table {} does not exist yet", parent),
            });
        }
    }

    let dialect = handle.backend().dialect();
    debug!("Creating table {} if not exists", table);
    handle
        .execute(table.ddl(dialect), &[])
        .await
        .map_err(|source| Error::Ddl {
            table: table.name(),
            source,
        })?;

    Ok(())
}

/// Blocks, Addresses and TxCategories. Must run before any table that
/// references them.
pub async fn create_primary_tables<C>(handle: &mut C) -> Result<(), Error>
where
    C: RowConnector + ?Sized,
{
    create_table(handle, Table::Blocks).await?;
    create_table(handle, Table::Addresses).await?;
    create_table(handle, Table::TxCategories).await?;
    Ok(())
}

pub async fn create_transactions_table<C>(handle: &mut C) -> Result<(), Error>
where
    C: RowConnector + ?Sized,
{
    create_table(handle, Table::Transactions).await
}

pub async fn create_contracts_table<C>(handle: &mut C) -> Result<(), Error>
where
    C: RowConnector + ?Sized,
{
    create_table(handle, Table::Contracts).await
}

pub async fn create_scam_table<C>(handle: &mut C) -> Result<(), Error>
where
    C: RowConnector + ?Sized,
{
    create_table(handle, Table::ScamAddresses).await
}

/// Creates every table of `profile` in dependency order. Safe to run on
/// every startup.
pub async fn initialize<C>(handle: &mut C, profile: SchemaProfile) -> Result<(), Error>
where
    C: RowConnector + ?Sized,
{
    info!("Initializing {:?} schema...", profile);

    match profile {
        SchemaProfile::Full => {
            create_primary_tables(handle).await?;
            create_transactions_table(handle).await?;
            create_contracts_table(handle).await?;
            create_scam_table(handle).await?;
        }
        SchemaProfile::Scam => {
            create_table(handle, Table::Addresses).await?;
            create_scam_table(handle).await?;
        }
    }

    info!("Schema initialized ({} tables)", profile.tables().len());
    Ok(())
}
