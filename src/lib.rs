pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod validation;

#[cfg(test)]
pub mod tests;

pub use config::{Backend, ConfigError, DatabaseConfig, NamedTarget};
pub use db::connection::{connect, Executed, RowConnection, RowConnector};
pub use db::export::{export_table, BulkExporter, ExportOptions, PoolExporter};
pub use db::migration::{
    create_contracts_table, create_primary_tables, create_scam_table, create_table,
    create_transactions_table, initialize, table_exists, SchemaProfile,
};
pub use db::{Dialect, Table};
pub use error::Error;
pub use models::dataset::{Dataset, DatasetError, Value};
