use thiserror::Error;

use crate::config::ConfigError;
use crate::models::dataset::DatasetError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Referential integrity violation on {table}: {detail}")]
    ReferentialIntegrity { table: String, detail: String },

    #[error("Failed to create table {table}: {source}")]
    Ddl {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Write to {table} rejected: {reason}")]
    Write { table: String, reason: String },

    #[error("Write to {table} failed: {source}")]
    WriteFailed {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Database error: {0}")]
    Query(#[source] sqlx::Error),
}

impl Error {
    /// Classifies a failed row-level statement against `table`.
    pub(crate) fn statement(table: &str, err: sqlx::Error) -> Self {
        match foreign_key_detail(&err) {
            Some(detail) => Error::ReferentialIntegrity {
                table: table.to_string(),
                detail,
            },
            None => Error::Query(err),
        }
    }

    /// Classifies a failed bulk write against `table`.
    pub(crate) fn write(table: &str, err: sqlx::Error) -> Self {
        match foreign_key_detail(&err) {
            Some(detail) => Error::ReferentialIntegrity {
                table: table.to_string(),
                detail,
            },
            None => Error::WriteFailed {
                table: table.to_string(),
                source: err,
            },
        }
    }

    pub(crate) fn rejected(table: &str, reason: impl Into<String>) -> Self {
        Error::Write {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

fn foreign_key_detail(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            Some(db_err.message().to_string())
        }
        _ => None,
    }
}
