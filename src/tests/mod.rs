//! Tests against throwaway SQLite databases.

mod loader_tests;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::DatabaseConfig;
use crate::db::connection::{connect, RowConnection};
use crate::db::migration::{initialize, SchemaProfile};

/// A database file that disappears with the value.
pub(crate) struct TestDb {
    _dir: TempDir,
    path: PathBuf,
    pub config: DatabaseConfig,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("eth.db");
        let config = DatabaseConfig::sqlite(path.to_string_lossy());

        Self {
            _dir: dir,
            path,
            config,
        }
    }

    pub async fn connect(&self) -> RowConnection {
        connect(&self.config).await.expect("Failed to connect to test database")
    }

    /// Connection with the given schema profile already in place.
    pub async fn with_schema(&self, profile: SchemaProfile) -> RowConnection {
        let mut conn = self.connect().await;
        initialize(&mut conn, profile).await.expect("Failed to initialize schema");
        conn
    }

    /// Independent read-side pool for assertions.
    pub async fn reader(&self) -> SqlitePool {
        SqlitePool::connect_with(SqliteConnectOptions::new().filename(&self.path))
            .await
            .expect("Failed to open reader pool")
    }

    pub async fn count(&self, table: &str) -> i64 {
        let pool = self.reader().await;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;
        count
    }

    pub async fn table_names(&self) -> Vec<String> {
        let pool = self.reader().await;
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        pool.close().await;
        names
    }
}
