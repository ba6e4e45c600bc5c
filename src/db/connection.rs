// The metrics store: one SQLite file holding the occurrence log and the
// pattern table. Appends come from `record`, reads from `analyze` and `plan`.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 5;

// A batch append holds the write lock; readers wait this long for it
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl Database {
    /// Open the metrics store at `db_path`, creating the file, its parent
    /// directories and the tables on first use.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path,
        };

        db.initialize_schema().await?;

        Ok(db)
    }

    // Single connection: every pooled connection would otherwise get its
    // own empty in-memory database.
    #[cfg(test)]
    pub async fn new_test() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path: PathBuf::from(":memory:"),
        };

        db.initialize_schema().await?;

        Ok(db)
    }

    async fn initialize_schema(&self) -> Result<()> {
        let schema = include_str!("../../database/schema.sql");

        // SQLite runs one statement per execute
        for statement in schema.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(self.pool.as_ref()).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Row counts for `status`
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let occurrence_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM occurrences")
            .fetch_one(self.pool.as_ref())
            .await?;

        let pattern_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM patterns")
            .fetch_one(self.pool.as_ref())
            .await?;

        let tracked_count: (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT pattern_name) FROM occurrences")
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(DatabaseStats {
            total_occurrences: occurrence_count.0,
            total_patterns: pattern_count.0,
            patterns_with_occurrences: tracked_count.0,
            pool_size: self.pool.size(),
            idle_connections: self.pool.num_idle(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub total_occurrences: i64,
    pub total_patterns: i64,
    pub patterns_with_occurrences: i64,
    pub pool_size: u32,
    pub idle_connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::{Category, Pattern, Severity};
    use crate::db::OccurrenceInput;
    use chrono::Utc;

    fn occurrence(name: &str) -> OccurrenceInput {
        OccurrenceInput {
            pattern_name: name.to_string(),
            category: Category::Bug,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    #[tokio::test]
    async fn test_empty_store_stats() {
        let db = Database::new_test().await.unwrap();
        let stats = db.stats().await.unwrap();

        assert_eq!(stats.total_occurrences, 0);
        assert_eq!(stats.total_patterns, 0);
        assert_eq!(stats.patterns_with_occurrences, 0);
    }

    #[tokio::test]
    async fn test_stats_count_untracked_patterns_separately() {
        let db = Database::new_test().await.unwrap();
        db.upsert_pattern(&Pattern::new("declared", Severity::Low))
            .await
            .unwrap();
        db.record_occurrences(vec![occurrence("a"), occurrence("a"), occurrence("b")])
            .await
            .unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total_occurrences, 3);
        assert_eq!(stats.total_patterns, 1);
        // occurrences may name patterns that were never declared
        assert_eq!(stats.patterns_with_occurrences, 2);
    }

    #[tokio::test]
    async fn test_file_database_reopens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("metrics.db");

        let db = Database::new(&path).await.unwrap();
        db.close().await;

        // schema creation is idempotent
        let db = Database::new(&path).await.unwrap();
        assert_eq!(db.path(), path.as_path());
        assert!(db.stats().await.is_ok());
    }
}
