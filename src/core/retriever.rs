/// Occurrence and library retriever
///
/// Read side of the metrics store, shaped for the analytics.

use crate::core::{Occurrence, PatternLibrary, TimeWindow};
use crate::db::Database;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct Retriever {
    db: Arc<Database>,
}

impl Retriever {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Occurrence timestamps of one pattern inside `window`
    pub async fn occurrence_timestamps(
        &self,
        pattern_name: &str,
        window: &TimeWindow,
    ) -> Result<Vec<DateTime<Utc>>> {
        self.db.occurrence_timestamps(pattern_name, window).await
    }

    /// Latest occurrences, newest first
    pub async fn recent(&self, pattern_name: Option<&str>, limit: i64) -> Result<Vec<Occurrence>> {
        self.db
            .recent_occurrences(pattern_name, limit)
            .await?
            .iter()
            .map(|row| row.to_occurrence())
            .collect()
    }

    /// Immutable copy of the stored library
    ///
    /// Later writes to the store don't affect a snapshot already taken.
    pub async fn library_snapshot(&self) -> Result<PatternLibrary> {
        let patterns = self.db.list_patterns().await?;
        PatternLibrary::from_patterns(patterns)
    }
}
