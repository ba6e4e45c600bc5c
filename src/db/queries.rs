/// SQL query functions for database operations
///
/// Occurrences are append-only. Pattern rows hold the library definition
/// plus the last persisted effectiveness score and frequency.

use crate::core::{Pattern, TimeWindow};
use crate::db::models::*;
use crate::db::Database;
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::Row;

impl Database {
    /// Append one occurrence, returns the row id
    pub async fn record_occurrence(&self, input: OccurrenceInput) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO occurrences (pattern_name, category, timestamp, detail)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&input.pattern_name)
        .bind(input.category.to_string())
        .bind(format_timestamp(input.timestamp))
        .bind(input.detail)
        .fetch_one(self.pool())
        .await?;

        Ok(result.get(0))
    }

    /// Insert a batch in one transaction. Nothing is kept if any insert fails.
    pub async fn record_occurrences(&self, inputs: Vec<OccurrenceInput>) -> Result<Vec<i64>> {
        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(inputs.len());

        for input in inputs {
            let row = sqlx::query(
                r#"
                INSERT INTO occurrences (pattern_name, category, timestamp, detail)
                VALUES (?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(&input.pattern_name)
            .bind(input.category.to_string())
            .bind(format_timestamp(input.timestamp))
            .bind(input.detail)
            .fetch_one(&mut *tx)
            .await?;
            ids.push(row.get(0));
        }

        tx.commit().await?;
        Ok(ids)
    }

    /// Timestamps of a pattern's occurrences inside `window`, oldest first
    pub async fn occurrence_timestamps(
        &self,
        pattern_name: &str,
        window: &TimeWindow,
    ) -> Result<Vec<DateTime<Utc>>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT timestamp FROM occurrences
            WHERE pattern_name = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(pattern_name)
        .bind(format_timestamp(window.start()))
        .bind(format_timestamp(window.end()))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(|(raw,)| parse_timestamp(raw)).collect()
    }

    /// Count a pattern's occurrences, inside `window` or all time
    pub async fn count_occurrences(
        &self,
        pattern_name: &str,
        window: Option<&TimeWindow>,
    ) -> Result<i64> {
        let count: (i64,) = if let Some(window) = window {
            sqlx::query_as(
                r#"
                SELECT COUNT(*) FROM occurrences
                WHERE pattern_name = ? AND timestamp >= ? AND timestamp <= ?
                "#,
            )
            .bind(pattern_name)
            .bind(format_timestamp(window.start()))
            .bind(format_timestamp(window.end()))
            .fetch_one(self.pool())
            .await?
        } else {
            sqlx::query_as("SELECT COUNT(*) FROM occurrences WHERE pattern_name = ?")
                .bind(pattern_name)
                .fetch_one(self.pool())
                .await?
        };

        Ok(count.0)
    }

    /// Most recent occurrences, newest first
    ///
    /// # Arguments
    /// * `pattern_name` - Optional pattern filter (None for all patterns)
    /// * `limit` - Maximum number of rows to return
    pub async fn recent_occurrences(
        &self,
        pattern_name: Option<&str>,
        limit: i64,
    ) -> Result<Vec<OccurrenceRow>> {
        let rows = if let Some(name) = pattern_name {
            sqlx::query_as::<_, OccurrenceRow>(
                r#"
                SELECT * FROM occurrences
                WHERE pattern_name = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(name)
            .bind(limit)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, OccurrenceRow>(
                "SELECT * FROM occurrences ORDER BY timestamp DESC, id DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(self.pool())
            .await?
        };

        Ok(rows)
    }

    /// Insert or replace a pattern definition
    ///
    /// A re-import updates the definition only. The persisted score and
    /// frequency of an existing row survive.
    pub async fn upsert_pattern(&self, pattern: &Pattern) -> Result<()> {
        let groups = serde_json::to_string(&pattern.indicator_groups)?;

        sqlx::query(
            r#"
            INSERT INTO patterns
                (name, description, bad_example, good_example, severity,
                 effectiveness_score, occurrence_frequency, indicator_groups)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                description = excluded.description,
                bad_example = excluded.bad_example,
                good_example = excluded.good_example,
                severity = excluded.severity,
                indicator_groups = excluded.indicator_groups,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&pattern.name)
        .bind(&pattern.description)
        .bind(&pattern.bad_example)
        .bind(&pattern.good_example)
        .bind(pattern.severity.to_string())
        .bind(pattern.effectiveness_score)
        .bind(i64::from(pattern.occurrence_frequency))
        .bind(groups)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn get_pattern(&self, name: &str) -> Result<Option<Pattern>> {
        let row = sqlx::query_as::<_, PatternRow>("SELECT * FROM patterns WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;

        row.map(PatternRow::into_pattern).transpose()
    }

    /// All stored patterns, by name
    pub async fn list_patterns(&self) -> Result<Vec<Pattern>> {
        let rows = sqlx::query_as::<_, PatternRow>("SELECT * FROM patterns ORDER BY name ASC")
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(PatternRow::into_pattern).collect()
    }

    /// Delete a pattern definition. Its occurrences are kept.
    ///
    /// # Returns
    /// * `Ok(true)` - A row was deleted
    pub async fn delete_pattern(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM patterns WHERE name = ?")
            .bind(name)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Persist the latest effectiveness score and window frequency
    ///
    /// # Returns
    /// * `Ok(false)` - The pattern is not stored
    pub async fn record_effectiveness(
        &self,
        name: &str,
        score: f64,
        occurrence_frequency: u64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE patterns
            SET effectiveness_score = ?, occurrence_frequency = ?, updated_at = CURRENT_TIMESTAMP
            WHERE name = ?
            "#,
        )
        .bind(score.clamp(0.0, 1.0))
        .bind(i64::try_from(occurrence_frequency).unwrap_or(i64::MAX))
        .bind(name)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn pattern_exists(&self, name: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM patterns WHERE name = ?")
            .bind(name)
            .fetch_one(self.pool())
            .await?;

        Ok(count.0 > 0)
    }
}
