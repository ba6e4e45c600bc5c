/// Data models for database entities
///
/// Rows map 1:1 to tables. Conversions into the domain types validate the
/// stored text (timestamps, severities, group lists) on the way out.

use crate::core::{Category, IndicatorGroup, Occurrence, Pattern, Severity};
use crate::error::{PulseError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PulseError::invalid(format!("bad stored timestamp '{}': {}", raw, e)))
}

/// A stored occurrence
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OccurrenceRow {
    pub id: i64,
    pub pattern_name: String,
    pub category: String,
    pub timestamp: String, // RFC 3339, see format_timestamp
    pub detail: Option<String>,
    pub recorded_at: String, // CURRENT_TIMESTAMP from SQLite
}

impl OccurrenceRow {
    pub fn to_occurrence(&self) -> Result<Occurrence> {
        Ok(Occurrence {
            pattern_name: self.pattern_name.clone(),
            timestamp: parse_timestamp(&self.timestamp)?,
            category: self.category.parse()?,
        })
    }
}

/// Input for appending an occurrence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrenceInput {
    pub pattern_name: String,
    pub category: Category,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}

/// A stored pattern definition
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatternRow {
    pub name: String,
    pub description: String,
    pub bad_example: String,
    pub good_example: String,
    pub severity: String,
    pub effectiveness_score: f64,
    pub occurrence_frequency: i64,
    pub indicator_groups: String, // JSON array
    pub updated_at: String,
}

impl PatternRow {
    /// Parse indicator groups from JSON
    pub fn get_indicator_groups(&self) -> Result<BTreeSet<IndicatorGroup>> {
        Ok(serde_json::from_str(&self.indicator_groups)?)
    }

    pub fn into_pattern(self) -> Result<Pattern> {
        let severity: Severity = self.severity.parse()?;
        let indicator_groups = self.get_indicator_groups()?;

        Ok(Pattern {
            name: self.name,
            description: self.description,
            bad_example: self.bad_example,
            good_example: self.good_example,
            severity,
            effectiveness_score: self.effectiveness_score.clamp(0.0, 1.0),
            occurrence_frequency: u32::try_from(self.occurrence_frequency.max(0))
                .unwrap_or(u32::MAX),
            indicator_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap();

        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(parse_timestamp(&format_timestamp(late)).unwrap(), late);
    }

    #[test]
    fn test_pattern_row_conversion() {
        let row = PatternRow {
            name: "temp_file_handling".to_string(),
            description: String::new(),
            bad_example: "open('/tmp/x')".to_string(),
            good_example: "tempfile.NamedTemporaryFile()".to_string(),
            severity: "medium".to_string(),
            effectiveness_score: 0.75,
            occurrence_frequency: 4,
            indicator_groups: r#"["file-io"]"#.to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        };

        let pattern = row.into_pattern().unwrap();
        assert_eq!(pattern.severity, Severity::Medium);
        assert_eq!(pattern.occurrence_frequency, 4);
        assert!(pattern.indicator_groups.contains(&IndicatorGroup::FileIo));
    }

    #[test]
    fn test_bad_occurrence_row() {
        let row = OccurrenceRow {
            id: 1,
            pattern_name: "p".to_string(),
            category: "bug".to_string(),
            timestamp: "yesterday".to_string(),
            detail: None,
            recorded_at: String::new(),
        };
        assert!(row.to_occurrence().is_err());
    }
}
