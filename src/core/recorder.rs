// Records pattern occurrences to the metrics store
//
// Metric records carry free text (bug titles, error messages, review comments)
// that sometimes has credentials pasted in. Those get masked before saving.

use crate::core::{MetricRecord, PatternEvent, PatternLibrary};
use crate::db::{Database, OccurrenceInput};
use crate::error::{PulseError, Result};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

// Nobody needs a 10MB stack trace in the metrics store
const MAX_DETAIL_LENGTH: usize = 10_000;

const MAX_PATTERN_NAME_LENGTH: usize = 200;

// Secrets that show up in error messages and review comments.
// Group 1 is the key part that stays, the rest gets masked.
const SENSITIVE_PATTERNS: &[&str] = &[
    r"(?i)(password\s*[=:]\s*)\S+",
    r"(?i)(passwd\s*[=:]\s*)\S+",
    r"(?i)(token\s*[=:]\s*)\S+",
    r"(?i)(api[_-]?key\s*[=:]\s*)\S+",
    r"(?i)(secret\s*[=:]\s*)\S+",
    r"(?i)(bearer\s+)\S+",
    r"(?i)(--password\s+)\S+",
    r"(?i)(--token\s+)\S+",
];

const REDACTED: &str = "[REDACTED]";

pub struct Recorder {
    db: Arc<Database>,
    sensitive_regex: Vec<Regex>,
    strict: bool,
}

impl Recorder {
    pub fn new(db: Arc<Database>) -> Self {
        // Compile once, not per record
        let sensitive_regex = SENSITIVE_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            db,
            sensitive_regex,
            strict: false,
        }
    }

    /// Reject occurrences of patterns that aren't in the stored library
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    // Validate, scrub the detail text, append
    pub async fn record(&self, record: &MetricRecord) -> Result<i64> {
        let input = self.prepare(record).await?;
        let name = input.pattern_name.clone();
        let id = self.db.record_occurrence(input).await?;
        debug!(pattern = %name, category = %record.category(), id, "recorded occurrence");

        Ok(id)
    }

    /// Record a batch all-or-nothing. Every record is checked before the
    /// first insert, and the inserts share one transaction.
    pub async fn record_batch(&self, records: &[MetricRecord]) -> Result<usize> {
        let mut inputs = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let input = self.prepare(record).await.map_err(|e| {
                warn!(index, error = %e, "rejected metric record, batch not written");
                e
            })?;
            inputs.push(input);
        }

        let ids = self.db.record_occurrences(inputs).await?;
        debug!(count = ids.len(), "recorded occurrence batch");
        Ok(ids.len())
    }

    async fn prepare(&self, record: &MetricRecord) -> Result<OccurrenceInput> {
        let name = record.pattern_name().trim();
        self.validate_name(name)?;

        if self.strict && !self.db.pattern_exists(name).await? {
            return Err(PulseError::PatternNotFound(name.to_string()));
        }

        Ok(OccurrenceInput {
            pattern_name: name.to_string(),
            category: record.category(),
            timestamp: record.timestamp(),
            detail: record.detail().map(|d| self.sanitize_detail(&d)),
        })
    }

    /// Store every pattern of a loaded library, returns how many were written
    pub async fn import_library(&self, library: &PatternLibrary) -> Result<usize> {
        for pattern in library.iter() {
            self.db.upsert_pattern(pattern).await?;
        }
        debug!(count = library.len(), "imported pattern library");
        Ok(library.len())
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(PulseError::invalid("pattern name must not be empty"));
        }
        if name.len() > MAX_PATTERN_NAME_LENGTH {
            return Err(PulseError::invalid(format!(
                "pattern name longer than {} characters",
                MAX_PATTERN_NAME_LENGTH
            )));
        }
        if name.chars().any(|c| c.is_control()) {
            return Err(PulseError::invalid("pattern name contains control characters"));
        }
        Ok(())
    }

    // Mask secrets, drop control chars except newlines and tabs, cap length
    fn sanitize_detail(&self, detail: &str) -> String {
        let mut cleaned: String = detail
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();

        for regex in &self.sensitive_regex {
            if regex.is_match(&cleaned) {
                warn!("masking credential found in occurrence detail");
                cleaned = regex
                    .replace_all(&cleaned, format!("${{1}}{}", REDACTED).as_str())
                    .into_owned();
            }
        }

        if cleaned.len() > MAX_DETAIL_LENGTH {
            let mut cut = MAX_DETAIL_LENGTH;
            while !cleaned.is_char_boundary(cut) {
                cut -= 1;
            }
            cleaned.truncate(cut);
        }

        cleaned.trim().to_string()
    }
}
