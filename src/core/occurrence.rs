/// Occurrence records and time windows
///
/// Metric records arrive in three shapes (bug, test failure, review finding).
/// The analytics only ever look at the pattern name and the timestamp, so all
/// three implement [`PatternEvent`] and get flattened into an [`Occurrence`].

use crate::error::{PulseError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of problem an occurrence was observed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Bug,
    TestFailure,
    CodeReview,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Bug => "bug",
            Category::TestFailure => "test_failure",
            Category::CodeReview => "code_review",
        };
        f.pad(s)
    }
}

impl FromStr for Category {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "bug" => Ok(Category::Bug),
            "test_failure" | "test" => Ok(Category::TestFailure),
            "code_review" | "review" => Ok(Category::CodeReview),
            other => Err(PulseError::invalid(format!("unknown category '{}'", other))),
        }
    }
}

/// Anything that can be counted as one occurrence of a pattern
pub trait PatternEvent {
    fn pattern_name(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn category(&self) -> Category;
}

/// A bug traced back to a pattern that should have prevented it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    pub pattern_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// A failing test attributed to a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    pub pattern_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub test_name: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A code review comment that flagged a pattern violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub pattern_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reviewer: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One incoming metric record, tagged by category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum MetricRecord {
    Bug(BugReport),
    TestFailure(TestFailure),
    CodeReview(ReviewFinding),
}

impl MetricRecord {
    /// Free-text detail kept alongside the occurrence. Never read by the analytics.
    pub fn detail(&self) -> Option<String> {
        let parts: Vec<&str> = match self {
            MetricRecord::Bug(b) => [b.title.as_deref(), b.file_path.as_deref()]
                .into_iter()
                .flatten()
                .collect(),
            MetricRecord::TestFailure(t) => [t.test_name.as_deref(), t.error_message.as_deref()]
                .into_iter()
                .flatten()
                .collect(),
            MetricRecord::CodeReview(r) => [r.reviewer.as_deref(), r.comment.as_deref()]
                .into_iter()
                .flatten()
                .collect(),
        };

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }
}

impl PatternEvent for MetricRecord {
    fn pattern_name(&self) -> &str {
        match self {
            MetricRecord::Bug(b) => &b.pattern_name,
            MetricRecord::TestFailure(t) => &t.pattern_name,
            MetricRecord::CodeReview(r) => &r.pattern_name,
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MetricRecord::Bug(b) => b.timestamp,
            MetricRecord::TestFailure(t) => t.timestamp,
            MetricRecord::CodeReview(r) => r.timestamp,
        }
    }

    fn category(&self) -> Category {
        match self {
            MetricRecord::Bug(_) => Category::Bug,
            MetricRecord::TestFailure(_) => Category::TestFailure,
            MetricRecord::CodeReview(_) => Category::CodeReview,
        }
    }
}

/// Flattened occurrence, the only shape the analytics consume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub pattern_name: String,
    pub timestamp: DateTime<Utc>,
    pub category: Category,
}

impl Occurrence {
    pub fn from_event<E: PatternEvent + ?Sized>(event: &E) -> Self {
        Self {
            pattern_name: event.pattern_name().to_string(),
            timestamp: event.timestamp(),
            category: event.category(),
        }
    }
}

impl PatternEvent for Occurrence {
    fn pattern_name(&self) -> &str {
        &self.pattern_name
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn category(&self) -> Category {
        self.category
    }
}

/// Closed time interval `[start, end]` that bounds an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting inverted bounds
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(PulseError::invalid(format!(
                "time window starts ({}) after it ends ({})",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering the `days` days that end at `end`
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(PulseError::invalid("time window must span at least one day"));
        }
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(|| {
                PulseError::invalid(format!(
                    "time window of {} days reaches past the earliest date",
                    days
                ))
            })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// UTC calendar day the window ends on
    pub fn end_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}
