/// Pattern definitions
///
/// A pattern is a named, reusable fix for a recurring problem. The library
/// that owns them lives outside the analytics; everything here is read-only
/// input as far as scoring and matching are concerned.

use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// How bad it is to get this pattern wrong. Ordered low → critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.pad(s)
    }
}

impl FromStr for Severity {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(PulseError::invalid(format!("unknown severity '{}'", other))),
        }
    }
}

/// Vocabulary family a request can touch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorGroup {
    Numeric,
    #[serde(alias = "file_io")]
    FileIo,
    #[serde(alias = "web_endpoint")]
    WebEndpoint,
    #[serde(alias = "exception_handling")]
    ExceptionHandling,
    Serialization,
    Database,
    Concurrency,
}

impl IndicatorGroup {
    pub const ALL: [IndicatorGroup; 7] = [
        IndicatorGroup::Numeric,
        IndicatorGroup::FileIo,
        IndicatorGroup::WebEndpoint,
        IndicatorGroup::ExceptionHandling,
        IndicatorGroup::Serialization,
        IndicatorGroup::Database,
        IndicatorGroup::Concurrency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorGroup::Numeric => "numeric",
            IndicatorGroup::FileIo => "file-io",
            IndicatorGroup::WebEndpoint => "web-endpoint",
            IndicatorGroup::ExceptionHandling => "exception-handling",
            IndicatorGroup::Serialization => "serialization",
            IndicatorGroup::Database => "database",
            IndicatorGroup::Concurrency => "concurrency",
        }
    }
}

impl std::fmt::Display for IndicatorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for IndicatorGroup {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        IndicatorGroup::ALL
            .into_iter()
            .find(|group| group.name() == normalized)
            .ok_or_else(|| PulseError::invalid(format!("unknown indicator group '{}'", s)))
    }
}

fn default_effectiveness() -> f64 {
    0.5
}

/// A reusable fix definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bad_example: String,
    #[serde(default)]
    pub good_example: String,
    pub severity: Severity,
    /// Last known effectiveness score, persisted by the store
    #[serde(default = "default_effectiveness")]
    pub effectiveness_score: f64,
    #[serde(default)]
    pub occurrence_frequency: u32,
    /// Indicator groups this pattern is relevant to. Empty means generic.
    #[serde(default, alias = "context_indicators")]
    pub indicator_groups: BTreeSet<IndicatorGroup>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            bad_example: String::new(),
            good_example: String::new(),
            severity,
            effectiveness_score: default_effectiveness(),
            occurrence_frequency: 0,
            indicator_groups: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_examples(mut self, bad: impl Into<String>, good: impl Into<String>) -> Self {
        self.bad_example = bad.into();
        self.good_example = good.into();
        self
    }

    pub fn with_indicators<I: IntoIterator<Item = IndicatorGroup>>(mut self, groups: I) -> Self {
        self.indicator_groups.extend(groups);
        self
    }

    pub fn with_frequency(mut self, occurrence_frequency: u32) -> Self {
        self.occurrence_frequency = occurrence_frequency;
        self
    }

    /// Generic patterns declare no indicator groups and are always candidates
    pub fn is_generic(&self) -> bool {
        self.indicator_groups.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PulseError::invalid("pattern name must not be empty"));
        }
        let score = self.effectiveness_score;
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(PulseError::invalid(format!(
                "pattern '{}' has effectiveness score {} outside [0, 1]",
                self.name, self.effectiveness_score
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_indicator_group_parse() {
        assert_eq!("file_io".parse::<IndicatorGroup>().unwrap(), IndicatorGroup::FileIo);
        assert_eq!("Web-Endpoint".parse::<IndicatorGroup>().unwrap(), IndicatorGroup::WebEndpoint);
        assert!("graphics".parse::<IndicatorGroup>().is_err());
    }

    #[test]
    fn test_pattern_json_defaults() {
        let json = r#"{
            "name": "temp_file_handling",
            "severity": "high",
            "indicator_groups": ["file_io"]
        }"#;
        let pattern: Pattern = serde_json::from_str(json).unwrap();

        assert_eq!(pattern.effectiveness_score, 0.5);
        assert_eq!(pattern.occurrence_frequency, 0);
        assert!(pattern.indicator_groups.contains(&IndicatorGroup::FileIo));
        assert!(!pattern.is_generic());
    }

    #[test]
    fn test_pattern_validation() {
        assert!(Pattern::new("  ", Severity::Low).validate().is_err());

        let mut pattern = Pattern::new("ok", Severity::Low);
        assert!(pattern.validate().is_ok());

        pattern.effectiveness_score = f64::NAN;
        assert!(pattern.validate().is_err());
    }
}
