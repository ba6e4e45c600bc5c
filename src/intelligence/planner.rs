/// Generation planner
///
/// Splits matcher output into patterns that are applied to the request
/// automatically and patterns that are only suggested, gated by severity.
///
/// | severity | applied when                      |
/// |----------|-----------------------------------|
/// | critical | always                            |
/// | high     | `confidence >= min_confidence`    |
/// | medium   | `confidence >= min_confidence`    |
/// | low      | never                             |
///
/// Anything not applied is suggested if its confidence is above zero and
/// ignored otherwise.

use crate::core::{AnalysisConfig, IndicatorGroup, Severity};
use crate::error::{PulseError, Result};
use crate::intelligence::context_detector::ContextDetector;
use crate::intelligence::pattern_matcher::{rank_order, MatchCandidate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

pub use crate::core::config::DEFAULT_MIN_CONFIDENCE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanOptions {
    pub min_confidence: f64,
    /// When false nothing is applied; every non-zero candidate is suggested
    pub apply_patterns: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            apply_patterns: true,
        }
    }
}

impl From<&AnalysisConfig> for PlanOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            apply_patterns: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Applied,
    Suggested,
    Ignored,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Decision::Applied => "applied",
            Decision::Suggested => "suggested",
            Decision::Ignored => "ignored",
        })
    }
}

/// Why one candidate ended up where it did
#[derive(Debug, Clone, Serialize)]
pub struct Rationale {
    pub pattern_name: String,
    pub decision: Decision,
    pub confidence: f64,
    pub severity: Severity,
    pub matched_indicators: BTreeSet<IndicatorGroup>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanMetadata {
    pub prompt: String,
    pub min_confidence: f64,
    pub apply_patterns: bool,
    pub generated_at: DateTime<Utc>,
}

/// Applied and suggested patterns for one request
#[derive(Debug, Clone, Serialize)]
pub struct GenerationPlan {
    pub applied: Vec<MatchCandidate>,
    pub suggested: Vec<MatchCandidate>,
    /// Applied, then suggested, then ignored; each in rank order
    pub rationale: Vec<Rationale>,
    pub metadata: PlanMetadata,
}

impl GenerationPlan {
    pub fn applied_names(&self) -> Vec<&str> {
        self.applied.iter().map(|c| c.name()).collect()
    }

    pub fn suggested_names(&self) -> Vec<&str> {
        self.suggested.iter().map(|c| c.name()).collect()
    }

    pub fn rationale_for(&self, pattern_name: &str) -> Option<&Rationale> {
        self.rationale.iter().find(|r| r.pattern_name == pattern_name)
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.suggested.is_empty()
    }
}

pub struct GenerationPlanner {
    options: PlanOptions,
    detector: ContextDetector,
}

impl GenerationPlanner {
    pub fn new(options: PlanOptions) -> Result<Self> {
        if !options.min_confidence.is_finite() || !(0.0..=1.0).contains(&options.min_confidence) {
            return Err(PulseError::invalid(format!(
                "min_confidence must be in [0, 1], got {}",
                options.min_confidence
            )));
        }
        Ok(Self {
            options,
            detector: ContextDetector::new(),
        })
    }

    /// Apply the severity policy to one candidate
    pub fn decide(&self, candidate: &MatchCandidate) -> (Decision, String) {
        let confidence = candidate.confidence;
        let threshold = self.options.min_confidence;
        let has_signal = confidence > 0.0;

        let (decision, why) = if !self.options.apply_patterns {
            if has_signal {
                (Decision::Suggested, "pattern application disabled".to_string())
            } else {
                (Decision::Ignored, "no relevance signal".to_string())
            }
        } else {
            match candidate.severity {
                Severity::Critical => (
                    Decision::Applied,
                    "critical patterns are always applied".to_string(),
                ),
                Severity::High | Severity::Medium if confidence >= threshold => (
                    Decision::Applied,
                    format!("confidence {:.2} meets threshold {:.2}", confidence, threshold),
                ),
                Severity::High | Severity::Medium if has_signal => (
                    Decision::Suggested,
                    format!("confidence {:.2} below threshold {:.2}", confidence, threshold),
                ),
                Severity::Low if has_signal => (
                    Decision::Suggested,
                    "low severity patterns are never auto-applied".to_string(),
                ),
                _ => (Decision::Ignored, "no relevance signal".to_string()),
            }
        };

        (decision, why)
    }

    pub fn plan(&self, prompt: &str, candidates: Vec<MatchCandidate>) -> GenerationPlan {
        self.plan_at(prompt, candidates, Utc::now())
    }

    /// Same as [`plan`](Self::plan) with an explicit timestamp
    pub fn plan_at(
        &self,
        prompt: &str,
        mut candidates: Vec<MatchCandidate>,
        generated_at: DateTime<Utc>,
    ) -> GenerationPlan {
        candidates.sort_by(rank_order);
        let keyword_hits = self.detector.explain(prompt);

        let mut applied = Vec::new();
        let mut suggested = Vec::new();
        let mut applied_why = Vec::new();
        let mut suggested_why = Vec::new();
        let mut ignored_why = Vec::new();

        for candidate in candidates {
            let (decision, why) = self.decide(&candidate);
            let reason = format!("{} ({})", why, signal_summary(&candidate, &keyword_hits));
            debug!(
                pattern = candidate.name(),
                confidence = candidate.confidence,
                severity = %candidate.severity,
                %decision,
                "planned pattern"
            );

            let rationale = Rationale {
                pattern_name: candidate.name().to_string(),
                decision,
                confidence: candidate.confidence,
                severity: candidate.severity,
                matched_indicators: candidate.context_indicators.clone(),
                reason,
            };

            match decision {
                Decision::Applied => {
                    applied_why.push(rationale);
                    applied.push(candidate);
                }
                Decision::Suggested => {
                    suggested_why.push(rationale);
                    suggested.push(candidate);
                }
                Decision::Ignored => ignored_why.push(rationale),
            }
        }

        let mut rationale = applied_why;
        rationale.extend(suggested_why);
        rationale.extend(ignored_why);

        GenerationPlan {
            applied,
            suggested,
            rationale,
            metadata: PlanMetadata {
                prompt: prompt.to_string(),
                min_confidence: self.options.min_confidence,
                apply_patterns: self.options.apply_patterns,
                generated_at,
            },
        }
    }
}

// "matched numeric via 'numpy'; boosted for worsening trend"
fn signal_summary(candidate: &MatchCandidate, keyword_hits: &[(IndicatorGroup, String)]) -> String {
    let mut parts = Vec::new();

    if candidate.context_indicators.is_empty() {
        parts.push("generic pattern".to_string());
    } else {
        let groups: Vec<String> = candidate
            .context_indicators
            .iter()
            .map(|group| match keyword_hits.iter().find(|(hit, _)| hit == group) {
                Some((_, keyword)) => format!("{} via '{}'", group.name(), keyword),
                None => group.name().to_string(),
            })
            .collect();
        parts.push(format!("matched {}", groups.join(", ")));
    }

    for reason in &candidate.boost_reasons {
        parts.push(format!("boosted for {}", reason));
    }

    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Pattern;
    use rstest::rstest;
    use std::sync::Arc;

    fn candidate(name: &str, severity: Severity, confidence: f64) -> MatchCandidate {
        MatchCandidate {
            pattern: Arc::new(
                Pattern::new(name, severity).with_indicators([IndicatorGroup::Numeric]),
            ),
            confidence,
            raw_relevance: confidence,
            boost: 0.0,
            boost_reasons: Vec::new(),
            context_indicators: [IndicatorGroup::Numeric].into_iter().collect(),
            severity,
        }
    }

    fn planner(min_confidence: f64, apply_patterns: bool) -> GenerationPlanner {
        GenerationPlanner::new(PlanOptions {
            min_confidence,
            apply_patterns,
        })
        .unwrap()
    }

    #[rstest]
    #[case(Severity::Critical, 0.01, Decision::Applied)]
    #[case(Severity::Critical, 0.0, Decision::Applied)]
    #[case(Severity::High, 0.8, Decision::Applied)]
    #[case(Severity::High, 0.79, Decision::Suggested)]
    #[case(Severity::Medium, 0.95, Decision::Applied)]
    #[case(Severity::Medium, 0.5, Decision::Suggested)]
    #[case(Severity::Medium, 0.0, Decision::Ignored)]
    #[case(Severity::Low, 0.99, Decision::Suggested)]
    #[case(Severity::Low, 0.0, Decision::Ignored)]
    fn test_severity_policy(
        #[case] severity: Severity,
        #[case] confidence: f64,
        #[case] expected: Decision,
    ) {
        let (decision, _) = planner(0.8, true).decide(&candidate("p", severity, confidence));
        assert_eq!(decision, expected);
    }

    #[test]
    fn test_critical_low_confidence_applied_low_high_confidence_not() {
        let plan = planner(0.8, true).plan(
            "prompt",
            vec![
                candidate("must_fix", Severity::Critical, 0.01),
                candidate("style_nit", Severity::Low, 0.99),
            ],
        );

        assert_eq!(plan.applied_names(), vec!["must_fix"]);
        assert_eq!(plan.suggested_names(), vec!["style_nit"]);
    }

    #[test]
    fn test_apply_disabled_suggests_everything_with_signal() {
        let plan = planner(0.8, false).plan(
            "prompt",
            vec![
                candidate("crit", Severity::Critical, 0.9),
                candidate("generic", Severity::Critical, 0.0),
                candidate("med", Severity::Medium, 0.3),
            ],
        );

        assert!(plan.applied.is_empty());
        assert_eq!(plan.suggested_names(), vec!["crit", "med"]);
        assert_eq!(plan.rationale_for("generic").unwrap().decision, Decision::Ignored);
        assert!(!plan.metadata.apply_patterns);
    }

    #[test]
    fn test_partitions_keep_rank_order() {
        let plan = planner(0.5, true).plan(
            "prompt",
            vec![
                candidate("b", Severity::High, 0.9),
                candidate("a", Severity::High, 0.9),
                candidate("c", Severity::Critical, 0.9),
                candidate("d", Severity::Critical, 0.2),
            ],
        );

        assert_eq!(plan.applied_names(), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_rationale_records_matched_indicators() {
        let plan = planner(0.8, true).plan("numpy", vec![candidate("n", Severity::High, 1.0)]);
        let why = plan.rationale_for("n").unwrap();

        assert_eq!(why.decision, Decision::Applied);
        assert!(why.matched_indicators.contains(&IndicatorGroup::Numeric));
        assert!(why.reason.contains("matched numeric"));
    }

    #[test]
    fn test_rationale_names_the_triggering_keyword() {
        let plan = planner(0.8, true).plan(
            "Serialize the NumPy array to JSON",
            vec![candidate("n", Severity::High, 1.0)],
        );
        let why = plan.rationale_for("n").unwrap();

        assert!(why.reason.contains("matched numeric via 'numpy'"), "{}", why.reason);
    }

    #[test]
    fn test_rationale_without_keyword_keeps_group_name() {
        let plan = planner(0.8, true).plan("tidy up", vec![candidate("n", Severity::High, 1.0)]);
        let why = plan.rationale_for("n").unwrap();

        assert!(why.reason.ends_with("(matched numeric)"), "{}", why.reason);
    }

    #[test]
    fn test_metadata() {
        let at = Utc::now();
        let plan = planner(0.7, true).plan_at("process data", Vec::new(), at);

        assert!(plan.is_empty());
        assert_eq!(plan.metadata.prompt, "process data");
        assert_eq!(plan.metadata.min_confidence, 0.7);
        assert_eq!(plan.metadata.generated_at, at);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(GenerationPlanner::new(PlanOptions {
            min_confidence: 1.2,
            apply_patterns: true
        })
        .is_err());
    }
}
