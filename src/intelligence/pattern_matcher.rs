// Decides which library patterns are relevant to a generation request
//
// Relevance is the share of a pattern's declared indicator groups that show up
// in the request. Patterns that are currently getting worse, or that keep
// recurring, get a small bump so they surface ahead of equally relevant ones.

use crate::core::{IndicatorGroup, Pattern, PatternLibrary, Severity};
use crate::intelligence::context_detector::{ContextDetector, IndicatorExtractor};
use crate::intelligence::scorer::{EffectivenessResult, Trend};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

// Boost caps. The combined boost never exceeds MAX_BOOST.
pub const WORSENING_BOOST: f64 = 0.15;
pub const FREQUENCY_BOOST: f64 = 0.10;
pub const MAX_BOOST: f64 = 0.15;

// Occurrences in the analysis window that count as "keeps recurring"
pub const HIGH_FREQUENCY_THRESHOLD: u64 = 10;

/// What the scorer last said about a pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatternHealth {
    pub trend: Trend,
    pub recent_occurrences: u64,
}

/// Effectiveness snapshot the matcher ranks against
#[derive(Debug, Clone, Default)]
pub struct EffectivenessContext {
    health: HashMap<String, PatternHealth>,
}

impl EffectivenessContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results(results: &[EffectivenessResult]) -> Self {
        let health = results
            .iter()
            .map(|r| {
                (
                    r.pattern_name.clone(),
                    PatternHealth {
                        trend: r.trend,
                        recent_occurrences: r.total_occurrences,
                    },
                )
            })
            .collect();
        Self { health }
    }

    pub fn insert(&mut self, pattern_name: impl Into<String>, health: PatternHealth) {
        self.health.insert(pattern_name.into(), health);
    }

    pub fn get(&self, pattern_name: &str) -> Option<&PatternHealth> {
        self.health.get(pattern_name)
    }
}

/// Why a candidate's confidence was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostReason {
    WorseningTrend,
    HighFrequency,
}

impl std::fmt::Display for BoostReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoostReason::WorseningTrend => write!(f, "worsening trend"),
            BoostReason::HighFrequency => write!(f, "high recent frequency"),
        }
    }
}

/// One (request, pattern) pairing
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub pattern: Arc<Pattern>,
    /// Final confidence in [0, 1]
    pub confidence: f64,
    /// Share of declared groups found in the request, before boosting
    pub raw_relevance: f64,
    pub boost: f64,
    pub boost_reasons: Vec<BoostReason>,
    /// Declared groups that matched
    pub context_indicators: BTreeSet<IndicatorGroup>,
    pub severity: Severity,
}

impl MatchCandidate {
    pub fn name(&self) -> &str {
        &self.pattern.name
    }
}

/// Confidence desc, then severity desc, then name asc
pub fn rank_order(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.severity.cmp(&a.severity))
        .then_with(|| a.name().cmp(b.name()))
}

pub struct PatternMatcher {
    extractor: Box<dyn IndicatorExtractor>,
}

impl PatternMatcher {
    /// Matcher backed by the keyword table
    pub fn new() -> Self {
        Self::with_extractor(Box::new(ContextDetector::new()))
    }

    pub fn with_extractor(extractor: Box<dyn IndicatorExtractor>) -> Self {
        Self { extractor }
    }

    /// Candidates for `request`, best first
    ///
    /// A pattern that declares groups but matches none of them is left out
    /// entirely. Generic patterns (no declared groups) are always candidates.
    pub fn match_request(
        &self,
        request: &str,
        library: &PatternLibrary,
        context: &EffectivenessContext,
    ) -> Vec<MatchCandidate> {
        let found = self.extractor.extract(request);
        debug!(indicators = ?found, "extracted request indicators");

        let mut candidates: Vec<MatchCandidate> = library
            .iter()
            .filter_map(|pattern| self.evaluate(pattern, &found, context))
            .collect();

        candidates.sort_by(rank_order);
        candidates
    }

    fn evaluate(
        &self,
        pattern: &Arc<Pattern>,
        found: &BTreeSet<IndicatorGroup>,
        context: &EffectivenessContext,
    ) -> Option<MatchCandidate> {
        let matched: BTreeSet<IndicatorGroup> = pattern
            .indicator_groups
            .intersection(found)
            .copied()
            .collect();

        let raw_relevance = if pattern.is_generic() {
            0.0
        } else if matched.is_empty() {
            debug!(pattern = %pattern.name, "no declared indicator matched");
            return None;
        } else {
            matched.len() as f64 / pattern.indicator_groups.len() as f64
        };

        let (boost, boost_reasons) = Self::boost_for(pattern, context);
        let confidence = (raw_relevance + boost).clamp(0.0, 1.0);

        Some(MatchCandidate {
            pattern: Arc::clone(pattern),
            confidence,
            raw_relevance,
            boost,
            boost_reasons,
            context_indicators: matched,
            severity: pattern.severity,
        })
    }

    /// Extra confidence for patterns that need reinforcement
    fn boost_for(pattern: &Pattern, context: &EffectivenessContext) -> (f64, Vec<BoostReason>) {
        let health = context.get(&pattern.name);
        let mut reasons = Vec::new();
        let mut boost = 0.0;

        if health.is_some_and(|h| h.trend == Trend::Worsening) {
            boost += WORSENING_BOOST;
            reasons.push(BoostReason::WorseningTrend);
        }

        // fall back to the library's persisted frequency when nothing was scored
        let frequency = health
            .map(|h| h.recent_occurrences)
            .unwrap_or(u64::from(pattern.occurrence_frequency));
        if frequency >= HIGH_FREQUENCY_THRESHOLD {
            boost += FREQUENCY_BOOST;
            reasons.push(BoostReason::HighFrequency);
        }

        (f64::min(boost, MAX_BOOST), reasons)
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}
