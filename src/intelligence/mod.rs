/// Intelligence module
///
/// Effectiveness analytics (trend, significance, bootstrap, scorer) and
/// generation matching (context detection, matcher, planner).

pub mod analyzer;
pub mod bootstrap;
pub mod context_detector;
pub mod pattern_matcher;
pub mod planner;
pub mod scorer;
pub mod significance;
pub mod trend;

pub use analyzer::{AnalysisReport, Analyzer};
pub use bootstrap::{BootstrapEstimator, ConfidenceInterval};
pub use context_detector::{ContextDetector, IndicatorExtractor};
pub use pattern_matcher::{
    BoostReason, EffectivenessContext, MatchCandidate, PatternHealth, PatternMatcher,
};
pub use planner::{Decision, GenerationPlan, GenerationPlanner, PlanOptions, Rationale};
pub use scorer::{EffectivenessResult, EffectivenessScorer, Scorer, Trend};
pub use significance::{SignificanceResult, SignificanceTester};
pub use trend::{DailyCounts, RateSeries, TrendEstimator};
