/// Main analyzer orchestrator
///
/// Pulls occurrences and a library snapshot out of the store, runs the
/// scorer over them and feeds the results to the matcher and planner.
/// Everything below this layer is pure; all I/O happens here.

use crate::core::{AnalysisConfig, PatternLibrary, Retriever, TimeWindow};
use crate::db::Database;
use crate::error::{PulseError, Result};
use crate::intelligence::pattern_matcher::{EffectivenessContext, PatternMatcher};
use crate::intelligence::planner::{GenerationPlan, GenerationPlanner, PlanOptions};
use crate::intelligence::scorer::{EffectivenessResult, EffectivenessScorer, Trend};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Analyzer {
    db: Arc<Database>,
    retriever: Retriever,
    config: AnalysisConfig,
    scorer: EffectivenessScorer,
    matcher: PatternMatcher,
}

impl Analyzer {
    pub fn new(db: Arc<Database>, config: AnalysisConfig) -> Result<Self> {
        let scorer = EffectivenessScorer::new(&config)?;
        let retriever = Retriever::new(Arc::clone(&db));

        Ok(Self {
            db,
            retriever,
            config,
            scorer,
            matcher: PatternMatcher::new(),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fresh library snapshot from the store
    pub async fn load_library(&self) -> Result<PatternLibrary> {
        self.retriever.library_snapshot().await
    }

    /// Score one pattern over the window ending at `now`
    ///
    /// Works for any name with logged occurrences, whether or not it is
    /// in the library.
    pub async fn analyze_pattern<R: Rng + ?Sized>(
        &self,
        pattern_name: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<EffectivenessResult> {
        let window = self.config.window_ending_at(now)?;
        self.score_in_window(pattern_name, &window, rng).await
    }

    /// Score every library pattern and persist the scores
    pub async fn analyze_all<R: Rng + ?Sized>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<AnalysisReport> {
        let window = self.config.window_ending_at(now)?;
        let library = self.load_library().await?;

        let mut results = Vec::with_capacity(library.len());
        for pattern in library.iter() {
            let result = self.score_in_window(&pattern.name, &window, rng).await?;
            self.db
                .record_effectiveness(&result.pattern_name, result.score, result.total_occurrences)
                .await?;
            results.push(result);
        }

        let report = AnalysisReport::new(window, results, now);
        info!(
            patterns = report.results.len(),
            improving = report.count(Trend::Improving),
            worsening = report.count(Trend::Worsening),
            "analysis complete"
        );

        Ok(report)
    }

    /// Build a generation plan for `prompt`
    ///
    /// Scores are recomputed for the call and not written back.
    pub async fn plan<R: Rng + ?Sized>(
        &self,
        prompt: &str,
        options: PlanOptions,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GenerationPlan> {
        if prompt.trim().is_empty() {
            return Err(PulseError::invalid("request text must not be empty"));
        }
        let planner = GenerationPlanner::new(options)?;

        let window = self.config.window_ending_at(now)?;
        let library = self.load_library().await?;

        let mut results = Vec::with_capacity(library.len());
        for pattern in library.iter() {
            results.push(self.score_in_window(&pattern.name, &window, rng).await?);
        }
        let context = EffectivenessContext::from_results(&results);

        let candidates = self.matcher.match_request(prompt, &library, &context);
        debug!(candidates = candidates.len(), "matched request against library");

        let plan = planner.plan_at(prompt, candidates, now);
        info!(
            applied = plan.applied.len(),
            suggested = plan.suggested.len(),
            "generation plan ready"
        );

        Ok(plan)
    }

    async fn score_in_window<R: Rng + ?Sized>(
        &self,
        pattern_name: &str,
        window: &TimeWindow,
        rng: &mut R,
    ) -> Result<EffectivenessResult> {
        let timestamps = self
            .retriever
            .occurrence_timestamps(pattern_name, window)
            .await?;
        self.scorer.score(pattern_name, &timestamps, window, rng)
    }
}

/// Analysis report
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub window: TimeWindow,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<EffectivenessResult>,
}

impl AnalysisReport {
    fn new(
        window: TimeWindow,
        results: Vec<EffectivenessResult>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            window,
            generated_at,
            results,
        }
    }

    pub fn count(&self, trend: Trend) -> usize {
        self.results.iter().filter(|r| r.trend == trend).count()
    }

    pub fn result_for(&self, pattern_name: &str) -> Option<&EffectivenessResult> {
        self.results.iter().find(|r| r.pattern_name == pattern_name)
    }
}
