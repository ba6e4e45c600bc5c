/// Effectiveness scoring
///
/// Answers "is this pattern still preventing issues?" by comparing the
/// occurrence rate in the first half of the analysis window with the second
/// half. Sparse data never errors out: it maps to a defined fallback result.

use crate::core::{AnalysisConfig, TimeWindow};
use crate::error::{PulseError, Result};
use crate::intelligence::bootstrap::{BootstrapEstimator, ConfidenceInterval};
use crate::intelligence::significance::{split_halves, SignificanceTester};
use crate::intelligence::trend::{DailyCounts, RateSeries, TrendEstimator};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

// Policy constants. Preserved for compatibility, tunable rather than derived.
pub const MIN_OCCURRENCES_FOR_TREND: u64 = 2;
pub const MIN_OCCURRENCES_FOR_STATISTICS: u64 = 4;
pub const IMPROVING_THRESHOLD: f64 = 0.2;
pub const WORSENING_THRESHOLD: f64 = -0.2;
pub const INSUFFICIENT_DATA_SCORE: f64 = 0.5;

/// Direction of a pattern's occurrence rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
    InsufficientData,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Worsening => "worsening",
            Trend::InsufficientData => "insufficient_data",
        };
        f.pad(s)
    }
}

/// Score, trend label and diagnostics for one pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessResult {
    pub pattern_name: String,
    /// In [0, 1]; 1 means occurrences stopped, 0 means they started
    pub score: f64,
    pub trend: Trend,
    pub total_occurrences: u64,
    /// Mean occurrences per day over the first half of the series
    pub first_half_rate: f64,
    pub second_half_rate: f64,
    pub reduction_ratio: f64,
    pub confidence_interval: ConfidenceInterval,
    pub statistically_significant: bool,
    /// Absent when the series is too short to test
    pub p_value: Option<f64>,
    pub smoothed_series: Vec<f64>,
    pub daily_counts: Vec<u64>,
}

/// Pure formulas shared by the scorer and the bootstrap
pub struct Scorer;

impl Scorer {
    /// Mean per-day count over each half of the series
    pub fn half_rates(counts: &[u64]) -> (f64, f64) {
        let (first, second) = split_halves(counts);
        (Self::mean(first), Self::mean(second))
    }

    /// Relative drop from the first-half rate to the second-half rate
    ///
    /// Division by a zero first-half rate never happens: no activity at all is
    /// "no change" (0) and activity appearing from nothing is maximal
    /// worsening (-1).
    pub fn reduction_ratio(first_half_rate: f64, second_half_rate: f64) -> f64 {
        if first_half_rate > 0.0 {
            (first_half_rate - second_half_rate) / first_half_rate
        } else if second_half_rate > 0.0 {
            -1.0
        } else {
            0.0
        }
    }

    /// Map a reduction ratio onto [0, 1]
    pub fn score_from_ratio(reduction_ratio: f64) -> f64 {
        ((reduction_ratio + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    pub fn classify_trend(reduction_ratio: f64) -> Trend {
        if reduction_ratio > IMPROVING_THRESHOLD {
            Trend::Improving
        } else if reduction_ratio < WORSENING_THRESHOLD {
            Trend::Worsening
        } else {
            Trend::Stable
        }
    }

    /// Score a raw day-count series in one go
    pub fn score_counts(counts: &[u64]) -> f64 {
        let (first, second) = Self::half_rates(counts);
        Self::score_from_ratio(Self::reduction_ratio(first, second))
    }

    fn mean(values: &[u64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<u64>() as f64 / values.len() as f64
    }
}

/// Combines trend estimation, significance testing and the bootstrap
/// into one [`EffectivenessResult`] per pattern
pub struct EffectivenessScorer {
    trend: TrendEstimator,
    bootstrap: BootstrapEstimator,
}

impl EffectivenessScorer {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            trend: TrendEstimator::new(config.alpha)?,
            bootstrap: BootstrapEstimator::new(config.resample_count, config.confidence_level)?,
        })
    }

    /// Score a pattern from its raw occurrence timestamps
    ///
    /// # Arguments
    /// * `pattern_name` - Must not be blank
    /// * `timestamps` - Any order, duplicates allowed, out-of-window entries ignored
    /// * `window` - Analysis window
    /// * `rng` - Random source for the bootstrap; score and trend never depend on it
    pub fn score<R: Rng + ?Sized>(
        &self,
        pattern_name: &str,
        timestamps: &[DateTime<Utc>],
        window: &TimeWindow,
        rng: &mut R,
    ) -> Result<EffectivenessResult> {
        Self::validate_name(pattern_name)?;
        let series = self.trend.estimate(timestamps, window);
        Ok(self.score_series(pattern_name, series, rng))
    }

    /// Score a series the caller bucketed by day already
    pub fn score_daily_counts<R: Rng + ?Sized>(
        &self,
        pattern_name: &str,
        start_day: NaiveDate,
        counts: &[i64],
        rng: &mut R,
    ) -> Result<EffectivenessResult> {
        Self::validate_name(pattern_name)?;
        let daily = DailyCounts::from_counts(start_day, counts)?;
        let series = self.trend.smooth_counts(daily);
        Ok(self.score_series(pattern_name, series, rng))
    }

    fn validate_name(pattern_name: &str) -> Result<()> {
        if pattern_name.trim().is_empty() {
            return Err(PulseError::invalid("pattern name must not be empty"));
        }
        Ok(())
    }

    fn score_series<R: Rng + ?Sized>(
        &self,
        pattern_name: &str,
        series: RateSeries,
        rng: &mut R,
    ) -> EffectivenessResult {
        let counts = series.daily.counts();
        let total_occurrences = series.daily.total();
        let (first_half_rate, second_half_rate) = Scorer::half_rates(counts);

        if total_occurrences < MIN_OCCURRENCES_FOR_TREND {
            debug!(
                pattern = pattern_name,
                total_occurrences, "not enough occurrences for a trend"
            );
            return EffectivenessResult {
                pattern_name: pattern_name.to_string(),
                score: INSUFFICIENT_DATA_SCORE,
                trend: Trend::InsufficientData,
                total_occurrences,
                first_half_rate,
                second_half_rate,
                reduction_ratio: 0.0,
                confidence_interval: ConfidenceInterval::UNINFORMATIVE,
                statistically_significant: false,
                p_value: None,
                smoothed_series: series.smoothed,
                daily_counts: counts.to_vec(),
            };
        }

        let reduction_ratio = Scorer::reduction_ratio(first_half_rate, second_half_rate);
        let score = Scorer::score_from_ratio(reduction_ratio);
        let trend = Scorer::classify_trend(reduction_ratio);

        let (confidence_interval, significance) =
            if total_occurrences >= MIN_OCCURRENCES_FOR_STATISTICS {
                (
                    self.bootstrap.estimate(counts, rng),
                    SignificanceTester::test(counts),
                )
            } else {
                (ConfidenceInterval::UNINFORMATIVE, None)
            };

        let p_value = significance.map(|s| s.p_value);
        let statistically_significant = significance.is_some_and(|s| s.is_significant());

        debug!(
            pattern = pattern_name,
            score,
            %trend,
            first_half_rate,
            second_half_rate,
            ?p_value,
            "scored pattern"
        );

        EffectivenessResult {
            pattern_name: pattern_name.to_string(),
            score,
            trend,
            total_occurrences,
            first_half_rate,
            second_half_rate,
            reduction_ratio,
            confidence_interval,
            statistically_significant,
            p_value,
            smoothed_series: series.smoothed,
            daily_counts: counts.to_vec(),
        }
    }
}
