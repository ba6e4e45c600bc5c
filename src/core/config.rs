/// Analysis configuration
///
/// Every tunable the analytics use, passed explicitly into each call. The
/// binary may load it from a TOML file; nothing in the analytics reads files
/// or environment variables.

use crate::core::occurrence::TimeWindow;
use crate::error::{PulseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIME_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_ALPHA: f64 = 0.3;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_RESAMPLE_COUNT: usize = 1000;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

// A century of history is more than any occurrence log holds
pub const MAX_TIME_WINDOW_DAYS: u32 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Length of the trailing analysis window
    pub time_window_days: u32,
    /// Exponential smoothing factor, (0, 1]
    pub alpha: f64,
    /// Confidence a high/medium pattern needs to be auto-applied
    pub min_confidence: f64,
    /// Bootstrap resamples per confidence interval
    pub resample_count: usize,
    /// Two-sided confidence level of the bootstrap interval, (0, 1)
    pub confidence_level: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            time_window_days: DEFAULT_TIME_WINDOW_DAYS,
            alpha: DEFAULT_ALPHA,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            resample_count: DEFAULT_RESAMPLE_COUNT,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AnalysisConfig =
            toml::from_str(contents).map_err(|e| PulseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_window_days == 0 || self.time_window_days > MAX_TIME_WINDOW_DAYS {
            return Err(PulseError::invalid(format!(
                "time_window_days must be in [1, {}], got {}",
                MAX_TIME_WINDOW_DAYS, self.time_window_days
            )));
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 || self.alpha > 1.0 {
            return Err(PulseError::invalid(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PulseError::invalid(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.resample_count == 0 {
            return Err(PulseError::invalid("resample_count must be at least 1"));
        }
        if !self.confidence_level.is_finite()
            || self.confidence_level <= 0.0
            || self.confidence_level >= 1.0
        {
            return Err(PulseError::invalid(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }

    /// The trailing analysis window ending at `end`
    pub fn window_ending_at(&self, end: DateTime<Utc>) -> Result<TimeWindow> {
        TimeWindow::trailing_days(end, self.time_window_days)
    }
}
