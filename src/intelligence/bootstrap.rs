/// Bootstrap confidence intervals for the effectiveness score
///
/// Resamples the day-count list with replacement, rescores every resample
/// with the same formula the scorer uses, and reads the interval off the
/// percentiles of the resulting distribution. The random source is passed in
/// so a seeded generator gives exact, repeatable bounds.

use crate::error::{PulseError, Result};
use crate::intelligence::scorer::Scorer;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fewer days than this and the interval is left maximally wide
pub const MIN_BOOTSTRAP_DAYS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// `(0.0, 1.0)`, returned whenever there is too little data
    pub const UNINFORMATIVE: ConfidenceInterval = ConfidenceInterval {
        lower: 0.0,
        upper: 1.0,
    };

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

pub struct BootstrapEstimator {
    resample_count: usize,
    confidence_level: f64,
}

impl BootstrapEstimator {
    pub fn new(resample_count: usize, confidence_level: f64) -> Result<Self> {
        if resample_count == 0 {
            return Err(PulseError::invalid("resample_count must be at least 1"));
        }
        if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
            return Err(PulseError::invalid(format!(
                "confidence_level must be in (0, 1), got {}",
                confidence_level
            )));
        }

        Ok(Self {
            resample_count,
            confidence_level,
        })
    }

    pub fn resample_count(&self) -> usize {
        self.resample_count
    }

    /// Interval around the score of `counts`
    pub fn estimate<R: Rng + ?Sized>(&self, counts: &[u64], rng: &mut R) -> ConfidenceInterval {
        let n = counts.len();
        if n < MIN_BOOTSTRAP_DAYS {
            return ConfidenceInterval::UNINFORMATIVE;
        }

        let mut resample = vec![0u64; n];
        let mut scores = Vec::with_capacity(self.resample_count);

        for _ in 0..self.resample_count {
            for slot in resample.iter_mut() {
                *slot = counts[rng.gen_range(0..n)];
            }
            scores.push(Scorer::score_counts(&resample));
        }

        scores.sort_by(|a, b| a.total_cmp(b));

        let tail = (1.0 - self.confidence_level) / 2.0;
        let lower = percentile(&scores, tail).clamp(0.0, 1.0);
        let upper = percentile(&scores, 1.0 - tail).clamp(0.0, 1.0);

        ConfidenceInterval { lower, upper }
    }
}

/// Linear interpolation between order statistics. `sorted` must be non-empty.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;

    sorted[below] + (sorted[above] - sorted[below]) * fraction
}
