// Turns occurrence timestamps into a per-day count series and smooths it
//
// The series starts on the UTC day of the first in-window occurrence and runs
// through the UTC day the window ends on. Every day in between gets an entry,
// zero included, so the back half of the series shows the quiet days too.

use crate::core::TimeWindow;
use crate::error::{PulseError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Zero-filled occurrence counts, one per UTC calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCounts {
    start_day: Option<NaiveDate>,
    counts: Vec<u64>,
}

impl DailyCounts {
    pub fn empty() -> Self {
        Self {
            start_day: None,
            counts: Vec::new(),
        }
    }

    /// Bucket timestamps into days. The series runs from the day of the
    /// earliest in-window occurrence through the window's last day.
    /// Out-of-window entries are dropped; repeated timestamps are separate
    /// occurrences.
    pub fn from_timestamps(timestamps: &[DateTime<Utc>], window: &TimeWindow) -> Self {
        let days: Vec<NaiveDate> = timestamps
            .iter()
            .filter(|ts| window.contains(**ts))
            .map(|ts| ts.date_naive())
            .collect();

        let Some(first_day) = days.iter().min().copied() else {
            return Self::empty();
        };

        let span = (window.end_day() - first_day).num_days() as usize + 1;
        let mut counts = vec![0u64; span];
        for day in days {
            counts[(day - first_day).num_days() as usize] += 1;
        }

        Self {
            start_day: Some(first_day),
            counts,
        }
    }

    /// Accept a series the caller already bucketed. Negative counts are rejected.
    pub fn from_counts(start_day: NaiveDate, counts: &[i64]) -> Result<Self> {
        let mut validated = Vec::with_capacity(counts.len());
        for (i, &count) in counts.iter().enumerate() {
            if count < 0 {
                return Err(PulseError::invalid(format!(
                    "negative occurrence count {} on day {}",
                    count, i
                )));
            }
            validated.push(count as u64);
        }

        if validated.is_empty() {
            return Ok(Self::empty());
        }

        Ok(Self {
            start_day: Some(start_day),
            counts: validated,
        })
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn start_day(&self) -> Option<NaiveDate> {
        self.start_day
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(day, count)` pairs in order
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        let start = self.start_day;
        self.counts.iter().enumerate().filter_map(move |(i, &count)| {
            start.map(|day| (day + Duration::days(i as i64), count))
        })
    }
}

/// Smoothed view of a day series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSeries {
    pub daily: DailyCounts,
    pub smoothed: Vec<f64>,
}

impl RateSeries {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }
}

/// Exponential smoothing over day counts
pub struct TrendEstimator {
    alpha: f64,
}

impl TrendEstimator {
    pub fn new(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 || alpha > 1.0 {
            return Err(PulseError::invalid(format!("alpha must be in (0, 1], got {}", alpha)));
        }
        Ok(Self { alpha })
    }

    pub fn estimate(&self, timestamps: &[DateTime<Utc>], window: &TimeWindow) -> RateSeries {
        self.smooth_counts(DailyCounts::from_timestamps(timestamps, window))
    }

    pub fn smooth_counts(&self, daily: DailyCounts) -> RateSeries {
        let smoothed = exponential_smoothing(daily.counts(), self.alpha);
        RateSeries { daily, smoothed }
    }
}

/// `s[0] = c[0]`, `s[i] = alpha * c[i] + (1 - alpha) * s[i-1]`
pub fn exponential_smoothing(counts: &[u64], alpha: f64) -> Vec<f64> {
    let mut smoothed = Vec::with_capacity(counts.len());

    for (i, &count) in counts.iter().enumerate() {
        let value = count as f64;
        if i == 0 {
            smoothed.push(value);
        } else {
            let prev = smoothed[i - 1];
            smoothed.push(alpha * value + (1.0 - alpha) * prev);
        }
    }

    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn window(first: u32, last: u32) -> TimeWindow {
        TimeWindow::new(at(first, 0), Utc.with_ymd_and_hms(2024, 1, last, 23, 59, 59).unwrap())
            .unwrap()
    }

    #[test]
    fn test_gaps_are_zero_filled_through_window_end() {
        let stamps = vec![at(2, 9), at(2, 17), at(4, 8)];
        let daily = DailyCounts::from_timestamps(&stamps, &window(1, 6));

        assert_eq!(daily.start_day(), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(daily.counts(), &[2, 0, 1, 0, 0]);
        assert_eq!(daily.total(), 3);
    }

    #[test]
    fn test_out_of_window_and_duplicates() {
        let stamps = vec![at(1, 0), at(3, 10), at(3, 10), at(20, 0)];
        let daily = DailyCounts::from_timestamps(&stamps, &window(2, 5));

        // day 1 and day 20 fall outside, the duplicate counts twice
        assert_eq!(daily.counts(), &[2, 0, 0]);
    }

    #[test]
    fn test_unsorted_input() {
        let stamps = vec![at(5, 0), at(2, 0), at(4, 0)];
        let daily = DailyCounts::from_timestamps(&stamps, &window(1, 5));
        assert_eq!(daily.counts(), &[1, 0, 1, 1]);
    }

    #[test]
    fn test_no_occurrences_gives_empty_series() {
        let estimator = TrendEstimator::new(0.3).unwrap();
        let series = estimator.estimate(&[], &window(1, 30));

        assert!(series.is_empty());
        assert!(series.smoothed.is_empty());
    }

    #[test]
    fn test_mid_window_occurrence_starts_the_series() {
        // day 4 of a 10-day window: days 4..=10 remain
        let daily = DailyCounts::from_timestamps(&[at(4, 15)], &window(1, 10));

        assert_eq!(daily.len(), 7);
        assert_eq!(daily.start_day(), NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(daily.counts(), &[1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_single_occurrence_on_last_day() {
        let estimator = TrendEstimator::new(0.3).unwrap();
        let series = estimator.estimate(&[at(30, 12)], &window(1, 30));

        assert_eq!(series.daily.counts(), &[1]);
        assert_eq!(series.smoothed, vec![1.0]);
    }

    #[test]
    fn test_smoothing_values() {
        let smoothed = exponential_smoothing(&[10, 0, 0], 0.5);
        assert_eq!(smoothed, vec![10.0, 5.0, 2.5]);

        // alpha = 1 reproduces the raw counts
        assert_eq!(exponential_smoothing(&[3, 1, 4], 1.0), vec![3.0, 1.0, 4.0]);
    }

    #[test]
    fn test_smoothing_is_repeatable() {
        let estimator = TrendEstimator::new(0.3).unwrap();
        let stamps: Vec<_> = (1..=20).map(|d| at(d, (d * 7) % 24)).collect();

        let a = estimator.estimate(&stamps, &window(1, 25));
        let b = estimator.estimate(&stamps, &window(1, 25));

        let bits = |s: &RateSeries| s.smoothed.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(TrendEstimator::new(0.0).is_err());
        assert!(TrendEstimator::new(1.01).is_err());
        assert!(TrendEstimator::new(f64::NAN).is_err());
        assert!(TrendEstimator::new(1.0).is_ok());
    }

    #[test]
    fn test_from_counts_rejects_negative() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            DailyCounts::from_counts(day, &[1, -2, 3]),
            Err(PulseError::InvalidInput(_))
        ));

        let daily = DailyCounts::from_counts(day, &[1, 0, 3]).unwrap();
        let days: Vec<_> = daily.days().collect();
        assert_eq!(days[2], (NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), 3));
    }
}
