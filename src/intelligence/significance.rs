/// Significance testing for early-vs-late occurrence rates
///
/// Runs a Mann–Whitney U test on the day counts of the first half of a series
/// against the second half. The middle day of an odd-length series belongs to
/// the second half. Sample sizes are days, not occurrences, so the normal
/// approximation is used throughout.

use serde::Serialize;

/// Fewer days than this and the tester refuses to produce a p-value
pub const MIN_SIGNIFICANCE_DAYS: usize = 4;

/// p-values strictly below this are significant
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Outcome of one Mann–Whitney comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignificanceResult {
    pub u_first: f64,
    pub u_second: f64,
    pub z_score: f64,
    /// Two-tailed, always in [0, 1]
    pub p_value: f64,
}

impl SignificanceResult {
    pub fn is_significant(&self) -> bool {
        self.p_value < SIGNIFICANCE_LEVEL
    }
}

/// Split point used by every half-vs-half computation in the crate
pub fn split_halves<T>(series: &[T]) -> (&[T], &[T]) {
    series.split_at(series.len() / 2)
}

pub struct SignificanceTester;

impl SignificanceTester {
    /// Compare the halves of `counts`
    ///
    /// # Returns
    /// * `None` - fewer than [`MIN_SIGNIFICANCE_DAYS`] days, not computable
    /// * `Some(result)` - U statistics, z-score and two-tailed p-value
    pub fn test(counts: &[u64]) -> Option<SignificanceResult> {
        if counts.len() < MIN_SIGNIFICANCE_DAYS {
            return None;
        }

        let (first, second) = split_halves(counts);
        let n1 = first.len() as f64;
        let n2 = second.len() as f64;
        let n = n1 + n2;

        let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        let (ranks, tie_term) = average_ranks(&values);

        let rank_sum_first: f64 = ranks[..first.len()].iter().sum();
        let u_first = rank_sum_first - n1 * (n1 + 1.0) / 2.0;
        let u_second = n1 * n2 - u_first;

        let mean_u = n1 * n2 / 2.0;
        let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));

        // every day has the same count: no evidence of a difference
        if variance <= 1e-12 {
            return Some(SignificanceResult {
                u_first,
                u_second,
                z_score: 0.0,
                p_value: 1.0,
            });
        }

        let z_score = (u_first - mean_u) / variance.sqrt();
        let p_value = (2.0 * standard_normal_upper_tail(z_score.abs())).clamp(0.0, 1.0);

        Some(SignificanceResult {
            u_first,
            u_second,
            z_score,
            p_value,
        })
    }
}

/// 1-based ranks with ties averaged, plus the tie correction term Σ(t³ - t)
fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;

    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }

        // positions i..=j share ranks i+1 ..= j+1
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }

        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        i = j + 1;
    }

    (ranks, tie_term)
}

/// Standard normal CDF, Φ(x)
pub fn standard_normal_cdf(x: f64) -> f64 {
    1.0 - standard_normal_upper_tail(x)
}

/// Upper tail probability P(Z > x).
/// Abramowitz & Stegun 26.2.17, absolute error below 7.5e-8.
fn standard_normal_upper_tail(x: f64) -> f64 {
    if x < 0.0 {
        return 1.0 - standard_normal_upper_tail(-x);
    }
    if x > 8.0 {
        return 0.0;
    }

    let t = 1.0 / (1.0 + 0.2316419 * x);
    let poly = t * (0.319381530
        + t * (-0.356563782 + t * (1.781477937 + t * (-1.821255978 + t * 1.330274429))));
    let pdf = (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt();
    pdf * poly
}
