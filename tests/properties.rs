use chrono::NaiveDate;
use pattern_pulse_lib::core::{AnalysisConfig, IndicatorGroup, Pattern, PatternLibrary, Severity};
use pattern_pulse_lib::intelligence::{
    BootstrapEstimator, EffectivenessContext, EffectivenessScorer, PatternMatcher, Trend,
    TrendEstimator,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn scorer() -> EffectivenessScorer {
    let config = AnalysisConfig {
        resample_count: 100,
        ..AnalysisConfig::default()
    };
    EffectivenessScorer::new(&config).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

proptest! {
    #[test]
    fn score_and_interval_stay_in_unit_range(
        counts in prop::collection::vec(0i64..20, 0..40),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let result = scorer().score_daily_counts("p", day(), &counts, &mut rng).unwrap();

        prop_assert!((0.0..=1.0).contains(&result.score));
        prop_assert!(result.confidence_interval.lower >= 0.0);
        prop_assert!(result.confidence_interval.upper <= 1.0);
        prop_assert!(result.confidence_interval.lower <= result.confidence_interval.upper);
        prop_assert!(result.reduction_ratio.is_finite());
        if let Some(p) = result.p_value {
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn fewer_than_two_occurrences_is_insufficient(
        len in 1usize..30,
        position in any::<prop::sample::Index>(),
        single in 0i64..2,
    ) {
        let mut counts = vec![0i64; len];
        counts[position.index(len)] = single;

        let mut rng = StdRng::seed_from_u64(0);
        let result = scorer().score_daily_counts("p", day(), &counts, &mut rng).unwrap();

        prop_assert_eq!(result.trend, Trend::InsufficientData);
        prop_assert_eq!(result.score, 0.5);
    }

    #[test]
    fn stopping_completely_scores_one(first in prop::collection::vec(1i64..10, 2..15)) {
        let mut counts = first.clone();
        counts.extend(std::iter::repeat(0).take(first.len()));

        let mut rng = StdRng::seed_from_u64(0);
        let result = scorer().score_daily_counts("p", day(), &counts, &mut rng).unwrap();

        prop_assert_eq!(result.score, 1.0);
        prop_assert_eq!(result.trend, Trend::Improving);
    }

    #[test]
    fn starting_from_nothing_scores_zero(second in prop::collection::vec(1i64..10, 2..15)) {
        let mut counts = vec![0i64; second.len()];
        counts.extend(second.iter().copied());

        let mut rng = StdRng::seed_from_u64(0);
        let result = scorer().score_daily_counts("p", day(), &counts, &mut rng).unwrap();

        prop_assert_eq!(result.score, 0.0);
        prop_assert_eq!(result.trend, Trend::Worsening);
    }

    #[test]
    fn smoothing_is_repeatable(
        counts in prop::collection::vec(0u64..50, 0..60),
        alpha in 0.01f64..=1.0,
    ) {
        let estimator = TrendEstimator::new(alpha).unwrap();
        let daily = pattern_pulse_lib::intelligence::DailyCounts::from_counts(
            day(),
            &counts.iter().map(|&c| c as i64).collect::<Vec<_>>(),
        )
        .unwrap();

        let a = estimator.smooth_counts(daily.clone());
        let b = estimator.smooth_counts(daily);
        prop_assert_eq!(a.smoothed, b.smoothed);
    }

    #[test]
    fn bootstrap_repeats_under_same_seed(
        counts in prop::collection::vec(0u64..10, 4..30),
        seed in any::<u64>(),
    ) {
        let bootstrap = BootstrapEstimator::new(200, 0.95).unwrap();

        let a = bootstrap.estimate(&counts, &mut StdRng::seed_from_u64(seed));
        let b = bootstrap.estimate(&counts, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn unmatched_declared_groups_never_surface(request in "[a-z ]{0,60}") {
        let numeric_only = Pattern::new("numeric_only", Severity::Critical)
            .with_indicators([IndicatorGroup::Numeric]);
        let library = PatternLibrary::from_patterns(vec![numeric_only]).unwrap();

        let candidates =
            PatternMatcher::new().match_request(&request, &library, &EffectivenessContext::new());

        for candidate in candidates {
            prop_assert!(candidate.confidence > 0.0);
            prop_assert!(!candidate.context_indicators.is_empty());
        }
    }
}
