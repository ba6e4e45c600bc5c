// End-to-end scenarios through the public API: pure engine first, then the
// store-backed analyzer on an on-disk database.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pattern_pulse_lib::core::{
    AnalysisConfig, BugReport, IndicatorGroup, MetricRecord, Pattern, PatternLibrary, Recorder,
    Severity, TimeWindow,
};
use pattern_pulse_lib::intelligence::{
    Analyzer, Decision, EffectivenessContext, EffectivenessScorer, GenerationPlanner,
    PatternMatcher, PlanOptions, Trend,
};
use pattern_pulse_lib::Database;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn window_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 23, 59, 59).unwrap()
}

fn scorer() -> EffectivenessScorer {
    EffectivenessScorer::new(&AnalysisConfig::default()).unwrap()
}

fn numpy_and_tempfile_library() -> PatternLibrary {
    PatternLibrary::from_patterns(vec![
        Pattern::new("numpy_json_serialization", Severity::High)
            .with_indicators([IndicatorGroup::Numeric])
            .with_examples("json.dumps(arr)", "json.dumps(arr.tolist())"),
        Pattern::new("temp_file_handling", Severity::High)
            .with_indicators([IndicatorGroup::FileIo])
            .with_examples("open('/tmp/out')", "tempfile.NamedTemporaryFile()"),
    ])
    .unwrap()
}

#[test]
fn test_occurrences_stop_halfway() {
    // Days 1-5 at five a day inside a ten-day window, then silence
    let window = TimeWindow::new(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(), window_end())
        .unwrap();
    let timestamps: Vec<DateTime<Utc>> = (0..5)
        .flat_map(|day| {
            (0..5).map(move |i| {
                Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
                    + Duration::days(day)
                    + Duration::minutes(i * 10)
            })
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(2024);
    let result = scorer()
        .score("temp_file_handling", &timestamps, &window, &mut rng)
        .unwrap();

    assert_eq!(result.daily_counts, vec![5, 5, 5, 5, 5, 0, 0, 0, 0, 0]);
    assert_eq!(result.first_half_rate, 5.0);
    assert_eq!(result.second_half_rate, 0.0);
    assert_eq!(result.reduction_ratio, 1.0);
    assert_eq!(result.score, 1.0);
    assert_eq!(result.trend, Trend::Improving);
    assert!(result.statistically_significant);
    assert!(result.p_value.unwrap() < 0.01);
}

#[test]
fn test_same_series_from_day_counts() {
    let mut rng = StdRng::seed_from_u64(2024);
    let result = scorer()
        .score_daily_counts(
            "temp_file_handling",
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            &[5, 5, 5, 5, 5, 0, 0, 0, 0, 0],
            &mut rng,
        )
        .unwrap();

    assert_eq!(result.score, 1.0);
    assert_eq!(result.trend, Trend::Improving);
}

#[test]
fn test_single_occurrence_is_insufficient() {
    let window = TimeWindow::trailing_days(window_end(), 30).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let result = scorer()
        .score(
            "numpy_json_serialization",
            &[window_end() - Duration::days(3)],
            &window,
            &mut rng,
        )
        .unwrap();

    assert_eq!(result.score, 0.5);
    assert_eq!(result.trend, Trend::InsufficientData);
    assert_eq!(result.total_occurrences, 1);
}

#[test]
fn test_numpy_request_plan() {
    let library = numpy_and_tempfile_library();

    let candidates = PatternMatcher::new().match_request(
        "process NumPy array to JSON",
        &library,
        &EffectivenessContext::new(),
    );
    let plan = GenerationPlanner::new(PlanOptions::default())
        .unwrap()
        .plan("process NumPy array to JSON", candidates);

    assert_eq!(plan.applied_names(), vec!["numpy_json_serialization"]);
    assert!(plan.suggested.is_empty());
    assert!(plan.rationale_for("temp_file_handling").is_none());

    let why = plan.rationale_for("numpy_json_serialization").unwrap();
    assert!(why.matched_indicators.contains(&IndicatorGroup::Numeric));
}

#[test]
fn test_invalid_inputs_rejected() {
    let mut rng = StdRng::seed_from_u64(1);
    let day = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

    assert!(scorer().score_daily_counts("p", day, &[1, -1, 2], &mut rng).is_err());
    assert!(scorer().score_daily_counts(" ", day, &[1, 2], &mut rng).is_err());
    assert!(TimeWindow::new(window_end(), window_end() - Duration::days(1)).is_err());
}

#[tokio::test]
async fn test_store_backed_round() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = Arc::new(Database::new(dir.path().join("metrics.db")).await.unwrap());

    let recorder = Recorder::new(db.clone()).strict();
    recorder
        .import_library(&numpy_and_tempfile_library())
        .await
        .unwrap();

    // temp file bugs pile up late in the window
    let now = window_end();
    for day in [1, 2, 2, 3, 3, 3] {
        recorder
            .record(&MetricRecord::Bug(BugReport {
                pattern_name: "temp_file_handling".to_string(),
                timestamp: now - Duration::days(day),
                title: Some("leftover tmp file".to_string()),
                file_path: None,
            }))
            .await
            .unwrap();
    }
    recorder
        .record(&MetricRecord::Bug(BugReport {
            pattern_name: "temp_file_handling".to_string(),
            timestamp: now - Duration::days(8),
            title: None,
            file_path: None,
        }))
        .await
        .unwrap();

    let config = AnalysisConfig {
        time_window_days: 10,
        resample_count: 200,
        ..AnalysisConfig::default()
    };
    let analyzer = Analyzer::new(db.clone(), config).unwrap();
    let mut rng = StdRng::seed_from_u64(99);

    let report = analyzer.analyze_all(now, &mut rng).await.unwrap();
    let temp = report.result_for("temp_file_handling").unwrap();
    assert_eq!(temp.trend, Trend::Worsening);
    assert!(temp.score < 0.5);

    let plan = analyzer
        .plan(
            "save the upload to a temp file",
            PlanOptions {
                min_confidence: 0.6,
                apply_patterns: true,
            },
            now,
            &mut rng,
        )
        .await
        .unwrap();
    let why = plan.rationale_for("temp_file_handling").unwrap();
    assert_eq!(why.decision, Decision::Applied);
    assert!(why.reason.contains("worsening trend"));

    let stored = db.get_pattern("temp_file_handling").await.unwrap().unwrap();
    assert_eq!(stored.occurrence_frequency, 7);
}
