/// Core functionality modules
///
/// Domain types (occurrences, patterns, the library, analysis config) and
/// the store-facing recorder, retriever and searcher.

pub mod config;
pub mod library;
pub mod occurrence;
pub mod pattern;
pub mod recorder;
pub mod retriever;
pub mod searcher;

pub use config::AnalysisConfig;
pub use library::PatternLibrary;
pub use occurrence::{
    BugReport, Category, MetricRecord, Occurrence, PatternEvent, ReviewFinding, TestFailure,
    TimeWindow,
};
pub use pattern::{IndicatorGroup, Pattern, Severity};
pub use recorder::Recorder;
pub use retriever::Retriever;
pub use searcher::{PatternSearcher, SearchHit};
