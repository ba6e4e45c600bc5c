/// Context detection for generation requests
///
/// Finds which indicator groups a free-text request touches on. The default
/// detector is a static keyword table; anything implementing
/// [`IndicatorExtractor`] can stand in for it.

use crate::core::IndicatorGroup;
use regex::Regex;
use std::collections::BTreeSet;

/// Maps request text to the indicator groups it mentions
pub trait IndicatorExtractor: Send + Sync {
    fn extract(&self, text: &str) -> BTreeSet<IndicatorGroup>;
}

// Whole-word, case-insensitive, optional trailing "s"
const KEYWORD_GROUPS: &[(IndicatorGroup, &[&str])] = &[
    (
        IndicatorGroup::Numeric,
        &[
            "numpy", "np", "array", "ndarray", "matrix", "matrices", "vector", "tensor",
            "dataframe", "pandas", "float", "float32", "float64", "int64", "integer", "numeric",
            "decimal", "nan",
        ],
    ),
    (
        IndicatorGroup::FileIo,
        &[
            "file", "filename", "path", "pathlib", "directory", "directories", "folder",
            "tempfile", "temp", "tmp", "temporary", "disk", "filesystem", "fopen", "csv",
            "upload",
        ],
    ),
    (
        IndicatorGroup::WebEndpoint,
        &[
            "endpoint", "api", "route", "http", "https", "rest", "flask", "fastapi", "django",
            "express", "url", "webhook", "server", "middleware", "cors",
        ],
    ),
    (
        IndicatorGroup::ExceptionHandling,
        &[
            "exception", "error", "try", "except", "catch", "raise", "throw", "retry",
            "traceback", "panic", "fallback",
        ],
    ),
    (
        IndicatorGroup::Serialization,
        &[
            "json", "yaml", "toml", "xml", "serialize", "serialization", "deserialize",
            "pickle", "encode", "decode", "marshal",
        ],
    ),
    (
        IndicatorGroup::Database,
        &[
            "sql", "sqlite", "postgres", "postgresql", "mysql", "database", "db", "query",
            "queries", "transaction", "orm", "migration",
        ],
    ),
    (
        IndicatorGroup::Concurrency,
        &[
            "thread", "async", "await", "asyncio", "lock", "mutex", "concurrent",
            "concurrency", "parallel", "race", "semaphore", "deadlock",
        ],
    ),
];

/// Keyword-table indicator extractor
pub struct ContextDetector {
    matchers: Vec<(IndicatorGroup, Regex)>,
}

impl ContextDetector {
    pub fn new() -> Self {
        // Build one alternation per group once, not per request
        let matchers = KEYWORD_GROUPS
            .iter()
            .filter_map(|(group, keywords)| {
                let alternation = keywords
                    .iter()
                    .map(|k| regex::escape(k))
                    .collect::<Vec<_>>()
                    .join("|");
                Regex::new(&format!(r"(?i)\b(?:{})s?\b", alternation))
                    .ok()
                    .map(|regex| (*group, regex))
            })
            .collect();

        Self { matchers }
    }

    /// First keyword hit per group, for rationale text
    pub fn explain(&self, text: &str) -> Vec<(IndicatorGroup, String)> {
        self.matchers
            .iter()
            .filter_map(|(group, regex)| {
                regex
                    .find(text)
                    .map(|m| (*group, m.as_str().to_lowercase()))
            })
            .collect()
    }
}

impl Default for ContextDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorExtractor for ContextDetector {
    fn extract(&self, text: &str) -> BTreeSet<IndicatorGroup> {
        self.matchers
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(group, _)| *group)
            .collect()
    }
}
