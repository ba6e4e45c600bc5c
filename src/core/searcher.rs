/// Pattern searcher with fuzzy matching
///
/// Finds library patterns by name or description for the CLI.

use crate::core::{Pattern, PatternLibrary};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub pattern: Arc<Pattern>,
    pub score: i64,
}

pub struct PatternSearcher {
    matcher: SkimMatcherV2,
}

impl PatternSearcher {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Search names and descriptions, best match first
    ///
    /// # Arguments
    /// * `query` - Search query; blank returns nothing
    /// * `limit` - Maximum hits to return
    pub fn search(&self, library: &PatternLibrary, query: &str, limit: usize) -> Vec<SearchHit> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = library
            .iter()
            .filter_map(|pattern| {
                // Name hits count double so they beat incidental description hits
                let by_name = self.matcher.fuzzy_match(&pattern.name, query).map(|s| s * 2);
                let by_description = self.matcher.fuzzy_match(&pattern.description, query);

                by_name.max(by_description).map(|score| SearchHit {
                    pattern: Arc::clone(pattern),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.pattern.name.cmp(&b.pattern.name))
        });
        hits.truncate(limit);
        hits
    }
}

impl Default for PatternSearcher {
    fn default() -> Self {
        Self::new()
    }
}
