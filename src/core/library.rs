/// Pattern library snapshots
///
/// A snapshot is loaded fresh for every analysis or planning call and never
/// mutated afterwards. Entries are shared as `Arc<Pattern>` so match
/// candidates can point back at them without copying.

use crate::core::pattern::Pattern;
use crate::error::{PulseError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Immutable name → pattern mapping
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    patterns: BTreeMap<String, Arc<Pattern>>,
}

/// Accepted JSON layouts: a bare array or `{"patterns": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum LibraryDocument {
    List(Vec<Pattern>),
    Wrapped { patterns: Vec<Pattern> },
}

impl PatternLibrary {
    /// Build a snapshot, validating every entry and rejecting duplicate names
    pub fn from_patterns<I: IntoIterator<Item = Pattern>>(patterns: I) -> Result<Self> {
        let mut map = BTreeMap::new();

        for pattern in patterns {
            pattern.validate()?;
            if map.contains_key(&pattern.name) {
                return Err(PulseError::DuplicatePattern(pattern.name));
            }
            map.insert(pattern.name.clone(), Arc::new(pattern));
        }

        Ok(Self { patterns: map })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let patterns = match serde_json::from_str::<LibraryDocument>(json)? {
            LibraryDocument::List(patterns) => patterns,
            LibraryDocument::Wrapped { patterns } => patterns,
        };
        Self::from_patterns(patterns)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Pattern>> {
        self.patterns.get(name)
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Pattern>> {
        self.patterns.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pattern::{IndicatorGroup, Severity};

    #[test]
    fn test_duplicate_names_rejected() {
        let result = PatternLibrary::from_patterns(vec![
            Pattern::new("a", Severity::Low),
            Pattern::new("a", Severity::High),
        ]);
        assert!(matches!(result, Err(PulseError::DuplicatePattern(name)) if name == "a"));
    }

    #[test]
    fn test_from_json_both_layouts() {
        let bare = r#"[{
            "name": "numpy_json_serialization",
            "severity": "high",
            "indicator_groups": ["numeric"]
        }]"#;
        let wrapped = r#"{"patterns":[{"name":"temp_file_handling","severity":"medium"}]}"#;

        let lib = PatternLibrary::from_json_str(bare).unwrap();
        assert_eq!(lib.len(), 1);
        assert!(lib
            .get("numpy_json_serialization")
            .unwrap()
            .indicator_groups
            .contains(&IndicatorGroup::Numeric));

        let lib = PatternLibrary::from_json_str(wrapped).unwrap();
        assert_eq!(lib.names().collect::<Vec<_>>(), vec!["temp_file_handling"]);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, r#"[{"name":"x","severity":"low"}]"#).unwrap();

        let lib = PatternLibrary::from_json_file(&path).unwrap();
        assert!(!lib.is_empty());
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let result = PatternLibrary::from_json_str(r#"[{"name":"","severity":"low"}]"#);
        assert!(matches!(result, Err(PulseError::InvalidInput(_))));
    }
}
