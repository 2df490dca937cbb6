//! Flags command lines that can take a device down or
//! destroy configuration.
//!
//! Matching is a case-sensitive substring test. It is a warning aid for the
//! operator, not a guarantee: classified lines are still sent once the
//! operator confirms.

/// Keywords flagged by default (reload / erase / delete equivalents).
pub const DEFAULT_DANGER_KEYWORDS: &[&str] = &["reload", "erase", "delete"];

/// Keyword-based danger classifier.
#[derive(Debug, Clone)]
pub struct DangerClassifier {
    keywords: Vec<String>,
}

impl DangerClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .collect(),
        }
    }

    /// True iff `line` contains any configured keyword.
    pub fn classify(&self, line: &str) -> bool {
        self.matched(line).is_some()
    }

    /// The first keyword found in `line`, if any.
    pub fn matched(&self, line: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| line.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for DangerClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DANGER_KEYWORDS.iter().copied())
    }
}
