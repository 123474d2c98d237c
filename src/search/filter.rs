//! Substring filters applied to a paragraph before it is scored.

use serde::Serialize;

/// Required and forbidden substrings.
///
/// A paragraph passes when every required text occurs in at least one of its
/// lines and no forbidden text occurs in any line. Matching is case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl TextFilter {
    #[must_use]
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self { includes, excludes }
    }

    /// True when no text is required or forbidden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    #[must_use]
    pub fn accepts<S: AsRef<str>>(&self, lines: &[S]) -> bool {
        self.includes_all(lines) && !self.includes_any_excluded(lines)
    }

    fn includes_all<S: AsRef<str>>(&self, lines: &[S]) -> bool {
        self.includes
            .iter()
            .all(|text| lines.iter().any(|l| l.as_ref().contains(text.as_str())))
    }

    fn includes_any_excluded<S: AsRef<str>>(&self, lines: &[S]) -> bool {
        self.excludes
            .iter()
            .any(|text| lines.iter().any(|l| l.as_ref().contains(text.as_str())))
    }
}
