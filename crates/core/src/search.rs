//! Search query normalization.

use crate::types::CategoryCode;

/// Longest query text that is sent to the database.
pub const MAX_QUERY_CHARS: usize = 100;

/// A non-blank product search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
}

impl SearchQuery {
    /// Normalize raw input. Blank input yields `None`, meaning "no results"
    /// without a database round trip.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let text: String = raw.trim().chars().take(MAX_QUERY_CHARS).collect();
        let text = text.trim_end();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_owned(),
        })
    }

    /// The trimmed query as typed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `ILIKE` pattern for a substring match, with `\` as the escape
    /// character.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.text.len() + 2);
        pattern.push('%');
        for c in self.text.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    /// Category codes whose code or label contains the query.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryCode> {
        CategoryCode::matching(&self.text)
    }
}
