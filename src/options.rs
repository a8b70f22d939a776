//! Extraction options.
//!
//! Accepted from JavaScript as a plain object (camelCase keys) and from the
//! CLI as flags. Every field has a default, so `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

/// Default date pattern, matching an en-US `toLocaleDateString` (`1/15/2024`).
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Default label prefix for header cells that are empty.
pub const DEFAULT_HEADER_FALLBACK: &str = "Column";

/// Which view of a row decides whether it is blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlankRowRule {
    /// Blank iff every cell normalizes to `Empty`. Whitespace-only text and
    /// empty rich-text runs count as blank.
    #[default]
    Normalized,
    /// Blank iff the row holds no cells other than raw `Empty` payloads.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    /// chrono `strftime` pattern used for date cells.
    pub date_format: String,
    pub blank_rows: BlankRowRule,
    /// Treat a jump in physical row numbers as a blank separator row.
    pub split_on_row_gaps: bool,
    /// Empty header cells are labelled `"<prefix> <column>"`.
    pub header_fallback_prefix: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            blank_rows: BlankRowRule::default(),
            split_on_row_gaps: true,
            header_fallback_prefix: DEFAULT_HEADER_FALLBACK.to_string(),
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    #[must_use]
    pub const fn with_blank_rows(mut self, rule: BlankRowRule) -> Self {
        self.blank_rows = rule;
        self
    }

    #[must_use]
    pub const fn with_row_gap_split(mut self, enabled: bool) -> Self {
        self.split_on_row_gaps = enabled;
        self
    }
}
