//! Cell value normalization.
//!
//! Maps every [`RawCell`] to exactly one [`NormalizedScalar`]. Nothing in here
//! returns an error: malformed payloads become `Empty` and emit a
//! `tracing::warn!` diagnostic.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::options::DEFAULT_DATE_FORMAT;
use crate::types::{HyperlinkCell, NormalizedScalar, RawCell, RichTextRun};

/// Normalizes cells using a configured date pattern.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    date_format: &'a str,
}

impl Default for Normalizer<'static> {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT,
        }
    }
}

impl<'a> Normalizer<'a> {
    #[must_use]
    pub const fn new(date_format: &'a str) -> Self {
        Self { date_format }
    }

    /// Normalize one cell.
    #[must_use]
    pub fn normalize(&self, cell: &RawCell) -> NormalizedScalar {
        self.normalize_inner(cell, None)
    }

    /// Normalize one cell, attaching its 1-based position to any diagnostic.
    #[must_use]
    pub fn normalize_at(&self, cell: &RawCell, row: u32, col: u32) -> NormalizedScalar {
        self.normalize_inner(cell, Some((row, col)))
    }

    fn normalize_inner(&self, cell: &RawCell, pos: Option<(u32, u32)>) -> NormalizedScalar {
        match cell {
            RawCell::Formula(formula) => match formula.result.as_deref() {
                None => NormalizedScalar::Empty,
                Some(RawCell::Date(date)) => NormalizedScalar::Text(self.format_date(date)),
                Some(RawCell::Formula(_)) => malformed(pos, "formula result is itself a formula"),
                Some(result) => self.normalize_inner(result, pos),
            },
            RawCell::Error(code) => NormalizedScalar::Text(format!("#{code}")),
            RawCell::RichText(runs) => text_or_empty(&concat_runs(runs)),
            RawCell::Hyperlink(link) => hyperlink_text(link),
            RawCell::Date(date) => NormalizedScalar::Text(self.format_date(date)),
            RawCell::Number(n) if n.is_finite() => NormalizedScalar::Number(*n),
            RawCell::Number(_) => malformed(pos, "non-finite number"),
            RawCell::Text(s) => text_or_empty(s),
            RawCell::Empty => NormalizedScalar::Empty,
            RawCell::Unsupported(what) => malformed(pos, what),
        }
    }

    /// Format a timestamp with the configured pattern.
    ///
    /// An invalid pattern falls back to the default one instead of panicking.
    #[must_use]
    pub fn format_date(&self, date: &NaiveDateTime) -> String {
        let mut out = String::new();
        if write!(out, "{}", date.format(self.date_format)).is_ok() {
            return out;
        }
        tracing::warn!(pattern = self.date_format, "invalid date format, using default");
        out.clear();
        let _ = write!(out, "{}", date.format(DEFAULT_DATE_FORMAT));
        out
    }
}

/// Normalize with default options.
#[must_use]
pub fn normalize_cell(cell: &RawCell) -> NormalizedScalar {
    Normalizer::default().normalize(cell)
}

fn concat_runs(runs: &[RichTextRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

fn hyperlink_text(link: &HyperlinkCell) -> NormalizedScalar {
    let display = link.text.as_deref().map(str::trim).unwrap_or_default();
    if display.is_empty() {
        text_or_empty(&link.target)
    } else {
        NormalizedScalar::Text(display.to_string())
    }
}

fn text_or_empty(s: &str) -> NormalizedScalar {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        NormalizedScalar::Empty
    } else {
        NormalizedScalar::Text(trimmed.to_string())
    }
}

fn malformed(pos: Option<(u32, u32)>, what: &str) -> NormalizedScalar {
    match pos {
        Some((row, col)) => tracing::warn!(row, col, reason = what, "malformed cell, treating as empty"),
        None => tracing::warn!(reason = what, "malformed cell, treating as empty"),
    }
    NormalizedScalar::Empty
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::FormulaCell;
    use chrono::NaiveDate;
    use test_case::test_case;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn text(s: &str) -> NormalizedScalar {
        NormalizedScalar::Text(s.to_string())
    }

    #[test_case(RawCell::Empty, NormalizedScalar::Empty ; "empty")]
    #[test_case(RawCell::Number(42.5), NormalizedScalar::Number(42.5) ; "number unchanged")]
    #[test_case(RawCell::from("  hello "), text("hello") ; "text trimmed")]
    #[test_case(RawCell::from("   "), NormalizedScalar::Empty ; "whitespace text")]
    #[test_case(RawCell::Error("DIV/0!".to_string()), text("#DIV/0!") ; "error code")]
    #[test_case(RawCell::Number(f64::NAN), NormalizedScalar::Empty ; "nan")]
    #[test_case(RawCell::Number(f64::INFINITY), NormalizedScalar::Empty ; "infinity")]
    #[test_case(RawCell::Unsupported("t=\"x\"".to_string()), NormalizedScalar::Empty ; "unsupported")]
    fn test_direct_values(cell: RawCell, expected: NormalizedScalar) {
        assert_eq!(normalize_cell(&cell), expected);
    }

    #[test]
    fn test_number_is_not_rounded() {
        let n = 0.1 + 0.2;
        assert_eq!(normalize_cell(&RawCell::Number(n)), NormalizedScalar::Number(n));
    }

    #[test]
    fn test_rich_text_concatenates_without_separator() {
        let cell = RawCell::RichText(vec![
            RichTextRun::new(" Bold"),
            RichTextRun::new("Normal "),
            RichTextRun::new("Tail "),
        ]);
        assert_eq!(normalize_cell(&cell), text("BoldNormal Tail"));
    }

    #[test]
    fn test_rich_text_all_whitespace_is_empty() {
        let cell = RawCell::RichText(vec![RichTextRun::new(" "), RichTextRun::new("")]);
        assert_eq!(normalize_cell(&cell), NormalizedScalar::Empty);
        assert_eq!(normalize_cell(&RawCell::RichText(Vec::new())), NormalizedScalar::Empty);
    }

    #[test]
    fn test_hyperlink_prefers_display_text() {
        let cell = RawCell::Hyperlink(HyperlinkCell {
            target: "https://example.com".to_string(),
            text: Some(" Example ".to_string()),
        });
        assert_eq!(normalize_cell(&cell), text("Example"));
    }

    #[test]
    fn test_hyperlink_falls_back_to_target() {
        let cell = RawCell::Hyperlink(HyperlinkCell {
            target: "https://example.com".to_string(),
            text: Some("   ".to_string()),
        });
        assert_eq!(normalize_cell(&cell), text("https://example.com"));

        let bare = RawCell::Hyperlink(HyperlinkCell {
            target: String::new(),
            text: None,
        });
        assert_eq!(normalize_cell(&bare), NormalizedScalar::Empty);
    }

    #[test]
    fn test_date_uses_locale_pattern() {
        assert_eq!(normalize_cell(&RawCell::Date(date(2024, 1, 15))), text("1/15/2024"));
    }

    #[test]
    fn test_date_custom_pattern() {
        let normalizer = Normalizer::new("%Y-%m-%d");
        assert_eq!(
            normalizer.normalize(&RawCell::Date(date(2024, 1, 5))),
            text("2024-01-05")
        );
    }

    #[test]
    fn test_invalid_pattern_falls_back() {
        let normalizer = Normalizer::new("%Q");
        assert_eq!(
            normalizer.normalize(&RawCell::Date(date(2024, 3, 9))),
            text("3/9/2024")
        );
    }

    #[test]
    fn test_formula_uses_cached_result() {
        let cell = RawCell::Formula(FormulaCell::new("SUM(A1:A3)", Some(RawCell::Number(6.0))));
        assert_eq!(normalize_cell(&cell), NormalizedScalar::Number(6.0));

        let str_result = RawCell::Formula(FormulaCell::new("A1&B1", Some(RawCell::from(" ab "))));
        assert_eq!(normalize_cell(&str_result), text("ab"));
    }

    #[test]
    fn test_formula_without_result_is_empty() {
        let cell = RawCell::Formula(FormulaCell::new("NOW()", None));
        assert_eq!(normalize_cell(&cell), NormalizedScalar::Empty);
    }

    #[test]
    fn test_formula_date_matches_direct_date() {
        let d = date(2023, 12, 31);
        let via_formula = RawCell::Formula(FormulaCell::new("TODAY()", Some(RawCell::Date(d))));
        assert_eq!(normalize_cell(&via_formula), normalize_cell(&RawCell::Date(d)));
    }

    #[test]
    fn test_formula_error_result() {
        let cell = RawCell::Formula(FormulaCell::new(
            "1/0",
            Some(RawCell::Error("DIV/0!".to_string())),
        ));
        assert_eq!(normalize_cell(&cell), text("#DIV/0!"));
    }

    #[test]
    fn test_nested_formula_is_malformed() {
        let inner = RawCell::Formula(FormulaCell::new("1", Some(RawCell::Number(1.0))));
        let cell = RawCell::Formula(FormulaCell::new("A1", Some(inner)));
        assert_eq!(normalize_cell(&cell), NormalizedScalar::Empty);
    }

    #[test]
    fn test_renormalizing_text_is_identity() {
        for raw in ["  padded  ", "plain", "#N/A", "1/15/2024"] {
            let first = normalize_cell(&RawCell::from(raw));
            let NormalizedScalar::Text(produced) = &first else {
                panic!("expected text for {raw:?}");
            };
            assert_eq!(normalize_cell(&RawCell::Text(produced.clone())), first);
        }
    }
}
