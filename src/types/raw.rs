use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A decoded workbook, before any normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWorkbook {
    pub sheets: Vec<RawSheet>,
}

/// One worksheet as handed over by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSheet {
    pub name: String,
    /// Physical rows in ascending row order. Rows with no cells may be absent.
    pub rows: Vec<RawRow>,
    /// Merge regions in declaration order.
    #[serde(default)]
    pub merges: Vec<MergeRegion>,
}

impl RawSheet {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            merges: Vec::new(),
        }
    }

    /// Append a row (builder style).
    #[must_use]
    pub fn row(mut self, row: RawRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Append a merge region (builder style).
    #[must_use]
    pub fn merge(mut self, region: MergeRegion) -> Self {
        self.merges.push(region);
        self
    }
}

/// A physical row: a 1-based row number plus sparse `(col, cell)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub index: u32,
    pub cells: Vec<(u32, RawCell)>,
}

impl RawRow {
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self {
            index,
            cells: Vec::new(),
        }
    }

    /// Build a row whose values occupy consecutive columns starting at 1.
    #[must_use]
    pub fn from_values<I, V>(index: u32, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawCell>,
    {
        let cells = (1u32..).zip(values.into_iter().map(Into::into)).collect();
        Self { index, cells }
    }

    /// Append a cell (builder style).
    #[must_use]
    pub fn cell(mut self, col: u32, cell: impl Into<RawCell>) -> Self {
        self.cells.push((col, cell.into()));
        self
    }

    /// Look up the cell at a 1-based column, if physically present.
    #[must_use]
    pub fn get(&self, col: u32) -> Option<&RawCell> {
        self.cells.iter().find(|(c, _)| *c == col).map(|(_, cell)| cell)
    }
}

/// A raw cell payload. One variant per kind the decoder can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum RawCell {
    Empty,
    Number(f64),
    #[serde(rename = "string")]
    Text(String),
    Date(NaiveDateTime),
    Formula(FormulaCell),
    RichText(Vec<RichTextRun>),
    Hyperlink(HyperlinkCell),
    /// Error code without the leading `#`, e.g. `DIV/0!`.
    Error(String),
    /// A payload the decoder could not classify; carries a short description.
    Unsupported(String),
}

/// Formula with its cached result. The formula text is never evaluated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulaCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<RawCell>>,
}

impl FormulaCell {
    #[must_use]
    pub fn new(formula: impl Into<String>, result: Option<RawCell>) -> Self {
        Self {
            formula: Some(formula.into()),
            result: result.map(Box::new),
        }
    }
}

/// A single run of a rich text value. Formatting is not carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextRun {
    pub text: String,
}

impl RichTextRun {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperlinkCell {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Rectangular merge declaration, 1-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeRegion {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl MergeRegion {
    /// Create a region, swapping inverted bounds.
    #[must_use]
    pub fn new(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top: top.min(bottom),
            left: left.min(right),
            bottom: top.max(bottom),
            right: left.max(right),
        }
    }

    #[must_use]
    pub const fn row_span(&self) -> u32 {
        self.bottom.saturating_sub(self.top).saturating_add(1)
    }

    #[must_use]
    pub const fn col_span(&self) -> u32 {
        self.right.saturating_sub(self.left).saturating_add(1)
    }

    #[must_use]
    pub const fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.top && row <= self.bottom && col >= self.left && col <= self.right
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawCell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for RawCell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for RawCell {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<NaiveDateTime> for RawCell {
    fn from(d: NaiveDateTime) -> Self {
        Self::Date(d)
    }
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
    use crate::types::{Align, NormalizedScalar, Table};
    use crate::{extract_workbook, ExtractOptions};
    use chrono::NaiveDate;

    const EVERY_KIND: &str = r#"{
        "sheets": [{
            "name": "Raw",
            "rows": [
                {"index": 1, "cells": [[1, {"type": "string", "value": "Kind"}], [2, {"type": "string", "value": "Value"}]]},
                {"index": 2, "cells": [[1, {"type": "string", "value": "empty"}], [2, {"type": "empty"}]]},
                {"index": 3, "cells": [[1, {"type": "string", "value": "number"}], [2, {"type": "number", "value": 2.5}]]},
                {"index": 4, "cells": [[1, {"type": "string", "value": "date"}], [2, {"type": "date", "value": "2024-01-15T00:00:00"}]]},
                {"index": 5, "cells": [[1, {"type": "string", "value": "formula"}], [2, {"type": "formula", "value": {"formula": "SUM(A1:A2)", "result": {"type": "number", "value": 6.0}}}]]},
                {"index": 6, "cells": [[1, {"type": "string", "value": "richText"}], [2, {"type": "richText", "value": [{"text": "Bold"}, {"text": " plain"}]}]]},
                {"index": 7, "cells": [[1, {"type": "string", "value": "hyperlink"}], [2, {"type": "hyperlink", "value": {"target": "https://example.com", "text": "Docs"}}]]},
                {"index": 8, "cells": [[1, {"type": "string", "value": "error"}], [2, {"type": "error", "value": "DIV/0!"}]]},
                {"index": 9, "cells": [[1, {"type": "string", "value": "unsupported"}], [2, {"type": "unsupported", "value": "t=\"x\""}]]},
                {"index": 10, "cells": [[1, {"type": "string", "value": "merged"}]]}
            ],
            "merges": [{"top": 10, "left": 1, "bottom": 10, "right": 2}]
        }]
    }"#;

    fn value<'a>(table: &'a Table, row_id: &str, col_id: &str) -> Option<&'a NormalizedScalar> {
        table
            .rows
            .iter()
            .find(|r| r.id == row_id)
            .and_then(|r| r.cells.get(col_id))
            .map(|c| &c.value)
    }

    fn text(s: &str) -> NormalizedScalar {
        NormalizedScalar::Text(s.to_string())
    }

    #[test]
    fn test_every_cell_kind_deserializes() {
        let raw: RawWorkbook = serde_json::from_str(EVERY_KIND).unwrap();
        let rows = &raw.sheets[0].rows;

        assert_eq!(rows[1].get(2), Some(&RawCell::Empty));
        let date = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(rows[3].get(2), Some(&RawCell::Date(date)));
        assert_eq!(
            rows[4].get(2),
            Some(&RawCell::Formula(FormulaCell::new(
                "SUM(A1:A2)",
                Some(RawCell::Number(6.0))
            )))
        );
        assert_eq!(rows[7].get(2), Some(&RawCell::Error("DIV/0!".to_string())));
        assert_eq!(raw.sheets[0].merges, vec![MergeRegion::new(10, 1, 10, 2)]);
    }

    #[test]
    fn test_every_cell_kind_extracts() {
        let raw: RawWorkbook = serde_json::from_str(EVERY_KIND).unwrap();
        let workbook = extract_workbook("raw.json", &raw, &ExtractOptions::default()).unwrap();
        let table = &workbook.sheets[0].tables[0];

        assert_eq!(table.rows.len(), 9);
        assert_eq!(value(table, "row-2", "col2"), None);
        assert_eq!(value(table, "row-3", "col2"), Some(&NormalizedScalar::Number(2.5)));
        assert_eq!(value(table, "row-4", "col2"), Some(&text("1/15/2024")));
        assert_eq!(value(table, "row-5", "col2"), Some(&NormalizedScalar::Number(6.0)));
        assert_eq!(value(table, "row-6", "col2"), Some(&text("Bold plain")));
        assert_eq!(value(table, "row-7", "col2"), Some(&text("Docs")));
        assert_eq!(value(table, "row-8", "col2"), Some(&text("#DIV/0!")));
        assert_eq!(value(table, "row-9", "col2"), None);
        assert_eq!(value(table, "row-10", "col1"), Some(&text("merged")));
        assert_eq!(value(table, "row-10", "col2"), None);
        assert_eq!(table.header("col2").unwrap().align, Align::Left);
    }

    #[test]
    fn test_unknown_cell_type_is_rejected() {
        let json = r#"{"sheets": [{"name": "S", "rows": [{"index": 1, "cells": [[1, {"type": "bool", "value": true}]]}]}]}"#;
        assert!(serde_json::from_str::<RawWorkbook>(json).is_err());
    }
}
