use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Align, NormalizedScalar};

/// Renderer-ready workbook: only sheets that produced at least one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub file_name: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Total number of tables across all sheets.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.sheets.iter().map(|s| s.tables.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub name: String,
    pub tables: Vec<Table>,
}

/// A run of contiguous non-blank rows whose first row supplied the headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// `table-<header row number>`
    pub id: String,
    pub headers: Vec<ColumnHeader>,
    pub rows: Vec<Row>,
}

impl Table {
    #[must_use]
    pub fn header(&self, id: &str) -> Option<&ColumnHeader> {
        self.headers.iter().find(|h| h.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    /// Positional id, `col<N>`. Independent of the label.
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Align::is_left")]
    pub align: Align,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// `row-<physical row number>`
    pub id: String,
    /// Header id to cell, in column order. Merge-covered cells are absent.
    pub cells: IndexMap<String, CellValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellValue {
    pub value: NormalizedScalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_span: Option<u32>,
}

impl CellValue {
    #[must_use]
    pub const fn plain(value: NormalizedScalar) -> Self {
        Self {
            value,
            row_span: None,
            col_span: None,
        }
    }
}

/// Positional column id for a 1-based column index.
#[must_use]
pub fn column_id(col: u32) -> String {
    format!("col{col}")
}

/// Deterministic row id for a 1-based physical row number.
#[must_use]
pub fn row_id(row: u32) -> String {
    format!("row-{row}")
}

/// Deterministic table id, keyed by the physical row of its header.
#[must_use]
pub fn table_id(header_row: u32) -> String {
    format!("table-{header_row}")
}
