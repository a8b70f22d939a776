//! Common test utilities and assertion helpers.
//!
//! Runs fixtures through the public pipeline and digs into the output
//! workbook by sheet and table position.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use xltables::{process_xlsx, CellValue, ExtractOptions, NormalizedScalar, Table, Workbook};

// Re-export fixtures for convenience
pub use super::fixtures::*;

pub const FILE_NAME: &str = "fixture.xlsx";

// ============================================================================
// Pipeline helpers
// ============================================================================

/// Extract with default options, panicking on failure.
#[must_use]
pub fn extract(data: &[u8]) -> Workbook {
    extract_with(data, &ExtractOptions::default())
}

#[must_use]
pub fn extract_with(data: &[u8], options: &ExtractOptions) -> Workbook {
    process_xlsx(FILE_NAME, data, options).expect("Failed to extract workbook")
}

/// Extract and serialize to a JSON value.
#[must_use]
pub fn extract_to_json(data: &[u8]) -> serde_json::Value {
    serde_json::to_value(extract(data)).expect("Failed to serialize workbook")
}

// ============================================================================
// Lookup helpers
// ============================================================================

pub fn table(workbook: &Workbook, sheet: usize, table: usize) -> &Table {
    let sheet_ref = workbook
        .sheets
        .get(sheet)
        .unwrap_or_else(|| panic!("Sheet {sheet} not found"));
    sheet_ref
        .tables
        .get(table)
        .unwrap_or_else(|| panic!("Table {table} not found on sheet {:?}", sheet_ref.name))
}

/// Cell of a table by row id (`row-N`) and column id (`colN`).
pub fn cell<'a>(table: &'a Table, row_id: &str, col_id: &str) -> Option<&'a CellValue> {
    table
        .rows
        .iter()
        .find(|r| r.id == row_id)
        .unwrap_or_else(|| panic!("Row {row_id} not found in {}", table.id))
        .cells
        .get(col_id)
}

pub fn header_labels(table: &Table) -> Vec<&str> {
    table.headers.iter().map(|h| h.label.as_str()).collect()
}

pub fn row_ids(table: &Table) -> Vec<&str> {
    table.rows.iter().map(|r| r.id.as_str()).collect()
}

// ============================================================================
// Assertion helpers
// ============================================================================

pub fn assert_sheet_names(workbook: &Workbook, expected: &[&str]) {
    let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, expected, "Sheet names mismatch");
}

pub fn assert_text(table: &Table, row_id: &str, col_id: &str, expected: &str) {
    let value = cell(table, row_id, col_id).map(|c| &c.value);
    assert_eq!(
        value,
        Some(&NormalizedScalar::Text(expected.to_string())),
        "Cell {row_id}/{col_id} in {}",
        table.id
    );
}

pub fn assert_number(table: &Table, row_id: &str, col_id: &str, expected: f64) {
    let value = cell(table, row_id, col_id).map(|c| &c.value);
    assert_eq!(
        value,
        Some(&NormalizedScalar::Number(expected)),
        "Cell {row_id}/{col_id} in {}",
        table.id
    );
}

pub fn assert_absent(table: &Table, row_id: &str, col_id: &str) {
    assert!(
        cell(table, row_id, col_id).is_none(),
        "Expected no cell at {row_id}/{col_id} in {}",
        table.id
    );
}

/// Assert the spans recorded on a merge origin.
pub fn assert_span(table: &Table, row_id: &str, col_id: &str, rows: u32, cols: u32) {
    let cell = cell(table, row_id, col_id)
        .unwrap_or_else(|| panic!("Merge origin {row_id}/{col_id} missing"));
    assert_eq!(cell.row_span, Some(rows), "rowSpan of {row_id}/{col_id}");
    assert_eq!(cell.col_span, Some(cols), "colSpan of {row_id}/{col_id}");
}
