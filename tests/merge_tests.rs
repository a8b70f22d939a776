//! Merged cell tests.
//!
//! Merge origins carry the value and both spans; every other cell inside a
//! region is absent from the row output.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::{assert_absent, assert_span, assert_text, cell, extract, row_ids, table};
use fixtures::{SheetBuilder, XlsxBuilder};
use xltables::NormalizedScalar;

fn three_by_three() -> SheetBuilder {
    SheetBuilder::new("Sheet1")
        .row(1, ["H1", "H2", "H3"])
        .row(2, ["a", "X"])
        .row(3, ["b"])
}

#[test]
fn test_origin_keeps_value_and_spans() {
    let xlsx = XlsxBuilder::new().sheet(three_by_three().merge("B2:C3")).build();

    let workbook = extract(&xlsx);
    let t = table(&workbook, 0, 0);

    assert_text(t, "row-2", "col2", "X");
    assert_span(t, "row-2", "col2", 2, 2);
    assert_absent(t, "row-2", "col3");
    assert_absent(t, "row-3", "col2");
    assert_absent(t, "row-3", "col3");
    assert_text(t, "row-3", "col1", "b");
}

#[test]
fn test_exactly_one_origin_per_region() {
    let xlsx = XlsxBuilder::new().sheet(three_by_three().merge("B2:C3")).build();

    let workbook = extract(&xlsx);
    let origins = table(&workbook, 0, 0)
        .rows
        .iter()
        .flat_map(|r| r.cells.values())
        .filter(|c| c.row_span.is_some())
        .count();
    assert_eq!(origins, 1);
}

#[test]
fn test_merged_header_keeps_label() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("A1", "Quarter")
                .row(2, ["Q1", "Q2"])
                .merge("A1:B1"),
        )
        .build();

    let workbook = extract(&xlsx);
    let t = table(&workbook, 0, 0);
    // The header row keeps a column per sheet column; the covered one falls back.
    assert_eq!(t.headers[0].label, "Quarter");
    assert_eq!(t.headers[1].label, "Column 2");
}

#[test]
fn test_vertical_merge_bridges_blank_looking_row() {
    // Row 3 only holds the covered part of A2:A3, so it does not end the table.
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .row(1, ["Group", "Item"])
                .row(2, ["Fruit", "Apple"])
                .blank_row(3)
                .row(4, ["Veg", "Leek"])
                .merge("A2:A3"),
        )
        .build();

    let workbook = extract(&xlsx);
    assert_eq!(workbook.table_count(), 1);
    assert_span(table(&workbook, 0, 0), "row-2", "col1", 2, 1);
}

#[test]
fn test_empty_origin_keeps_span() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .row(1, ["A", "B", "C"])
                .row(2, ["x", "", "z"])
                .merge("B2:C2"),
        )
        .build();

    let workbook = extract(&xlsx);
    let t = table(&workbook, 0, 0);
    let origin = cell(t, "row-2", "col2").unwrap();
    assert_eq!(origin.value, NormalizedScalar::Empty);
    assert_eq!((origin.row_span, origin.col_span), (Some(1), Some(2)));
    assert_absent(t, "row-2", "col3");
}

#[test]
fn test_overlapping_merges_last_wins() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .row(1, ["A", "B", "C"])
                .row(2, ["p", "q", "r"])
                .row(3, ["s", "t", "u"])
                .merge("A2:B3")
                .merge("B2:C2"),
        )
        .build();

    let workbook = extract(&xlsx);
    let t = table(&workbook, 0, 0);
    assert_eq!(row_ids(t), ["row-2", "row-3"]);
    assert_text(t, "row-2", "col2", "q");
    assert_span(t, "row-2", "col2", 1, 2);
    assert_absent(t, "row-2", "col3");
}
