//! Table assembly: turns segmented tables into the output model.

use indexmap::IndexMap;

use crate::segment::{SegmentedRow, SegmentedTable};
use crate::types::{
    column_id, row_id, table_id, Align, CellValue, ColumnHeader, NormalizedScalar, Row,
    ScalarKind, Table,
};

/// Build one output table, or `None` when pruning leaves nothing to show.
///
/// A table is dropped when no data row survives or when every header cell is
/// empty. Empty header cells are labelled `"<fallback_prefix> <column>"`.
#[must_use]
pub fn build_table(segmented: &SegmentedTable, fallback_prefix: &str) -> Option<Table> {
    let header_values: Vec<&NormalizedScalar> =
        (1..=segmented.width).map(|col| segmented.header.value(col)).collect();
    if header_values.iter().all(|v| v.is_empty()) {
        tracing::debug!(header_row = segmented.header.row, "dropping table without headers");
        return None;
    }

    let rows: Vec<Row> = segmented.rows.iter().filter_map(build_row).collect();
    if rows.is_empty() {
        return None;
    }

    let headers = (1..=segmented.width)
        .zip(header_values)
        .zip(column_aligns(&segmented.rows, segmented.width))
        .map(|((col, value), align)| ColumnHeader {
            id: column_id(col),
            label: header_label(value, col, fallback_prefix),
            align,
        })
        .collect();

    Some(Table {
        id: table_id(segmented.header.row),
        headers,
        rows,
    })
}

fn header_label(value: &NormalizedScalar, col: u32, fallback_prefix: &str) -> String {
    if value.is_empty() {
        format!("{fallback_prefix} {col}")
    } else {
        value.display()
    }
}

/// Empty plain cells are omitted; merge origins are kept with their spans.
fn build_row(row: &SegmentedRow) -> Option<Row> {
    if row.cells.iter().all(|c| c.value.is_empty()) {
        return None;
    }

    let mut cells = IndexMap::with_capacity(row.cells.len());
    for cell in &row.cells {
        let value = match cell.span {
            Some((row_span, col_span)) => CellValue {
                value: cell.value.clone(),
                row_span: Some(row_span),
                col_span: Some(col_span),
            },
            None if cell.value.is_empty() => continue,
            None => CellValue::plain(cell.value.clone()),
        };
        cells.insert(column_id(cell.col), value);
    }

    Some(Row {
        id: row_id(row.row),
        cells,
    })
}

/// Per-column alignment in one pass over the data cells. A column is
/// right-aligned when it holds at least one value and all of its non-empty
/// values are numbers.
fn column_aligns(rows: &[SegmentedRow], width: u32) -> Vec<Align> {
    // Dominant kind seen so far: `Numeric` until any text shows up.
    let mut kinds: Vec<Option<ScalarKind>> = vec![None; width as usize];
    for cell in rows.iter().flat_map(|r| &r.cells) {
        let Some(seen) = cell.col.checked_sub(1).and_then(|i| kinds.get_mut(i as usize)) else {
            continue;
        };
        match (cell.value.kind(), *seen) {
            (ScalarKind::Empty, _) | (_, Some(ScalarKind::Text)) => {}
            (kind, _) => {
                *seen = Some(kind);
            }
        }
    }

    kinds
        .into_iter()
        .map(|kind| match kind {
            Some(ScalarKind::Numeric) => Align::Right,
            _ => Align::Left,
        })
        .collect()
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
    use crate::segment::SegmentedCell;

    fn cell(col: u32, value: NormalizedScalar) -> SegmentedCell {
        SegmentedCell {
            col,
            value,
            span: None,
        }
    }

    fn text(s: &str) -> NormalizedScalar {
        NormalizedScalar::Text(s.to_string())
    }

    fn row(index: u32, cells: Vec<SegmentedCell>) -> SegmentedRow {
        SegmentedRow { row: index, cells }
    }

    fn table(header: Vec<SegmentedCell>, rows: Vec<SegmentedRow>, width: u32) -> SegmentedTable {
        SegmentedTable {
            header: row(1, header),
            rows,
            width,
        }
    }

    #[test]
    fn test_ids_are_positional_and_deterministic() {
        let seg = table(
            vec![cell(1, text("Name")), cell(2, text("Qty"))],
            vec![row(2, vec![cell(1, text("a")), cell(2, NormalizedScalar::Number(3.0))])],
            2,
        );

        let built = build_table(&seg, "Column").unwrap();

        assert_eq!(built.id, "table-1");
        assert_eq!(built.headers[0].id, "col1");
        assert_eq!(built.headers[1].label, "Qty");
        assert_eq!(built.rows[0].id, "row-2");
        let keys: Vec<&str> = built.rows[0].cells.keys().map(String::as_str).collect();
        assert_eq!(keys, ["col1", "col2"]);
    }

    #[test]
    fn test_empty_header_gets_fallback_label() {
        let seg = table(
            vec![cell(1, text("Name")), cell(2, NormalizedScalar::Empty)],
            vec![row(2, vec![cell(1, text("a")), cell(2, text("b"))])],
            2,
        );
        let built = build_table(&seg, "Column").unwrap();
        assert_eq!(built.headers[1].label, "Column 2");
    }

    #[test]
    fn test_numeric_header_label() {
        let seg = table(
            vec![cell(1, NormalizedScalar::Number(2024.0)), cell(2, NormalizedScalar::Number(1.5))],
            vec![row(2, vec![cell(1, text("x"))])],
            2,
        );
        let built = build_table(&seg, "Column").unwrap();
        assert_eq!(built.headers[0].label, "2024");
        assert_eq!(built.headers[1].label, "1.5");
    }

    #[test]
    fn test_table_with_only_empty_headers_is_dropped() {
        let seg = table(
            vec![cell(1, NormalizedScalar::Empty)],
            vec![row(2, vec![cell(1, text("a"))])],
            1,
        );
        assert!(build_table(&seg, "Column").is_none());
    }

    #[test]
    fn test_all_empty_rows_are_dropped() {
        let seg = table(
            vec![cell(1, text("H"))],
            vec![row(2, vec![cell(1, NormalizedScalar::Empty)])],
            1,
        );
        assert!(build_table(&seg, "Column").is_none());
    }

    #[test]
    fn test_empty_plain_cells_omitted_origins_kept() {
        let seg = table(
            vec![cell(1, text("A")), cell(2, text("B")), cell(3, text("C"))],
            vec![row(
                2,
                vec![
                    cell(1, text("v")),
                    SegmentedCell {
                        col: 2,
                        value: NormalizedScalar::Empty,
                        span: Some((2, 1)),
                    },
                    cell(3, NormalizedScalar::Empty),
                ],
            )],
            3,
        );

        let built = build_table(&seg, "Column").unwrap();
        let cells = &built.rows[0].cells;

        assert_eq!(cells.len(), 2);
        assert_eq!(cells["col2"].row_span, Some(2));
        assert_eq!(cells["col2"].col_span, Some(1));
        assert!(!cells.contains_key("col3"));
    }

    #[test]
    fn test_alignment_hint() {
        let seg = table(
            vec![cell(1, text("Item")), cell(2, text("Price")), cell(3, text("Notes"))],
            vec![
                row(2, vec![cell(1, text("a")), cell(2, NormalizedScalar::Number(1.0))]),
                row(3, vec![cell(1, text("b")), cell(2, NormalizedScalar::Number(2.5))]),
            ],
            3,
        );

        let built = build_table(&seg, "Column").unwrap();
        assert_eq!(built.headers[0].align, Align::Left);
        assert_eq!(built.headers[1].align, Align::Right);
        assert_eq!(built.headers[2].align, Align::Left);
    }

    #[test]
    fn test_mixed_column_is_left_aligned() {
        let seg = table(
            vec![cell(1, text("Code"))],
            vec![
                row(2, vec![cell(1, NormalizedScalar::Number(1.0))]),
                row(3, vec![cell(1, text("A-2"))]),
                row(4, vec![cell(1, NormalizedScalar::Number(3.0))]),
            ],
            1,
        );
        let built = build_table(&seg, "Column").unwrap();
        assert_eq!(built.headers[0].align, Align::Left);
    }

    #[test]
    fn test_wide_table_headers() {
        let width = crate::cell_ref::MAX_COLUMNS;
        let rows = (2..=500)
            .map(|r| row(r, vec![cell(1, text("x")), cell(width, NormalizedScalar::Number(1.0))]))
            .collect();
        let seg = table(vec![cell(1, text("Name"))], rows, width);

        let built = build_table(&seg, "Column").unwrap();
        assert_eq!(built.headers.len(), 16_384);
        assert_eq!(built.headers[1].label, "Column 2");
        assert_eq!(built.headers[16_383].id, "col16384");
        assert_eq!(built.headers[16_383].align, Align::Right);
        assert_eq!(built.headers[1].align, Align::Left);
        assert_eq!(built.rows.len(), 499);
        assert_eq!(built.rows[0].cells.len(), 2);
    }

    #[test]
    fn test_json_shape() {
        let seg = table(
            vec![cell(1, text("N"))],
            vec![row(2, vec![cell(1, NormalizedScalar::Number(7.0))])],
            1,
        );
        let json = serde_json::to_value(build_table(&seg, "Column").unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "table-1",
                "headers": [{"id": "col1", "label": "N", "align": "right"}],
                "rows": [{"id": "row-2", "cells": {"col1": {"value": 7.0}}}]
            })
        );
    }
}
