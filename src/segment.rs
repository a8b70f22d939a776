//! Table segmentation.
//!
//! A two-state machine over the ordered physical rows of one sheet:
//!
//! | State   | non-blank row                       | blank row                    |
//! |---------|-------------------------------------|------------------------------|
//! | Seeking | adopt as header row, go to InTable  | stay Seeking                 |
//! | InTable | append as data row                  | close table, go to Seeking   |
//!
//! A closed table is kept only if it has at least one data row. Rows must be
//! processed in order; segmentation of a single sheet is inherently serial.

use crate::extent::SheetExtent;
use crate::merge::{CellSlot, MergeMap};
use crate::normalize::Normalizer;
use crate::options::{BlankRowRule, ExtractOptions};
use crate::types::{NormalizedScalar, RawCell, RawRow, RawSheet};

/// One emitted cell of a segmented row. Merge-covered positions have none.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCell {
    /// 1-based column.
    pub col: u32,
    pub value: NormalizedScalar,
    /// `(row_span, col_span)` when this cell is a merge origin.
    pub span: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedRow {
    /// 1-based physical row number.
    pub row: u32,
    /// Cells in ascending column order. Only physical cells and merge
    /// origins are present.
    pub cells: Vec<SegmentedCell>,
}

impl SegmentedRow {
    /// Value at a 1-based column, `Empty` when absent or covered.
    #[must_use]
    pub fn value(&self, col: u32) -> &NormalizedScalar {
        static EMPTY: NormalizedScalar = NormalizedScalar::Empty;
        self.cells
            .binary_search_by_key(&col, |c| c.col)
            .ok()
            .and_then(|i| self.cells.get(i))
            .map_or(&EMPTY, |c| &c.value)
    }
}

/// A table as cut out of the sheet, before pruning and id assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedTable {
    pub header: SegmentedRow,
    pub rows: Vec<SegmentedRow>,
    /// Number of positional columns (the sheet's `max_col`).
    pub width: u32,
}

/// Per-sheet lookup context shared by every row of the walk.
pub struct SheetContext<'a> {
    pub extent: SheetExtent,
    pub merges: &'a MergeMap,
    pub normalizer: Normalizer<'a>,
    pub options: &'a ExtractOptions,
}

enum State {
    Seeking,
    InTable(SegmentedTable),
}

/// Split a sheet into tables separated by blank rows.
#[must_use]
pub fn segment_sheet(sheet: &RawSheet, ctx: &SheetContext<'_>) -> Vec<SegmentedTable> {
    let mut tables = Vec::new();
    let mut state = State::Seeking;
    let mut previous_row: Option<u32> = None;

    for raw_row in &sheet.rows {
        if let Some(prev) = previous_row {
            if ctx.options.split_on_row_gaps && gap_is_blank(prev, raw_row.index, ctx.merges) {
                state = close(state, &mut tables);
            }
        }
        previous_row = Some(raw_row.index);

        let row = normalize_row(raw_row, ctx);
        let blank = is_blank(raw_row, &row, ctx);

        state = match (state, blank) {
            (State::Seeking, true) => State::Seeking,
            (State::Seeking, false) => State::InTable(SegmentedTable {
                header: row,
                rows: Vec::new(),
                width: ctx.extent.max_col,
            }),
            (State::InTable(mut table), false) => {
                table.rows.push(row);
                State::InTable(table)
            }
            (in_table @ State::InTable(_), true) => close(in_table, &mut tables),
        };
    }
    let _ = close(state, &mut tables);

    tracing::debug!(sheet = %sheet.name, tables = tables.len(), "segmented sheet");
    tables
}

fn close(state: State, tables: &mut Vec<SegmentedTable>) -> State {
    if let State::InTable(table) = state {
        if !table.rows.is_empty() && table.width > 0 {
            tables.push(table);
        }
    }
    State::Seeking
}

/// Rows skipped between two physical rows act as a blank separator unless
/// merged content spans every one of them.
fn gap_is_blank(prev: u32, next: u32, merges: &MergeMap) -> bool {
    next > prev.saturating_add(1)
        && (prev.saturating_add(1)..next).any(|r| !merges.row_has_merged_content(r))
}

fn normalize_row(raw_row: &RawRow, ctx: &SheetContext<'_>) -> SegmentedRow {
    let width = ctx.extent.max_col;
    let mut cells: Vec<SegmentedCell> = raw_row
        .cells
        .iter()
        .filter(|(col, _)| (1..=width).contains(col))
        .filter(|(col, _)| matches!(ctx.merges.slot(raw_row.index, *col), CellSlot::Plain))
        .map(|(col, cell)| SegmentedCell {
            col: *col,
            value: ctx.normalizer.normalize_at(cell, raw_row.index, *col),
            span: None,
        })
        .collect();
    cells.extend(
        ctx.merges
            .origins_in_row(raw_row.index)
            .filter(|(col, _, _)| *col <= width)
            .map(|(col, value, span)| SegmentedCell {
                col,
                value: value.clone(),
                span: Some(span),
            }),
    );

    cells.sort_by_key(|c| c.col);
    // A column declared twice keeps its last cell.
    cells.dedup_by(|next, kept| {
        let same = next.col == kept.col;
        if same {
            std::mem::swap(next, kept);
        }
        same
    });

    SegmentedRow {
        row: raw_row.index,
        cells,
    }
}

fn is_blank(raw_row: &RawRow, row: &SegmentedRow, ctx: &SheetContext<'_>) -> bool {
    if ctx.merges.row_has_merged_content(raw_row.index) {
        return false;
    }
    match ctx.options.blank_rows {
        BlankRowRule::Normalized => row.cells.iter().all(|c| c.value.is_empty()),
        BlankRowRule::Raw => raw_row
            .cells
            .iter()
            .all(|(_, cell)| matches!(cell, RawCell::Empty)),
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
    use crate::extent::scan_extent;
    use crate::types::{MergeRegion, RichTextRun};

    fn segment_with(sheet: &RawSheet, options: &ExtractOptions) -> Vec<SegmentedTable> {
        let extent = scan_extent(sheet);
        let normalizer = Normalizer::new(&options.date_format);
        let merges = MergeMap::resolve(&sheet.merges, extent, &normalizer, |row, col| {
            sheet
                .rows
                .iter()
                .find(|r| r.index == row)
                .and_then(|r| r.get(col))
        });
        let ctx = SheetContext {
            extent,
            merges: &merges,
            normalizer,
            options,
        };
        segment_sheet(sheet, &ctx)
    }

    fn segment(sheet: &RawSheet) -> Vec<SegmentedTable> {
        segment_with(sheet, &ExtractOptions::default())
    }

    fn text(s: &str) -> NormalizedScalar {
        NormalizedScalar::Text(s.to_string())
    }

    #[test]
    fn test_blank_row_splits_two_tables() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["A", "B"]))
            .row(RawRow::from_values(2, ["1", "2"]))
            .row(RawRow::new(3).cell(1, RawCell::Empty))
            .row(RawRow::from_values(4, ["C", "D"]))
            .row(RawRow::from_values(5, ["3", "4"]));

        let tables = segment(&sheet);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].header.value(1), &text("A"));
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[0].rows[0].row, 2);
        assert_eq!(tables[1].header.value(2), &text("D"));
        assert_eq!(tables[1].rows.len(), 1);
        assert_eq!(tables[1].rows[0].value(1), &text("3"));
    }

    #[test]
    fn test_header_only_table_is_dropped() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["Lonely header"]))
            .row(RawRow::new(2).cell(1, "  "))
            .row(RawRow::from_values(3, ["H"]))
            .row(RawRow::from_values(4, ["v"]));

        let tables = segment(&sheet);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header.row, 3);
    }

    #[test]
    fn test_all_blank_sheet_has_no_tables() {
        let sheet = RawSheet::new("S")
            .row(RawRow::new(1).cell(1, RawCell::Empty))
            .row(RawRow::new(2).cell(2, "   "))
            .row(RawRow::new(3).cell(1, RawCell::RichText(vec![RichTextRun::new("")])));
        assert!(segment(&sheet).is_empty());
    }

    #[test]
    fn test_table_open_at_end_of_input_is_closed() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["H"]))
            .row(RawRow::from_values(2, ["a"]))
            .row(RawRow::from_values(3, ["b"]));

        let tables = segment(&sheet);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn test_header_spans_full_width() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["A", "B", "C"]))
            .row(RawRow::from_values(2, ["1", "2", "3", "4", "5"]));

        let tables = segment(&sheet);
        assert_eq!(tables[0].width, 5);
        assert_eq!(tables[0].header.cells.len(), 3);
        assert_eq!(tables[0].header.value(5), &NormalizedScalar::Empty);
        assert_eq!(tables[0].rows[0].value(5), &text("5"));
    }

    #[test]
    fn test_row_gap_splits_tables() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["A"]))
            .row(RawRow::from_values(2, ["1"]))
            .row(RawRow::from_values(4, ["B"]))
            .row(RawRow::from_values(5, ["2"]));

        assert_eq!(segment(&sheet).len(), 2);

        let no_gap_split = ExtractOptions::default().with_row_gap_split(false);
        let tables = segment_with(&sheet, &no_gap_split);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
    }

    #[test]
    fn test_merge_covered_cells_are_absent() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["H1", "H2", "H3"]))
            .row(RawRow::new(2).cell(1, "a").cell(2, "X").cell(3, "ignored"))
            .row(RawRow::new(3).cell(1, "b"))
            .merge(MergeRegion::new(2, 2, 3, 3));

        let tables = segment(&sheet);
        let rows = &tables[0].rows;

        let origin = rows[0].cells.iter().find(|c| c.col == 2).unwrap();
        assert_eq!(origin.value, text("X"));
        assert_eq!(origin.span, Some((2, 2)));
        assert!(rows[0].cells.iter().all(|c| c.col != 3));
        assert!(rows[1].cells.iter().all(|c| c.col != 2 && c.col != 3));
    }

    #[test]
    fn test_tall_merge_keeps_table_contiguous() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["Group", "Item"]))
            .row(RawRow::from_values(2, ["Fruit", "Apple"]))
            .row(RawRow::from_values(5, ["", "Pear"]))
            .merge(MergeRegion::new(2, 1, 5, 1));

        let tables = segment(&sheet);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn test_raw_blank_rule_keeps_whitespace_rows() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["A"]))
            .row(RawRow::from_values(2, ["1"]))
            .row(RawRow::new(3).cell(1, "   "))
            .row(RawRow::from_values(4, ["2"]));

        assert_eq!(segment(&sheet).len(), 1);
        assert_eq!(segment(&sheet)[0].rows.len(), 1);

        let raw = ExtractOptions::default().with_blank_rows(BlankRowRule::Raw);
        let tables = segment_with(&sheet, &raw);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
    }

    #[test]
    fn test_out_of_range_columns_are_ignored() {
        let sheet = RawSheet::new("S")
            .row(RawRow::new(1).cell(0, "zero").cell(1, "H"))
            .row(RawRow::from_values(2, ["v"]));

        let tables = segment(&sheet);
        assert_eq!(tables[0].header.cells.len(), 1);
        assert_eq!(tables[0].header.value(1), &text("H"));
    }

    #[test]
    fn test_wide_sheet_rows_stay_sparse() {
        let mut sheet = RawSheet::new("S").row(
            RawRow::new(1)
                .cell(1, "Name")
                .cell(crate::cell_ref::MAX_COLUMNS, RawCell::Empty),
        );
        for index in 2..=200 {
            sheet = sheet.row(RawRow::new(index).cell(1, "x").cell(3, f64::from(index)));
        }

        let tables = segment(&sheet);
        assert_eq!(tables[0].width, crate::cell_ref::MAX_COLUMNS);
        assert_eq!(tables[0].header.cells.len(), 2);
        assert!(tables[0].rows.iter().all(|r| r.cells.len() == 2));
        assert_eq!(tables[0].rows[0].value(3), &NormalizedScalar::Number(2.0));
        assert_eq!(tables[0].rows[0].value(2), &NormalizedScalar::Empty);
    }

    #[test]
    fn test_origin_without_physical_cell_is_emitted() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["A", "B", "C"]))
            .row(RawRow::new(2).cell(3, "c").cell(1, "a"))
            .row(RawRow::new(3).cell(1, "b").cell(3, "d"))
            .merge(MergeRegion::new(3, 2, 3, 2));

        let tables = segment(&sheet);
        let cols: Vec<u32> = tables[0].rows[0].cells.iter().map(|c| c.col).collect();
        assert_eq!(cols, [1, 3]);

        let merged = &tables[0].rows[1];
        let cols: Vec<u32> = merged.cells.iter().map(|c| c.col).collect();
        assert_eq!(cols, [1, 2, 3]);
        assert_eq!(merged.cells[1].span, Some((1, 1)));
        assert_eq!(merged.value(2), &NormalizedScalar::Empty);
    }

    #[test]
    fn test_duplicate_column_keeps_last_cell() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["H"]))
            .row(RawRow::new(2).cell(1, "first").cell(1, "second"));

        let tables = segment(&sheet);
        assert_eq!(tables[0].rows[0].cells.len(), 1);
        assert_eq!(tables[0].rows[0].value(1), &text("second"));
    }
}
