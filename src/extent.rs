//! Column extent scanning.
//!
//! Header rows are often shorter than data rows, so the column count of a
//! sheet is taken over every physical cell of every physical row. Cells past
//! column `XFD` lie outside the grid and do not widen it.

use crate::cell_ref::MAX_COLUMNS;
use crate::types::RawSheet;

/// Largest 1-based row and column indices holding a physical cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SheetExtent {
    pub max_row: u32,
    pub max_col: u32,
}

/// Scan all physical cells of a sheet. O(total cells), no side effects.
#[must_use]
pub fn scan_extent(sheet: &RawSheet) -> SheetExtent {
    sheet
        .rows
        .iter()
        .flat_map(|row| row.cells.iter().map(move |(col, _)| (row.index, *col)))
        .filter(|&(_, col)| col <= MAX_COLUMNS)
        .fold(SheetExtent::default(), |acc, (row, col)| SheetExtent {
            max_row: acc.max_row.max(row),
            max_col: acc.max_col.max(col),
        })
}

/// `max(colIndex)` across every physical cell; 0 for a sheet without cells.
#[must_use]
pub fn scan_max_col(sheet: &RawSheet) -> u32 {
    scan_extent(sheet).max_col
}
