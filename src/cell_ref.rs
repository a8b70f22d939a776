//! Utilities for parsing A1-style cell references and ranges.
//!
//! All indices returned here are 1-based, matching the raw workbook model.

use crate::types::MergeRegion;

/// Column count of an XLSX grid (`XFD`).
pub const MAX_COLUMNS: u32 = 16_384;
/// Row count of an XLSX grid.
pub const MAX_ROWS: u32 = 1_048_576;

/// Parse a cell reference like `"B3"` or `"$B$3"` into 1-based `(col, row)`.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Bytes equivalent of [`parse_cell_ref`], for raw quick-xml attribute values.
///
/// References outside the `XFD1048576` grid are rejected.
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        match b {
            b'$' => {}
            b'A'..=b'Z' | b'a'..=b'z' if !saw_row => {
                let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
                col = col.checked_mul(26)?.checked_add(digit)?;
                saw_col = true;
            }
            b'0'..=b'9' => {
                row = row.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
                saw_row = true;
            }
            _ => return None,
        }
    }

    let in_grid = (1..=MAX_COLUMNS).contains(&col) && (1..=MAX_ROWS).contains(&row);
    (saw_col && saw_row && in_grid).then_some((col, row))
}

/// Parse a range like `"A1:C4"` into a [`MergeRegion`]. Inverted corners are
/// normalized.
pub fn parse_range(range: &str) -> Option<MergeRegion> {
    let (start, end) = range.split_once(':')?;
    let (left, top) = parse_cell_ref(start)?;
    let (right, bottom) = parse_cell_ref(end)?;
    Some(MergeRegion::new(top, left, bottom, right))
}

/// The top-left cell of a reference that may be either `"A1"` or `"A1:B2"`.
pub fn parse_anchor(reference: &str) -> Option<(u32, u32)> {
    let first = reference.split_once(':').map_or(reference, |(start, _)| start);
    parse_cell_ref(first)
}
