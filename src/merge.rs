//! Merged region resolution.
//!
//! Expands a sheet's merge declarations into a per-cell map. Each stamped
//! cell is either the region's origin (top-left, carrying the value and the
//! span) or covered (suppressed from output). Regions are applied in
//! declaration order, so for overlapping declarations the last one wins. A
//! covered cell whose origin was overwritten stays covered but no longer
//! contributes merged content to its row.
//!
//! Stamping stops at the sheet's physical extent: rows and columns past the
//! last physical cell are never visited by the segmenter.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::extent::SheetExtent;
use crate::normalize::Normalizer;
use crate::types::{MergeRegion, NormalizedScalar, RawCell};

/// What occupies one grid position of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellSlot {
    /// Top-left cell of a merge region.
    Origin {
        value: NormalizedScalar,
        row_span: u32,
        col_span: u32,
    },
    /// Inside a merge region but not its origin. `origin` is `(row, col)`.
    Covered { origin: (u32, u32) },
    /// Not part of any merge region.
    Plain,
}

static PLAIN: CellSlot = CellSlot::Plain;

/// Resolved merge layout for one sheet.
#[derive(Debug, Clone, Default)]
pub struct MergeMap {
    slots: HashMap<(u32, u32), CellSlot>,
    /// Rows occupied by a region whose origin value is non-empty.
    occupied_rows: HashSet<u32>,
    /// Surviving origin columns per row, ascending.
    origin_cols: BTreeMap<u32, Vec<u32>>,
}

impl MergeMap {
    /// Resolve `regions` against a 1-based `(row, col)` cell accessor.
    pub fn resolve<'c, F>(
        regions: &[MergeRegion],
        extent: SheetExtent,
        normalizer: &Normalizer<'_>,
        cell_at: F,
    ) -> Self
    where
        F: Fn(u32, u32) -> Option<&'c RawCell>,
    {
        let mut map = Self::default();
        for declared in regions {
            let region =
                MergeRegion::new(declared.top, declared.left, declared.bottom, declared.right);
            let value = cell_at(region.top, region.left)
                .map(|cell| normalizer.normalize_at(cell, region.top, region.left))
                .unwrap_or_default();
            map.stamp(&region, value, extent);
        }
        map.rebuild_indexes();
        map
    }

    fn stamp(&mut self, region: &MergeRegion, value: NormalizedScalar, extent: SheetExtent) {
        let origin = (region.top, region.left);
        let last_row = region.bottom.min(extent.max_row.max(region.top));
        let last_col = region.right.min(extent.max_col.max(region.left));
        for row in region.top..=last_row {
            for col in region.left..=last_col {
                let slot = if (row, col) == origin {
                    CellSlot::Origin {
                        value: value.clone(),
                        row_span: region.row_span(),
                        col_span: region.col_span(),
                    }
                } else {
                    CellSlot::Covered { origin }
                };
                self.slots.insert((row, col), slot);
            }
        }
    }

    // Computed after all stamps so that overwritten origins no longer count.
    fn rebuild_indexes(&mut self) {
        let mut rows = HashSet::new();
        let mut origin_cols: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (&(row, col), slot) in &self.slots {
            let non_empty = match slot {
                CellSlot::Origin { value, .. } => {
                    origin_cols.entry(row).or_default().push(col);
                    !value.is_empty()
                }
                CellSlot::Covered { origin } => self
                    .live_origin_value(*origin, row, col)
                    .is_some_and(|value| !value.is_empty()),
                CellSlot::Plain => false,
            };
            if non_empty {
                rows.insert(row);
            }
        }
        for cols in origin_cols.values_mut() {
            cols.sort_unstable();
        }
        self.occupied_rows = rows;
        self.origin_cols = origin_cols;
    }

    /// Value of the origin at `origin` if its region still reaches `(row, col)`.
    fn live_origin_value(
        &self,
        origin: (u32, u32),
        row: u32,
        col: u32,
    ) -> Option<&NormalizedScalar> {
        match self.slots.get(&origin) {
            Some(CellSlot::Origin {
                value,
                row_span,
                col_span,
            }) => {
                let (top, left) = origin;
                let region = MergeRegion::new(
                    top,
                    left,
                    top.saturating_add(row_span.saturating_sub(1)),
                    left.saturating_add(col_span.saturating_sub(1)),
                );
                region.contains(row, col).then_some(value)
            }
            _ => None,
        }
    }

    /// The slot at a 1-based position.
    #[must_use]
    pub fn slot(&self, row: u32, col: u32) -> &CellSlot {
        self.slots.get(&(row, col)).unwrap_or(&PLAIN)
    }

    /// Whether a non-empty merged cell extends into `row`.
    #[must_use]
    pub fn row_has_merged_content(&self, row: u32) -> bool {
        self.occupied_rows.contains(&row)
    }

    /// Origins whose top-left cell lies in `row`, as `(col, value, (row_span, col_span))`
    /// in column order.
    pub fn origins_in_row(
        &self,
        row: u32,
    ) -> impl Iterator<Item = (u32, &NormalizedScalar, (u32, u32))> + '_ {
        self.origin_cols
            .get(&row)
            .into_iter()
            .flatten()
            .filter_map(move |&col| match self.slot(row, col) {
                CellSlot::Origin {
                    value,
                    row_span,
                    col_span,
                } => Some((col, value, (*row_span, *col_span))),
                _ => None,
            })
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

    fn resolve_with(regions: &[MergeRegion], cells: &[((u32, u32), RawCell)]) -> MergeMap {
        let normalizer = Normalizer::default();
        let extent = SheetExtent {
            max_row: 10,
            max_col: 10,
        };
        MergeMap::resolve(regions, extent, &normalizer, |row, col| {
            cells
                .iter()
                .find(|(pos, _)| *pos == (row, col))
                .map(|(_, cell)| cell)
        })
    }

    #[test]
    fn test_square_region_has_single_origin() {
        let map = resolve_with(
            &[MergeRegion::new(2, 2, 3, 3)],
            &[((2, 2), RawCell::from("X"))],
        );

        assert_eq!(
            map.slot(2, 2),
            &CellSlot::Origin {
                value: NormalizedScalar::Text("X".to_string()),
                row_span: 2,
                col_span: 2,
            }
        );
        for pos in [(2, 3), (3, 2), (3, 3)] {
            assert_eq!(map.slot(pos.0, pos.1), &CellSlot::Covered { origin: (2, 2) });
        }
        assert_eq!(map.slot(1, 1), &CellSlot::Plain);
        assert_eq!(map.slot(4, 4), &CellSlot::Plain);
    }

    #[test]
    fn test_origin_value_is_normalized() {
        let map = resolve_with(
            &[MergeRegion::new(1, 1, 1, 4)],
            &[((1, 1), RawCell::from("  Title  "))],
        );
        let CellSlot::Origin { value, col_span, .. } = map.slot(1, 1) else {
            panic!("expected origin");
        };
        assert_eq!(value, &NormalizedScalar::Text("Title".to_string()));
        assert_eq!(*col_span, 4);
    }

    #[test]
    fn test_missing_origin_cell_gives_empty_value() {
        let map = resolve_with(&[MergeRegion::new(1, 1, 2, 1)], &[]);
        assert_eq!(
            map.slot(1, 1),
            &CellSlot::Origin {
                value: NormalizedScalar::Empty,
                row_span: 2,
                col_span: 1,
            }
        );
        assert!(!map.row_has_merged_content(2));
    }

    #[test]
    fn test_overlap_last_declaration_wins() {
        let map = resolve_with(
            &[MergeRegion::new(1, 1, 2, 2), MergeRegion::new(2, 2, 3, 3)],
            &[((1, 1), RawCell::from("first")), ((2, 2), RawCell::from("second"))],
        );

        assert!(matches!(map.slot(1, 1), CellSlot::Origin { .. }));
        assert!(matches!(
            map.slot(2, 2),
            CellSlot::Origin { value: NormalizedScalar::Text(v), .. } if v == "second"
        ));
        assert_eq!(map.slot(3, 3), &CellSlot::Covered { origin: (2, 2) });
        assert_eq!(map.slot(1, 2), &CellSlot::Covered { origin: (1, 1) });
    }

    #[test]
    fn test_overwritten_origin_releases_its_rows() {
        // The second region takes over (1,1) with a one-row span, orphaning
        // the first region's covered cells in rows 2 and 3.
        let map = resolve_with(
            &[MergeRegion::new(1, 1, 3, 1), MergeRegion::new(1, 1, 1, 2)],
            &[((1, 1), RawCell::from("head"))],
        );

        assert!(matches!(
            map.slot(1, 1),
            CellSlot::Origin { row_span: 1, col_span: 2, .. }
        ));
        assert_eq!(map.slot(2, 1), &CellSlot::Covered { origin: (1, 1) });
        assert!(map.row_has_merged_content(1));
        assert!(!map.row_has_merged_content(2));
        assert!(!map.row_has_merged_content(3));
    }

    #[test]
    fn test_origins_in_row_are_column_ordered() {
        let map = resolve_with(
            &[
                MergeRegion::new(2, 5, 2, 6),
                MergeRegion::new(2, 1, 3, 2),
                MergeRegion::new(4, 1, 4, 2),
            ],
            &[((2, 1), RawCell::from("a")), ((2, 5), RawCell::Number(5.0))],
        );

        let origins: Vec<_> = map.origins_in_row(2).collect();
        assert_eq!(
            origins,
            vec![
                (1, &NormalizedScalar::Text("a".to_string()), (2, 2)),
                (5, &NormalizedScalar::Number(5.0), (1, 2)),
            ]
        );
        assert_eq!(map.origins_in_row(3).count(), 0);
        assert_eq!(map.origins_in_row(4).count(), 1);
    }

    #[test]
    fn test_origin_overwritten_by_cover_is_not_listed() {
        let map = resolve_with(
            &[MergeRegion::new(2, 2, 2, 3), MergeRegion::new(1, 1, 2, 2)],
            &[((1, 1), RawCell::from("outer")), ((2, 2), RawCell::from("inner"))],
        );
        assert_eq!(map.slot(2, 2), &CellSlot::Covered { origin: (1, 1) });
        assert_eq!(map.origins_in_row(2).count(), 0);
        assert!(map.row_has_merged_content(2));
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let region = MergeRegion::new(3, 3, 2, 2);
        assert_eq!(region, MergeRegion::new(2, 2, 3, 3));
        assert_eq!(region.row_span(), 2);
        assert_eq!(region.col_span(), 2);
    }

    #[test]
    fn test_stamping_stops_at_extent() {
        let normalizer = Normalizer::default();
        let cells = [RawCell::from("wide")];
        let extent = SheetExtent {
            max_row: 1,
            max_col: 3,
        };
        let region = MergeRegion::new(1, 1, 1_048_576, 16_384);
        let map = MergeMap::resolve(&[region], extent, &normalizer, |row, col| {
            ((row, col) == (1, 1)).then(|| &cells[0])
        });

        assert!(matches!(
            map.slot(1, 1),
            CellSlot::Origin { row_span: 1_048_576, col_span: 16_384, .. }
        ));
        assert_eq!(map.slot(1, 3), &CellSlot::Covered { origin: (1, 1) });
        assert_eq!(map.slot(1, 4), &CellSlot::Plain);
        assert_eq!(map.slot(2, 1), &CellSlot::Plain);
    }

    #[test]
    fn test_rows_with_merged_content() {
        let map = resolve_with(
            &[MergeRegion::new(2, 1, 4, 1)],
            &[((2, 1), RawCell::from("tall"))],
        );
        assert!(!map.row_has_merged_content(1));
        assert!(map.row_has_merged_content(2));
        assert!(map.row_has_merged_content(3));
        assert!(map.row_has_merged_content(4));
        assert!(!map.row_has_merged_content(5));
    }
}
