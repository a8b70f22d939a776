//! The extraction pipeline: raw workbook in, renderer-ready workbook out.
//!
//! Per sheet: scan extent, resolve merges, segment rows, build tables.
//! Sheets share nothing, so with the `parallel` feature they run on the
//! rayon pool. Output order always follows input order.

use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::build::build_table;
use crate::error::{ExtractError, Result};
use crate::extent::scan_extent;
use crate::merge::MergeMap;
use crate::normalize::Normalizer;
use crate::options::ExtractOptions;
use crate::segment::{segment_sheet, SheetContext};
use crate::types::{RawRow, RawSheet, RawWorkbook, Sheet, Workbook};

/// Extract the tables of one sheet. The result may hold zero tables.
#[must_use]
pub fn extract_sheet(sheet: &RawSheet, options: &ExtractOptions) -> Sheet {
    let _span = tracing::debug_span!("sheet", name = %sheet.name).entered();

    let extent = scan_extent(sheet);
    let normalizer = Normalizer::new(&options.date_format);

    let rows_by_index: HashMap<u32, &RawRow> =
        sheet.rows.iter().map(|row| (row.index, row)).collect();
    let merges = MergeMap::resolve(&sheet.merges, extent, &normalizer, |row, col| {
        rows_by_index.get(&row).and_then(|r| r.get(col))
    });

    let ctx = SheetContext {
        extent,
        merges: &merges,
        normalizer,
        options,
    };
    let tables = segment_sheet(sheet, &ctx)
        .iter()
        .filter_map(|t| build_table(t, &options.header_fallback_prefix))
        .collect();

    Sheet {
        name: sheet.name.clone(),
        tables,
    }
}

/// Extract every sheet and keep only those with at least one table.
///
/// # Errors
/// Returns [`ExtractError::EmptyResult`] when no table survives on any sheet.
pub fn extract_workbook(
    file_name: &str,
    workbook: &RawWorkbook,
    options: &ExtractOptions,
) -> Result<Workbook> {
    #[cfg(feature = "parallel")]
    let sheets: Vec<Sheet> = workbook
        .sheets
        .par_iter()
        .map(|sheet| extract_sheet(sheet, options))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let sheets: Vec<Sheet> = workbook
        .sheets
        .iter()
        .map(|sheet| extract_sheet(sheet, options))
        .collect();

    let sheets: Vec<Sheet> = sheets.into_iter().filter(|s| !s.tables.is_empty()).collect();
    if sheets.is_empty() {
        return Err(ExtractError::EmptyResult);
    }

    tracing::debug!(
        file = file_name,
        sheets = sheets.len(),
        "extracted workbook"
    );
    Ok(Workbook {
        file_name: file_name.to_string(),
        sheets,
    })
}

/// Decode XLSX bytes and extract their tables.
///
/// # Errors
/// [`ExtractError::UnreadableWorkbook`] if the bytes are not a readable XLSX
/// package, [`ExtractError::EmptyResult`] if no table survives.
pub fn process_xlsx(file_name: &str, data: &[u8], options: &ExtractOptions) -> Result<Workbook> {
    let raw = crate::parser::decode(data)?;
    extract_workbook(file_name, &raw, options)
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
    use crate::types::{MergeRegion, NormalizedScalar, RawCell};

    fn two_table_sheet(name: &str) -> RawSheet {
        RawSheet::new(name)
            .row(RawRow::from_values(1, ["A", "B"]))
            .row(RawRow::from_values(2, ["1", "2"]))
            .row(RawRow::new(3).cell(1, RawCell::Empty))
            .row(RawRow::from_values(4, ["C", "D"]))
            .row(RawRow::from_values(5, ["3", "4"]))
    }

    #[test]
    fn test_two_tables_one_row_each() {
        let sheet = extract_sheet(&two_table_sheet("S"), &ExtractOptions::default());
        assert_eq!(sheet.tables.len(), 2);
        assert_eq!(sheet.tables[0].id, "table-1");
        assert_eq!(sheet.tables[1].id, "table-4");
        assert!(sheet.tables.iter().all(|t| t.rows.len() == 1));
    }

    #[test]
    fn test_blank_sheets_are_excluded() {
        let workbook = RawWorkbook {
            sheets: vec![
                RawSheet::new("Blank").row(RawRow::new(1).cell(1, " ")),
                two_table_sheet("Data"),
            ],
        };
        let out = extract_workbook("book.xlsx", &workbook, &ExtractOptions::default()).unwrap();
        assert_eq!(out.file_name, "book.xlsx");
        assert_eq!(out.sheets.len(), 1);
        assert_eq!(out.sheets[0].name, "Data");
        assert_eq!(out.table_count(), 2);
    }

    #[test]
    fn test_no_tables_is_empty_result() {
        let workbook = RawWorkbook {
            sheets: vec![RawSheet::new("A"), RawSheet::new("B").row(RawRow::from_values(1, ["H"]))],
        };
        let err = extract_workbook("x.xlsx", &workbook, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyResult));

        let none = RawWorkbook { sheets: Vec::new() };
        assert!(matches!(
            extract_workbook("x.xlsx", &none, &ExtractOptions::default()),
            Err(ExtractError::EmptyResult)
        ));
    }

    #[test]
    fn test_sheet_order_is_preserved() {
        let workbook = RawWorkbook {
            sheets: (0..8).map(|i| two_table_sheet(&format!("S{i}"))).collect(),
        };
        let out = extract_workbook("x.xlsx", &workbook, &ExtractOptions::default()).unwrap();
        let names: Vec<&str> = out.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["S0", "S1", "S2", "S3", "S4", "S5", "S6", "S7"]);
    }

    #[test]
    fn test_merge_origin_in_output() {
        let sheet = RawSheet::new("S")
            .row(RawRow::from_values(1, ["H1", "H2", "H3"]))
            .row(RawRow::new(2).cell(1, "a").cell(2, "X"))
            .row(RawRow::new(3).cell(1, "b").cell(3, "hidden"))
            .merge(MergeRegion::new(2, 2, 3, 3));

        let out = extract_sheet(&sheet, &ExtractOptions::default());
        let rows = &out.tables[0].rows;

        let origin = &rows[0].cells["col2"];
        assert_eq!(origin.value, NormalizedScalar::Text("X".to_string()));
        assert_eq!((origin.row_span, origin.col_span), (Some(2), Some(2)));
        assert!(!rows[0].cells.contains_key("col3"));
        assert!(!rows[1].cells.contains_key("col2"));
        assert!(!rows[1].cells.contains_key("col3"));
    }
}
