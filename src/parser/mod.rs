//! XLSX decoder
//!
//! Opens the ZIP package and decodes every worksheet into the raw workbook
//! model. Optional parts (relationships, shared strings, styles) degrade to
//! defaults with a warning; an unreadable package, a missing workbook part,
//! or malformed workbook/worksheet XML is fatal.

mod relationships;
pub(crate) mod styles;
mod worksheet;

use std::io::{BufReader, Cursor};

use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::DecodeResult;
use crate::hyperlinks::{parse_hyperlink_rels, resolve_hyperlinks};
use crate::types::RawWorkbook;

use relationships::{get_sheet_info, parse_shared_strings, parse_workbook_relationships};
use styles::{parse_date_styles, DateStyles};
use worksheet::{apply_hyperlinks, parse_sheet, CellContext};

/// Decode XLSX bytes into the raw workbook model, sheets in workbook order.
///
/// # Errors
/// Returns an error if the bytes are not a ZIP archive, `xl/workbook.xml` is
/// missing, or the workbook or a worksheet contains malformed XML.
pub fn decode(data: &[u8]) -> DecodeResult<RawWorkbook> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let relationships = parse_workbook_relationships(&mut archive);
    let shared_strings =
        parse_shared_strings(&mut archive, relationships.shared_strings.as_deref());
    let styles = read_date_styles(&mut archive, relationships.styles.as_deref());
    let (sheet_info, date1904) = get_sheet_info(&mut archive, &relationships.worksheets)?;

    tracing::debug!(
        sheets = sheet_info.len(),
        shared_strings = shared_strings.len(),
        date1904,
        "opened workbook"
    );

    let ctx = CellContext {
        shared_strings: &shared_strings,
        styles: &styles,
        date1904,
    };

    let mut sheets = Vec::with_capacity(sheet_info.len());
    for info in sheet_info {
        let parsed = {
            let Ok(file) = archive.by_name(&info.path) else {
                tracing::warn!(sheet = %info.name, part = %info.path, "worksheet part missing, skipping");
                continue;
            };
            let mut xml = Reader::from_reader(BufReader::new(file));
            xml.trim_text(false);
            parse_sheet(&mut xml, &info.name, &ctx)?
        };

        let mut sheet = parsed.sheet;
        if !parsed.hyperlinks.is_empty() {
            let rels = parse_hyperlink_rels(&mut archive, &info.path);
            apply_hyperlinks(&mut sheet, &resolve_hyperlinks(&parsed.hyperlinks, &rels));
        }
        sheets.push(sheet);
    }

    Ok(RawWorkbook { sheets })
}

fn read_date_styles<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> DateStyles {
    let styles_path = path.unwrap_or("xl/styles.xml");
    let Ok(file) = archive.by_name(styles_path) else {
        return DateStyles::default();
    };
    parse_date_styles(BufReader::new(file)).unwrap_or_else(|err| {
        tracing::warn!(part = styles_path, error = %err, "ignoring unreadable styles");
        DateStyles::default()
    })
}
