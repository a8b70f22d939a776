//! Package-level parts: workbook relationships, sheet list, shared strings.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{DecodeError, DecodeResult};
use crate::rich_text::parse_string_item;
use crate::types::RawCell;
use crate::xml_helpers::{attr_bool, attr_string, attr_string_local};

use super::worksheet::SheetInfo;

pub(super) const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Workbook relationships parsed from `xl/_rels/workbook.xml.rels`.
/// Targets are resolved to full package paths.
#[derive(Default, Debug)]
pub(super) struct WorkbookRelationships {
    /// rId -> full path, e.g. `"rId1" -> "xl/worksheets/sheet1.xml"`
    pub worksheets: HashMap<String, String>,
    pub shared_strings: Option<String>,
    pub styles: Option<String>,
}

/// Resolve a relationship target relative to `xl/`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

/// Parse workbook relationships. The part is optional; when it is missing
/// or unreadable, default paths are used downstream.
pub(super) fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> WorkbookRelationships {
    let mut rels = WorkbookRelationships::default();

    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return rels;
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_string(e, b"Id"), attr_string(e, b"Target"))
                {
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();
                    let full_path = resolve_target(&target);

                    if rel_type.ends_with("/worksheet") {
                        rels.worksheets.insert(id, full_path);
                    } else if rel_type.ends_with("/sharedStrings") {
                        rels.shared_strings = Some(full_path);
                    } else if rel_type.ends_with("/styles") {
                        rels.styles = Some(full_path);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable workbook relationships");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    rels
}

/// Sheet names and part paths from `xl/workbook.xml`, in workbook order,
/// plus the `date1904` flag.
///
/// # Errors
/// [`DecodeError::MissingPart`] when the workbook part is absent; XML errors
/// are propagated.
pub(super) fn get_sheet_info<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> DecodeResult<(Vec<SheetInfo>, bool)> {
    let file = archive
        .by_name(WORKBOOK_PART)
        .map_err(|_| DecodeError::MissingPart(WORKBOOK_PART.to_string()))?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut date1904 = false;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) => match e.local_name().as_ref() {
                b"workbookPr" => date1904 = attr_bool(e, b"date1904").unwrap_or(false),
                b"sheet" => {
                    if let Some(name) = attr_string(e, b"name").filter(|n| !n.is_empty()) {
                        let r_id = attr_string_local(e, b"id").unwrap_or_default();
                        // Fall back to the conventional part name.
                        let path = relationships.get(&r_id).cloned().unwrap_or_else(|| {
                            format!("xl/worksheets/sheet{}.xml", sheets.len() + 1)
                        });
                        sheets.push(SheetInfo { name, path });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, date1904))
}

/// Parse the shared string table. The part is optional; a broken table
/// keeps the items read before the fault.
pub(super) fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Vec<RawCell> {
    let sst_path = path.unwrap_or("xl/sharedStrings.xml");
    let Ok(file) = archive.by_name(sst_path) else {
        return Vec::new();
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"si" => {
                match parse_string_item(&mut xml, b"si") {
                    Ok(cell) => strings.push(cell),
                    Err(err) => {
                        tracing::warn!(part = sst_path, error = %err, "shared string table truncated");
                        break;
                    }
                }
            }
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(RawCell::Text(String::new()));
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                tracing::warn!(part = sst_path, error = %err, "shared string table truncated");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    strings
}
