//! Hyperlink parsing.
//!
//! `<hyperlink>` elements live after `<sheetData>` in the sheet XML and point
//! either at an external target through the sheet's relationships
//! (`r:id`) or at an internal `location`.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::cell_ref::parse_anchor;
use crate::xml_helpers::{attr_string, attr_string_local};

/// Hyperlink as declared in the sheet XML, before relationship resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHyperlink {
    /// 1-based `(col, row)` of the anchor cell.
    pub anchor: (u32, u32),
    /// Relationship id for external links, e.g. `rId1`.
    pub r_id: Option<String>,
    /// Internal location, e.g. `Sheet2!A1`.
    pub location: Option<String>,
    pub display: Option<String>,
}

/// A hyperlink with its final target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHyperlink {
    pub target: String,
    pub display: Option<String>,
}

/// Parse a single `<hyperlink>` element. Returns `None` without a valid `ref`.
pub fn parse_hyperlink_element(e: &BytesStart<'_>) -> Option<RawHyperlink> {
    let anchor = attr_string(e, b"ref").as_deref().and_then(parse_anchor)?;
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

    Some(RawHyperlink {
        anchor,
        r_id: non_empty(attr_string_local(e, b"id")),
        location: non_empty(attr_string(e, b"location")),
        display: non_empty(attr_string(e, b"display")),
    })
}

/// Parse sheet relationships to get hyperlink targets.
/// Returns a map of rId to target URL. A missing or broken rels part yields
/// an empty map.
pub fn parse_hyperlink_rels<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> HashMap<String, String> {
    let mut rels = HashMap::new();

    let rels_path = construct_rels_path(sheet_path);
    let Ok(file) = archive.by_name(&rels_path) else {
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
                let rel_type = attr_string(e, b"Type").unwrap_or_default();
                if let (true, Some(id), Some(target)) = (
                    rel_type.contains("hyperlink"),
                    attr_string(e, b"Id"),
                    attr_string(e, b"Target"),
                ) {
                    rels.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                tracing::warn!(part = %rels_path, error = %err, "skipping unreadable sheet relationships");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    rels
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
pub fn construct_rels_path(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file_name)) => format!("{dir}/_rels/{file_name}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolve raw hyperlinks against relationship targets, keyed by 1-based
/// `(row, col)`. Links whose `r:id` is unknown and that carry no location
/// are dropped.
pub fn resolve_hyperlinks(
    raw_hyperlinks: &[RawHyperlink],
    rels: &HashMap<String, String>,
) -> HashMap<(u32, u32), ResolvedHyperlink> {
    raw_hyperlinks
        .iter()
        .filter_map(|raw| {
            let external = raw.r_id.as_ref().and_then(|id| rels.get(id)).cloned();
            let target = external.or_else(|| raw.location.clone())?;
            let (col, row) = raw.anchor;
            Some((
                (row, col),
                ResolvedHyperlink {
                    target,
                    display: raw.display.clone(),
                },
            ))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn element(xml: &str) -> BytesStart<'static> {
        let content = xml.to_string();
        let name_len = content.find(' ').unwrap_or(content.len());
        BytesStart::from_content(content, name_len)
    }

    #[test]
    fn test_parse_external_link() {
        let link = parse_hyperlink_element(&element(
            r#"hyperlink ref="B2" r:id="rId1" display="Docs""#,
        ))
        .unwrap();
        assert_eq!(link.anchor, (2, 2));
        assert_eq!(link.r_id.as_deref(), Some("rId1"));
        assert_eq!(link.display.as_deref(), Some("Docs"));
        assert_eq!(link.location, None);
    }

    #[test]
    fn test_missing_ref_is_skipped() {
        assert!(parse_hyperlink_element(&element(r#"hyperlink location="A1""#)).is_none());
    }

    #[test]
    fn test_range_ref_anchors_top_left() {
        let link =
            parse_hyperlink_element(&element(r#"hyperlink ref="C3:D4" location="Other!A1""#))
                .unwrap();
        assert_eq!(link.anchor, (3, 3));
    }

    #[test]
    fn test_construct_rels_path() {
        assert_eq!(
            construct_rels_path("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(construct_rels_path("sheet.xml"), "_rels/sheet.xml.rels");
    }

    #[test]
    fn test_resolve_prefers_relationship_target() {
        let raw = vec![
            RawHyperlink {
                anchor: (1, 2),
                r_id: Some("rId1".into()),
                location: None,
                display: None,
            },
            RawHyperlink {
                anchor: (2, 3),
                r_id: None,
                location: Some("Sheet2!A1".into()),
                display: Some("Jump".into()),
            },
            RawHyperlink {
                anchor: (3, 4),
                r_id: Some("rId404".into()),
                location: None,
                display: None,
            },
        ];
        let rels = HashMap::from([("rId1".to_string(), "https://example.com".to_string())]);

        let resolved = resolve_hyperlinks(&raw, &rels);

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[&(2, 1)].target, "https://example.com");
        assert_eq!(resolved[&(3, 2)].target, "Sheet2!A1");
        assert_eq!(resolved[&(3, 2)].display.as_deref(), Some("Jump"));
    }
}
