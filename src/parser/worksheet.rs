//! Worksheet parsing - turns one sheet XML part into a [`RawSheet`].

use std::collections::HashMap;
use std::io::BufRead;

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::cell_ref::{parse_cell_ref_bytes, parse_range};
use crate::error::DecodeResult;
use crate::hyperlinks::{parse_hyperlink_element, RawHyperlink, ResolvedHyperlink};
use crate::numfmt::serial_to_datetime;
use crate::rich_text::parse_string_item;
use crate::types::{FormulaCell, HyperlinkCell, RawCell, RawRow, RawSheet};
use crate::xml_helpers::{attr_string, attr_u32, read_text};

use super::styles::DateStyles;

/// Sheet metadata from workbook.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SheetInfo {
    pub name: String,
    pub path: String,
}

/// Workbook-wide lookups needed to decode cell values.
pub(super) struct CellContext<'a> {
    pub shared_strings: &'a [RawCell],
    pub styles: &'a DateStyles,
    pub date1904: bool,
}

/// A decoded sheet plus the hyperlinks still awaiting relationship lookup.
#[derive(Debug)]
pub(super) struct ParsedSheet {
    pub sheet: RawSheet,
    pub hyperlinks: Vec<RawHyperlink>,
}

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    IsoDate,
    Number,
    Unknown(String),
}

pub(super) fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        b"d" => CellTypeTag::IsoDate,
        b"n" => CellTypeTag::Number,
        other => CellTypeTag::Unknown(String::from_utf8_lossy(other).into_owned()),
    }
}

struct CellAttrs {
    /// 1-based `(col, row)` from the `r` attribute.
    position: Option<(u32, u32)>,
    type_tag: CellTypeTag,
    style_idx: Option<u32>,
}

impl CellAttrs {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let mut attrs = Self {
            position: None,
            type_tag: CellTypeTag::Number,
            style_idx: None,
        };
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"r" => attrs.position = parse_cell_ref_bytes(&attr.value),
                b"t" => attrs.type_tag = parse_cell_type_tag(&attr.value),
                b"s" => {
                    attrs.style_idx = std::str::from_utf8(&attr.value)
                        .ok()
                        .and_then(|s| s.parse().ok());
                }
                _ => {}
            }
        }
        attrs
    }
}

/// Child content of a `<c>` element.
#[derive(Default)]
struct CellContent {
    value: Option<String>,
    inline: Option<RawCell>,
    has_formula: bool,
    formula: Option<String>,
}

/// Rows under construction, tracking positions for cells without references.
struct RowBuilder {
    rows: Vec<RawRow>,
    current: Option<RawRow>,
    next_row: u32,
}

impl RowBuilder {
    fn start_row(&mut self, declared: Option<u32>) {
        self.finish_row();
        let index = declared.filter(|&r| r > 0).unwrap_or(self.next_row);
        self.next_row = index.saturating_add(1);
        self.current = Some(RawRow::new(index));
    }

    fn finish_row(&mut self) {
        if let Some(row) = self.current.take() {
            self.rows.push(row);
        }
    }

    fn push_cell(&mut self, position: Option<(u32, u32)>, cell: RawCell) {
        if self.current.is_none() {
            self.start_row(position.map(|(_, row)| row));
        }
        if let Some(row) = self.current.as_mut() {
            let col = position.map_or_else(
                || row.cells.last().map_or(1, |(c, _)| c.saturating_add(1)),
                |(col, _)| col,
            );
            row.cells.push((col, cell));
        }
    }
}

/// Parse a single worksheet.
///
/// # Errors
/// Any XML error in the sheet part.
pub(super) fn parse_sheet<R: BufRead>(
    xml: &mut Reader<R>,
    name: &str,
    ctx: &CellContext<'_>,
) -> DecodeResult<ParsedSheet> {
    let mut sheet = RawSheet::new(name);
    let mut hyperlinks = Vec::new();
    let mut rows = RowBuilder {
        rows: Vec::new(),
        current: None,
        next_row: 1,
    };
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => rows.start_row(attr_u32(e, b"r")),
                b"c" => {
                    let attrs = CellAttrs::from_start(e);
                    let content = read_cell_content(xml)?;
                    rows.push_cell(attrs.position, resolve_cell(&attrs, content, ctx));
                }
                b"hyperlink" => hyperlinks.extend(parse_hyperlink_element(e)),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    rows.start_row(attr_u32(e, b"r"));
                    rows.finish_row();
                }
                b"c" => {
                    let attrs = CellAttrs::from_start(e);
                    rows.push_cell(attrs.position, RawCell::Empty);
                }
                b"mergeCell" => {
                    let region = attr_string(e, b"ref")
                        .as_deref()
                        .and_then(parse_range);
                    match region {
                        Some(region) => sheet.merges.push(region),
                        None => tracing::warn!(sheet = name, "skipping merge with invalid ref"),
                    }
                }
                b"hyperlink" => hyperlinks.extend(parse_hyperlink_element(e)),
                _ => {}
            },
            Event::End(ref e) if e.local_name().as_ref() == b"row" => rows.finish_row(),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    rows.finish_row();

    sheet.rows = rows.rows;
    sheet.rows.sort_by_key(|row| row.index);
    Ok(ParsedSheet { sheet, hyperlinks })
}

/// Read the children of a `<c>` element after its start tag.
fn read_cell_content<R: BufRead>(xml: &mut Reader<R>) -> DecodeResult<CellContent> {
    let mut content = CellContent::default();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"v" => content.value = Some(read_text(xml)?),
                b"f" => {
                    content.has_formula = true;
                    content.formula = Some(read_text(xml)?).filter(|f| !f.is_empty());
                }
                b"is" => content.inline = Some(parse_string_item(xml, b"is")?),
                _ => {
                    let _ = read_text(xml)?;
                }
            },
            // Shared-formula followers: `<f t="shared" si="0"/>`
            Event::Empty(ref e) if e.local_name().as_ref() == b"f" => content.has_formula = true,
            Event::End(ref e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(content)
}

fn resolve_cell(attrs: &CellAttrs, content: CellContent, ctx: &CellContext<'_>) -> RawCell {
    let value = resolve_value(attrs, content.value, content.inline, ctx);
    if !content.has_formula {
        return value;
    }
    RawCell::Formula(FormulaCell {
        formula: content.formula,
        result: (!matches!(value, RawCell::Empty)).then(|| Box::new(value)),
    })
}

fn resolve_value(
    attrs: &CellAttrs,
    value: Option<String>,
    inline: Option<RawCell>,
    ctx: &CellContext<'_>,
) -> RawCell {
    if let CellTypeTag::Inline = attrs.type_tag {
        return inline
            .or_else(|| value.map(RawCell::Text))
            .unwrap_or(RawCell::Empty);
    }
    let Some(value) = value else {
        return RawCell::Empty;
    };

    match &attrs.type_tag {
        CellTypeTag::Shared => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| ctx.shared_strings.get(idx).cloned())
            .unwrap_or_else(|| RawCell::Unsupported(format!("shared string index {value:?}"))),
        CellTypeTag::Str | CellTypeTag::Inline => RawCell::Text(value),
        CellTypeTag::Bool => {
            let truthy = matches!(value.trim(), "1" | "true");
            RawCell::Text(if truthy { "TRUE" } else { "FALSE" }.to_string())
        }
        CellTypeTag::Error => RawCell::Error(value.trim_start_matches('#').to_string()),
        CellTypeTag::IsoDate => parse_iso_datetime(&value)
            .map_or_else(|| RawCell::Unsupported(format!("date value {value:?}")), RawCell::Date),
        CellTypeTag::Number => match value.trim().parse::<f64>() {
            Ok(n) if ctx.styles.is_date(attrs.style_idx) => {
                serial_to_datetime(n, ctx.date1904).map_or(RawCell::Number(n), RawCell::Date)
            }
            Ok(n) => RawCell::Number(n),
            Err(_) => RawCell::Unsupported(format!("numeric value {value:?}")),
        },
        CellTypeTag::Unknown(tag) => RawCell::Unsupported(format!("cell type {tag:?}")),
    }
}

/// ISO 8601 values of `t="d"` cells: a date, or a date and time.
fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Wrap linked cells in [`RawCell::Hyperlink`].
///
/// Only text and empty cells are wrapped; a link on a number, date, or
/// formula leaves the value untouched. Links on cells that are not
/// physically present are ignored.
pub(super) fn apply_hyperlinks(
    sheet: &mut RawSheet,
    links: &HashMap<(u32, u32), ResolvedHyperlink>,
) {
    if links.is_empty() {
        return;
    }
    for row in &mut sheet.rows {
        for (col, cell) in &mut row.cells {
            let Some(link) = links.get(&(row.index, *col)) else {
                continue;
            };
            let text = match cell {
                RawCell::Text(s) => Some(s.clone()),
                RawCell::RichText(runs) => Some(runs.iter().map(|r| r.text.as_str()).collect()),
                RawCell::Empty => link.display.clone(),
                _ => continue,
            };
            *cell = RawCell::Hyperlink(HyperlinkCell {
                target: link.target.clone(),
                text,
            });
        }
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
    use crate::types::{MergeRegion, RichTextRun};

    fn parse_with(xml: &str, shared: &[RawCell], styles: &DateStyles) -> ParsedSheet {
        let ctx = CellContext {
            shared_strings: shared,
            styles,
            date1904: false,
        };
        let mut reader = Reader::from_str(xml);
        parse_sheet(&mut reader, "Sheet1", &ctx).unwrap()
    }

    fn parse(xml: &str) -> RawSheet {
        parse_with(xml, &[], &DateStyles::default()).sheet
    }

    fn sheet_xml(sheet_data: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
        )
    }

    #[test]
    fn test_typed_cells() {
        let shared = vec![RawCell::from("shared"), RawCell::RichText(vec![RichTextRun::new("rich")])];
        let xml = sheet_xml(
            r#"<row r="1">
                <c r="A1" t="s"><v>0</v></c>
                <c r="B1" t="s"><v>1</v></c>
                <c r="C1"><v>42.5</v></c>
                <c r="D1" t="b"><v>1</v></c>
                <c r="E1" t="e"><v>#DIV/0!</v></c>
                <c r="F1" t="str"><v>plain</v></c>
                <c r="G1" t="inlineStr"><is><t>inline</t></is></c>
                <c r="H1" t="d"><v>2024-01-15T00:00:00</v></c>
                <c r="I1" t="x"><v>?</v></c>
                <c r="J1" s="3"/>
            </row>"#,
        );

        let sheet = parse_with(&xml, &shared, &DateStyles::default()).sheet;
        let row = &sheet.rows[0];

        assert_eq!(row.index, 1);
        assert_eq!(row.get(1), Some(&RawCell::from("shared")));
        assert_eq!(row.get(2), Some(&shared[1]));
        assert_eq!(row.get(3), Some(&RawCell::Number(42.5)));
        assert_eq!(row.get(4), Some(&RawCell::from("TRUE")));
        assert_eq!(row.get(5), Some(&RawCell::Error("DIV/0!".to_string())));
        assert_eq!(row.get(6), Some(&RawCell::from("plain")));
        assert_eq!(row.get(7), Some(&RawCell::from("inline")));
        let expected_date = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(row.get(8), Some(&RawCell::Date(expected_date)));
        assert!(matches!(row.get(9), Some(RawCell::Unsupported(_))));
        assert_eq!(row.get(10), Some(&RawCell::Empty));
    }

    #[test]
    fn test_formula_keeps_cached_result() {
        let xml = sheet_xml(
            r#"<row r="2">
                <c r="A2"><f>SUM(B2:C2)</f><v>6</v></c>
                <c r="B2" t="str"><f>A1&amp;"x"</f><v>ax</v></c>
                <c r="C2"><f t="shared" si="0"/><v>3</v></c>
                <c r="D2"><f>NOW()</f></c>
            </row>"#,
        );
        let sheet = parse(&xml);
        let row = &sheet.rows[0];

        assert_eq!(
            row.get(1),
            Some(&RawCell::Formula(FormulaCell::new("SUM(B2:C2)", Some(RawCell::Number(6.0)))))
        );
        assert_eq!(
            row.get(2),
            Some(&RawCell::Formula(FormulaCell::new("A1&\"x\"", Some(RawCell::from("ax")))))
        );
        assert_eq!(
            row.get(3),
            Some(&RawCell::Formula(FormulaCell {
                formula: None,
                result: Some(Box::new(RawCell::Number(3.0))),
            }))
        );
        assert_eq!(
            row.get(4),
            Some(&RawCell::Formula(FormulaCell::new("NOW()", None)))
        );
    }

    #[test]
    fn test_rows_gaps_and_merges() {
        let xml = r#"<worksheet><sheetData>
                <row r="1"><c r="A1" t="inlineStr"><is><t>H</t></is></c></row>
                <row r="4"><c r="C4"><v>1</v></c></row>
                <row r="6" spans="1:3"/>
            </sheetData>
            <mergeCells count="2"><mergeCell ref="A1:B2"/><mergeCell ref="bogus"/></mergeCells>
            </worksheet>"#;
        let sheet = parse(xml);

        let indices: Vec<u32> = sheet.rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, [1, 4, 6]);
        assert_eq!(sheet.rows[1].cells[0].0, 3);
        assert!(sheet.rows[2].cells.is_empty());
        assert_eq!(sheet.merges, [MergeRegion::new(1, 1, 2, 2)]);
    }

    #[test]
    fn test_cells_without_references() {
        let xml = sheet_xml(
            r#"<row><c t="inlineStr"><is><t>a</t></is></c><c><v>2</v></c></row><row><c><v>3</v></c></row>"#,
        );
        let sheet = parse(&xml);
        assert_eq!(sheet.rows[0].index, 1);
        assert_eq!(sheet.rows[0].cells[1].0, 2);
        assert_eq!(sheet.rows[1].index, 2);
        assert_eq!(sheet.rows[1].get(1), Some(&RawCell::Number(3.0)));
    }

    #[test]
    fn test_reference_past_grid_is_positional() {
        let xml = sheet_xml(r#"<row r="1"><c r="A1"><v>1</v></c><c r="XFE1"><v>2</v></c></row>"#);
        let sheet = parse(&xml);
        assert_eq!(sheet.rows[0].cells[1].0, 2);
        assert_eq!(sheet.rows[0].get(2), Some(&RawCell::Number(2.0)));
    }

    #[test]
    fn test_date_styled_number() {
        let styles = crate::parser::styles::parse_date_styles(
            r#"<styleSheet><cellXfs><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#
                .as_bytes(),
        )
        .unwrap();
        let xml = sheet_xml(r#"<row r="1"><c r="A1" s="1"><v>45306</v></c><c r="B1" s="0"><v>45306</v></c></row>"#);

        let sheet = parse_with(&xml, &[], &styles).sheet;
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(sheet.rows[0].get(1), Some(&RawCell::Date(expected)));
        assert_eq!(sheet.rows[0].get(2), Some(&RawCell::Number(45306.0)));
    }

    #[test]
    fn test_hyperlinks_collected_and_applied() {
        let xml = r#"<worksheet><sheetData>
                <row r="1"><c r="A1" t="inlineStr"><is><t>Docs</t></is></c><c r="B1"><v>5</v></c><c r="C1"/></row>
            </sheetData>
            <hyperlinks>
                <hyperlink ref="A1" r:id="rId1"/>
                <hyperlink ref="B1" location="Other!A1"/>
                <hyperlink ref="C1" location="Other!B2" display="Jump"/>
            </hyperlinks></worksheet>"#;
        let ParsedSheet {
            mut sheet,
            hyperlinks,
        } = parse_with(xml, &[], &DateStyles::default());
        assert_eq!(hyperlinks.len(), 3);

        let rels = HashMap::from([("rId1".to_string(), "https://example.com".to_string())]);
        let resolved = crate::hyperlinks::resolve_hyperlinks(&hyperlinks, &rels);
        apply_hyperlinks(&mut sheet, &resolved);

        let row = &sheet.rows[0];
        assert_eq!(
            row.get(1),
            Some(&RawCell::Hyperlink(HyperlinkCell {
                target: "https://example.com".to_string(),
                text: Some("Docs".to_string()),
            }))
        );
        assert_eq!(row.get(2), Some(&RawCell::Number(5.0)));
        assert_eq!(
            row.get(3),
            Some(&RawCell::Hyperlink(HyperlinkCell {
                target: "Other!B2".to_string(),
                text: Some("Jump".to_string()),
            }))
        );
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let ctx = CellContext {
            shared_strings: &[],
            styles: &DateStyles::default(),
            date1904: false,
        };
        let mut reader = Reader::from_str("<worksheet><sheetData><row></sheetData>");
        assert!(parse_sheet(&mut reader, "Broken", &ctx).is_err());
    }
}
