//! Test fixture builders for generating XLSX files in memory
//!
//! Builds minimal but valid packages so integration tests can exercise the
//! full decode and extract pipeline without binary fixtures on disk.
//!
//! # Example
//!
//! ```ignore
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Sales")
//!             .cell("A1", "Region")
//!             .cell("B1", "Total")
//!             .cell("A2", "North")
//!             .cell("B2", 1200.0)
//!             .merge("A4:B5"),
//!     )
//!     .build();
//! ```

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

/// Style index of the built-in short date format (`numFmtId` 14).
pub const DATE_STYLE: u32 = 1;
/// Style index of a custom `yyyy-mm-dd` format.
pub const CUSTOM_DATE_STYLE: u32 = 2;
/// Style index of a custom non-date format (`0.000`).
pub const DECIMAL_STYLE: u32 = 3;

/// Value written into a `<c>` element.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Shared string (`t="s"`)
    String(String),
    /// Inline string (`t="inlineStr"`)
    InlineString(String),
    /// Shared string made of runs
    RichText(Vec<String>),
    Number(f64),
    /// Number carrying a style index, e.g. [`DATE_STYLE`]
    Styled(f64, u32),
    /// ISO 8601 value (`t="d"`)
    IsoDate(String),
    Boolean(bool),
    /// Error code including the leading `#`
    Error(String),
    /// Formula with an optional cached numeric result
    Formula(String, Option<f64>),
    /// Formula with a cached string result (`t="str"`)
    FormulaText(String, String),
    /// `<c r=".."/>` with no payload
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

#[derive(Debug, Clone)]
enum Link {
    External(String),
    Location(String),
}

#[derive(Debug, Clone)]
struct LinkDef {
    cell_ref: String,
    link: Link,
    display: Option<String>,
}

/// Builder for a single worksheet
#[derive(Debug, Clone)]
pub struct SheetBuilder {
    name: String,
    cells: Vec<(String, CellValue)>,
    blank_rows: Vec<u32>,
    merges: Vec<String>,
    links: Vec<LinkDef>,
}

impl SheetBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: Vec::new(),
            blank_rows: Vec::new(),
            merges: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add a cell at an A1 reference.
    pub fn cell(mut self, cell_ref: &str, value: impl Into<CellValue>) -> Self {
        self.cells.push((cell_ref.to_string(), value.into()));
        self
    }

    /// Fill consecutive cells of one row, starting at column A.
    pub fn row<V: Into<CellValue>>(mut self, row: u32, values: impl IntoIterator<Item = V>) -> Self {
        for (i, value) in values.into_iter().enumerate() {
            let cell_ref = format!("{}{row}", col_num_to_letter(i as u32 + 1));
            self.cells.push((cell_ref, value.into()));
        }
        self
    }

    /// Emit an explicit `<row r="N"/>` with no cells.
    pub fn blank_row(mut self, row: u32) -> Self {
        self.blank_rows.push(row);
        self
    }

    /// Add a merge range like `"B2:C3"`.
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    /// Attach an external hyperlink through the sheet relationships part.
    pub fn hyperlink(mut self, cell_ref: &str, url: &str) -> Self {
        self.links.push(LinkDef {
            cell_ref: cell_ref.to_string(),
            link: Link::External(url.to_string()),
            display: None,
        });
        self
    }

    /// Attach an in-workbook hyperlink (`location` attribute).
    pub fn link_location(mut self, cell_ref: &str, location: &str, display: Option<&str>) -> Self {
        self.links.push(LinkDef {
            cell_ref: cell_ref.to_string(),
            link: Link::Location(location.to_string()),
            display: display.map(str::to_string),
        });
        self
    }

    fn has_external_links(&self) -> bool {
        self.links
            .iter()
            .any(|l| matches!(l.link, Link::External(_)))
    }
}

/// Builder for a complete XLSX package
#[derive(Debug, Clone, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    date1904: bool,
    overrides: Vec<(String, Vec<u8>)>,
    omitted: Vec<String>,
}

impl XlsxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Use the 1904 date system.
    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    /// Replace a generated part (or add a new one) with raw bytes.
    pub fn part(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.overrides.push((path.to_string(), content.into()));
        self
    }

    /// Leave a generated part out of the package.
    pub fn omit(mut self, path: &str) -> Self {
        self.omitted.push(path.to_string());
        self
    }

    /// Build the XLSX file as bytes
    pub fn build(&self) -> Vec<u8> {
        let mut strings = SharedStrings::default();
        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

        let sheet_xml: Vec<String> = self
            .sheets
            .iter()
            .map(|sheet| generate_sheet_xml(sheet, &mut strings))
            .collect();

        parts.push((
            "[Content_Types].xml".to_string(),
            generate_content_types(self.sheets.len()).into_bytes(),
        ));
        parts.push(("_rels/.rels".to_string(), ROOT_RELS.as_bytes().to_vec()));
        parts.push((
            "xl/_rels/workbook.xml.rels".to_string(),
            generate_workbook_rels(self.sheets.len()).into_bytes(),
        ));
        parts.push((
            "xl/workbook.xml".to_string(),
            generate_workbook(&self.sheets, self.date1904).into_bytes(),
        ));
        parts.push(("xl/styles.xml".to_string(), STYLES.as_bytes().to_vec()));
        parts.push((
            "xl/sharedStrings.xml".to_string(),
            strings.to_xml().into_bytes(),
        ));
        for (i, (sheet, xml)) in self.sheets.iter().zip(sheet_xml).enumerate() {
            let n = i + 1;
            parts.push((format!("xl/worksheets/sheet{n}.xml"), xml.into_bytes()));
            if sheet.has_external_links() {
                parts.push((
                    format!("xl/worksheets/_rels/sheet{n}.xml.rels"),
                    generate_sheet_rels(sheet).into_bytes(),
                ));
            }
        }

        for (path, content) in &self.overrides {
            match parts.iter_mut().find(|(p, _)| p == path) {
                Some(part) => part.1 = content.clone(),
                None => parts.push((path.clone(), content.clone())),
            }
        }
        parts.retain(|(path, _)| !self.omitted.contains(path));

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (path, content) in parts {
            zip.start_file(path, options).unwrap();
            zip.write_all(&content).unwrap();
        }
        zip.finish().expect("Failed to finish ZIP").into_inner()
    }
}

// ============================================================================
// XML generation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum SharedItem {
    Plain(String),
    Rich(Vec<String>),
}

#[derive(Default)]
struct SharedStrings {
    items: Vec<SharedItem>,
}

impl SharedStrings {
    fn index_of(&mut self, item: SharedItem) -> usize {
        if let Some(idx) = self.items.iter().position(|i| *i == item) {
            return idx;
        }
        self.items.push(item);
        self.items.len() - 1
    }

    fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(&format!(
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
            self.items.len()
        ));
        for item in &self.items {
            match item {
                SharedItem::Plain(s) => {
                    xml.push_str(&format!(
                        r#"<si><t xml:space="preserve">{}</t></si>"#,
                        escape_xml(s)
                    ));
                }
                SharedItem::Rich(runs) => {
                    xml.push_str("<si>");
                    for run in runs {
                        xml.push_str(&format!(
                            r#"<r><rPr><b/></rPr><t xml:space="preserve">{}</t></r>"#,
                            escape_xml(run)
                        ));
                    }
                    xml.push_str(r#"<rPh sb="0" eb="1"><t>ignored</t></rPh></si>"#);
                }
            }
        }
        xml.push_str("</sst>");
        xml
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="2"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/><numFmt numFmtId="165" formatCode="0.000"/></numFmts><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

fn generate_content_types(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    );
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    xml.push_str("</Types>");
    xml
}

/// Sheets get `rId1..rIdN`; styles and shared strings follow.
fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    ));
    xml.push_str("</Relationships>");
    xml
}

fn generate_workbook(sheets: &[SheetBuilder], date1904: bool) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    if date1904 {
        xml.push_str(r#"<workbookPr date1904="1"/>"#);
    }
    xml.push_str("<sheets>");
    for (i, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(&sheet.name),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn generate_sheet_rels(sheet: &SheetBuilder) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    let externals = sheet.links.iter().filter_map(|l| match &l.link {
        Link::External(url) => Some(url),
        Link::Location(_) => None,
    });
    for (i, url) in externals.enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{}" TargetMode="External"/>"#,
            i + 1,
            escape_xml(url)
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn generate_sheet_xml(sheet: &SheetBuilder, strings: &mut SharedStrings) -> String {
    let mut rows: BTreeMap<u32, Vec<(u32, &str, &CellValue)>> = BTreeMap::new();
    for row in &sheet.blank_rows {
        rows.entry(*row).or_default();
    }
    for (cell_ref, value) in &sheet.cells {
        let (col, row) = split_cell_ref(cell_ref);
        rows.entry(row).or_default().push((col, cell_ref, value));
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    xml.push_str("<sheetData>");
    for (row, mut cells) in rows {
        cells.sort_by_key(|(col, _, _)| *col);
        if cells.is_empty() {
            xml.push_str(&format!(r#"<row r="{row}"/>"#));
            continue;
        }
        xml.push_str(&format!(r#"<row r="{row}">"#));
        for (_, cell_ref, value) in cells {
            xml.push_str(&generate_cell(cell_ref, value, strings));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if !sheet.merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, sheet.merges.len()));
        for range in &sheet.merges {
            xml.push_str(&format!(r#"<mergeCell ref="{range}"/>"#));
        }
        xml.push_str("</mergeCells>");
    }

    if !sheet.links.is_empty() {
        xml.push_str("<hyperlinks>");
        let mut next_rel = 1;
        for link in &sheet.links {
            let display = link
                .display
                .as_deref()
                .map(|d| format!(r#" display="{}""#, escape_xml(d)))
                .unwrap_or_default();
            match &link.link {
                Link::External(_) => {
                    xml.push_str(&format!(
                        r#"<hyperlink ref="{}" r:id="rId{next_rel}"{display}/>"#,
                        link.cell_ref
                    ));
                    next_rel += 1;
                }
                Link::Location(location) => {
                    xml.push_str(&format!(
                        r#"<hyperlink ref="{}" location="{}"{display}/>"#,
                        link.cell_ref,
                        escape_xml(location)
                    ));
                }
            }
        }
        xml.push_str("</hyperlinks>");
    }

    xml.push_str("</worksheet>");
    xml
}

fn generate_cell(cell_ref: &str, value: &CellValue, strings: &mut SharedStrings) -> String {
    match value {
        CellValue::String(s) => {
            let idx = strings.index_of(SharedItem::Plain(s.clone()));
            format!(r#"<c r="{cell_ref}" t="s"><v>{idx}</v></c>"#)
        }
        CellValue::RichText(runs) => {
            let idx = strings.index_of(SharedItem::Rich(runs.clone()));
            format!(r#"<c r="{cell_ref}" t="s"><v>{idx}</v></c>"#)
        }
        CellValue::InlineString(s) => format!(
            r#"<c r="{cell_ref}" t="inlineStr"><is><t>{}</t></is></c>"#,
            escape_xml(s)
        ),
        CellValue::Number(n) => format!(r#"<c r="{cell_ref}"><v>{n}</v></c>"#),
        CellValue::Styled(n, style) => {
            format!(r#"<c r="{cell_ref}" s="{style}"><v>{n}</v></c>"#)
        }
        CellValue::IsoDate(s) => format!(r#"<c r="{cell_ref}" t="d"><v>{s}</v></c>"#),
        CellValue::Boolean(b) => {
            format!(r#"<c r="{cell_ref}" t="b"><v>{}</v></c>"#, u8::from(*b))
        }
        CellValue::Error(code) => {
            format!(r#"<c r="{cell_ref}" t="e"><v>{}</v></c>"#, escape_xml(code))
        }
        CellValue::Formula(f, cached) => {
            let cached = cached.map(|n| format!("<v>{n}</v>")).unwrap_or_default();
            format!(r#"<c r="{cell_ref}"><f>{}</f>{cached}</c>"#, escape_xml(f))
        }
        CellValue::FormulaText(f, cached) => format!(
            r#"<c r="{cell_ref}" t="str"><f>{}</f><v>{}</v></c>"#,
            escape_xml(f),
            escape_xml(cached)
        ),
        CellValue::Empty => format!(r#"<c r="{cell_ref}"/>"#),
    }
}

/// Split `"AB12"` into 1-based `(col, row)`.
pub fn split_cell_ref(cell_ref: &str) -> (u32, u32) {
    let letters: String = cell_ref
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect();
    let row = cell_ref[letters.len()..]
        .parse()
        .unwrap_or_else(|_| panic!("invalid cell reference {cell_ref}"));
    let col = letters
        .bytes()
        .fold(0, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1));
    (col, row)
}

/// Convert a 1-based column number to letters (1 -> A, 27 -> AA).
pub fn col_num_to_letter(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap()
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
