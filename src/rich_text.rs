//! Rich text parsing for shared string items (`<si>`) and inline strings (`<is>`).
//!
//! Structure:
//! ```xml
//! <si>
//!   <t>Plain text</t>  -- OR --
//!   <r><rPr>...</rPr><t>Styled</t></r>
//!   <r><t>Normal</t></r>
//!   <rPh><t>phonetic guide, ignored</t></rPh>
//! </si>
//! ```
//!
//! Run formatting is not carried into the raw model.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::DecodeResult;
use crate::types::{RawCell, RichTextRun};
use crate::xml_helpers::read_text;

/// Parse a string item whose start tag (`end_tag`) was just consumed.
///
/// Items made of `<r>` runs become [`RawCell::RichText`]; a bare `<t>`
/// becomes [`RawCell::Text`].
pub fn parse_string_item<R: BufRead>(xml: &mut Reader<R>, end_tag: &[u8]) -> DecodeResult<RawCell> {
    let mut buf = Vec::new();
    let mut plain_text = String::new();
    let mut runs: Vec<RichTextRun> = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"t" => plain_text.push_str(&read_text(xml)?),
                b"r" => runs.push(parse_run(xml)?),
                // Phonetic guides and unknown children are skipped whole.
                _ => {
                    let _ = read_text(xml)?;
                }
            },
            Event::End(ref e) if e.local_name().as_ref() == end_tag => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if runs.is_empty() {
        Ok(RawCell::Text(plain_text))
    } else {
        Ok(RawCell::RichText(runs))
    }
}

/// Parse a single `<r>` run after its start tag.
fn parse_run<R: BufRead>(xml: &mut Reader<R>) -> DecodeResult<RichTextRun> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let is_text = e.local_name().as_ref() == b"t";
                let content = read_text(xml)?;
                if is_text {
                    text.push_str(&content);
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(RichTextRun { text })
}
