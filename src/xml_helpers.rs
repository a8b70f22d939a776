//! Shared XML helpers for the XLSX decoder.
//!
//! Attribute lookups compare the full key unless named `*_local`, which
//! ignore a namespace prefix (`r:id` matches `id`).

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::DecodeResult;

/// Extract a string attribute value by key, with XML entities unescaped.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Extract a string attribute by local name (ignoring namespace prefix).
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract a boolean attribute value by key.
///
/// Recognizes `"1"`, `"true"` as true; anything else present as false.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Read the character content of the element whose start tag was just
/// consumed, up to and including its end tag. Nested markup is skipped but
/// its text is kept.
pub fn read_text<R: BufRead>(xml: &mut Reader<R>) -> DecodeResult<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Text(ref e) => text.push_str(&e.unescape()?),
            Event::CData(ref e) => text.push_str(&String::from_utf8_lossy(e)),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn make_start(xml: &str) -> BytesStart<'_> {
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string_unescapes() {
        let e = make_start(r#"<hyperlink display="Q&amp;A" ref="A1" />"#);
        assert_eq!(attr_string(&e, b"display"), Some("Q&A".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_attr_string_local_ignores_prefix() {
        let e = make_start(r#"<sheet name="Data" r:id="rId3" />"#);
        assert_eq!(attr_string_local(&e, b"id"), Some("rId3".to_string()));
        assert_eq!(attr_string(&e, b"id"), None);
    }

    #[test]
    fn test_attr_u32_and_bool() {
        let e = make_start(r#"<workbookPr date1904="1" count="42" other="no" />"#);
        assert_eq!(attr_u32(&e, b"count"), Some(42));
        assert_eq!(attr_bool(&e, b"date1904"), Some(true));
        assert_eq!(attr_bool(&e, b"other"), Some(false));
        assert_eq!(attr_bool(&e, b"missing"), None);
    }

    #[test]
    fn test_read_text_until_end_tag() {
        let mut xml = Reader::from_str("<t>a &amp; b<![CDATA[ <c> ]]></t><next/>");
        let mut buf = Vec::new();
        assert!(matches!(xml.read_event_into(&mut buf).unwrap(), Event::Start(_)));
        assert_eq!(read_text(&mut xml).unwrap(), "a & b <c> ");
        buf.clear();
        assert!(matches!(xml.read_event_into(&mut buf).unwrap(), Event::Empty(_)));
    }
}
