//! Cell style resolution, reduced to what decoding needs: which `cellXfs`
//! entries display their number as a date.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::DecodeResult;
use crate::numfmt::{is_builtin_date_format, is_date_format};
use crate::xml_helpers::{attr_string, attr_u32};

/// Per-xf date classification, indexed by the cell `s` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DateStyles {
    xf_is_date: Vec<bool>,
}

impl DateStyles {
    /// Whether a cell with style index `style_idx` shows a date.
    pub fn is_date(&self, style_idx: Option<u32>) -> bool {
        style_idx
            .and_then(|idx| self.xf_is_date.get(idx as usize))
            .copied()
            .unwrap_or(false)
    }
}

/// Parse `numFmts` and `cellXfs` from a styles part.
pub(crate) fn parse_date_styles<R: BufRead>(reader: R) -> DecodeResult<DateStyles> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();
    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids: Vec<Option<u32>> = Vec::new();
    let mut in_num_fmts = false;
    let mut in_cell_xfs = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = true,
                b"cellXfs" => in_cell_xfs = true,
                b"numFmt" if in_num_fmts => {
                    if let (Some(id), Some(code)) =
                        (attr_u32(e, b"numFmtId"), attr_string(e, b"formatCode"))
                    {
                        custom_formats.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => xf_format_ids.push(attr_u32(e, b"numFmtId")),
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let xf_is_date = xf_format_ids
        .into_iter()
        .map(|id| {
            id.is_some_and(|id| {
                is_builtin_date_format(id)
                    || custom_formats.get(&id).is_some_and(|code| is_date_format(code))
            })
        })
        .collect();

    Ok(DateStyles { xf_is_date })
}
