//! Number format classification and Excel serial date conversion.
//!
//! Only one question is asked of a number format here: does it display a
//! date? Numeric cells styled with such a format decode as dates.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Serial of 9999-12-31 in the 1900 system; later serials are not dates.
const MAX_SERIAL: f64 = 2_958_466.0;

/// Builtin format ids that display dates or times.
///
/// See: ECMA-376 Part 1, Section 18.8.30
pub const fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Check if a custom format code displays a date or time.
///
/// Quoted literals, bracketed sections (colors, conditions, `[h]` elapsed
/// markers excepted), and escaped characters are ignored.
pub fn is_date_format(format_code: &str) -> bool {
    let mut cleaned = String::with_capacity(format_code.len());
    let mut in_quotes = false;
    let mut bracket = String::new();
    let mut in_brackets = false;
    let mut chars = format_code.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' | '_' | '*' => {
                let _ = chars.next();
            }
            '[' => {
                in_brackets = true;
                bracket.clear();
            }
            ']' if in_brackets => {
                in_brackets = false;
                let lower = bracket.to_ascii_lowercase();
                if matches!(lower.as_str(), "h" | "hh" | "m" | "mm" | "s" | "ss") {
                    cleaned.push_str(&lower);
                }
            }
            _ if in_brackets => bracket.push(c),
            _ => cleaned.push(c.to_ascii_lowercase()),
        }
    }

    if cleaned == "general" {
        return false;
    }
    cleaned.contains('y')
        || cleaned.contains('d')
        || cleaned.contains('h')
        || (cleaned.contains('m') && !cleaned.contains('#') && !cleaned.contains('0'))
        || (cleaned.contains('s') && cleaned.contains(':'))
}

/// Convert an Excel serial to a timestamp.
///
/// 1900 system: serial 1 is 1900-01-01 and serial 60 is the nonexistent
/// 1900-02-29, which maps onto 1900-03-01. 1904 system: serial 0 is
/// 1904-01-01. Negative or out-of-range serials yield `None`.
#[allow(clippy::cast_possible_truncation)]
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial >= MAX_SERIAL {
        return None;
    }
    let whole = serial.floor();
    // Both bounded by MAX_SERIAL and SECONDS_PER_DAY, so the casts are exact.
    let days = whole as i64;
    let seconds = ((serial - whole) * SECONDS_PER_DAY).round() as i64;

    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)
    } else if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    }?;

    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}
