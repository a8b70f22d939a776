//! xltables - renderer-ready tables from Excel workbooks
//!
//! Decodes an `.xlsx` file and cuts every sheet into tables:
//! - Blank rows separate tables; the first row of each run is its header
//! - Cell values are normalized to empty, number, or text
//! - Merged regions keep their origin value and span, covered cells are dropped
//! - Runs natively and in the browser via WebAssembly
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { process_xlsx_to_js } from 'xltables';
//! await init();
//! const workbook = process_xlsx_to_js(bytes, 'report.xlsx');
//! for (const sheet of workbook.sheets) console.log(sheet.name, sheet.tables.length);
//! ```
//!
//! # Usage (Rust)
//!
//! ```no_run
//! use xltables::{process_xlsx, ExtractOptions};
//!
//! let bytes = std::fs::read("report.xlsx")?;
//! let workbook = process_xlsx("report.xlsx", &bytes, &ExtractOptions::default())?;
//! println!("{} tables", workbook.table_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Decoding modules
pub mod cell_ref;
pub mod error;
pub mod hyperlinks;
pub mod numfmt;
pub mod parser;
pub mod rich_text;
pub mod types;
pub mod xml_helpers;

// Extraction modules
pub mod build;
pub mod extent;
pub mod extract;
pub mod merge;
pub mod normalize;
pub mod options;
pub mod segment;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use error::{DecodeError, ExtractError, Result};
pub use extract::{extract_sheet, extract_workbook, process_xlsx};
pub use normalize::{normalize_cell, Normalizer};
pub use options::{BlankRowRule, ExtractOptions};
pub use types::*;

fn js_error(e: &ExtractError) -> JsValue {
    JsValue::from_str(&format!("{}: {e}", e.code()))
}

/// Maps become plain objects and missing values become `null`, matching the
/// JSON output.
fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

/// Extract tables from an XLSX file and return the workbook as a `JsValue`.
///
/// # Errors
/// Returns `"unreadable_workbook: ..."` if the file cannot be decoded and
/// `"empty_result: ..."` if no sheet contains a table.
#[wasm_bindgen]
pub fn process_xlsx_to_js(data: &[u8], file_name: &str) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let workbook =
        process_xlsx(file_name, data, &ExtractOptions::default()).map_err(|e| js_error(&e))?;

    to_js(&workbook)
}

/// Extract tables from an XLSX file and return a JSON string.
///
/// # Errors
/// Same as [`process_xlsx_to_js`].
#[wasm_bindgen]
pub fn process_xlsx_to_json(data: &[u8], file_name: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();
    let workbook =
        process_xlsx(file_name, data, &ExtractOptions::default()).map_err(|e| js_error(&e))?;

    serde_json::to_string(&workbook)
        .map_err(|e| JsValue::from_str(&format!("JSON serialization error: {e}")))
}

/// Extract tables with options given as a plain JS object, e.g.
/// `{ dateFormat: "%Y-%m-%d", blankRows: "raw" }`. Missing keys take defaults.
///
/// # Errors
/// Same as [`process_xlsx_to_js`], plus an error for an invalid options object.
#[wasm_bindgen]
pub fn process_xlsx_with_options(
    data: &[u8],
    file_name: &str,
    options: JsValue,
) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let options: ExtractOptions = if options.is_undefined() || options.is_null() {
        ExtractOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsValue::from_str(&format!("Invalid options: {e}")))?
    };
    let workbook = process_xlsx(file_name, data, &options).map_err(|e| js_error(&e))?;

    to_js(&workbook)
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
