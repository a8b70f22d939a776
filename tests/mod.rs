//! Integration tests for xltables.
//!
//! - `fixtures`: Builders for creating valid XLSX files in memory
//! - `common`: Pipeline and assertion helpers
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use crate::fixtures::{SheetBuilder, XlsxBuilder};
//! use crate::common::{extract, table, assert_text};
//!
//! fn test_single_table() {
//!     let xlsx = XlsxBuilder::new()
//!         .sheet(SheetBuilder::new("Sheet1").cell("A1", "Name").cell("A2", "Ada"))
//!         .build();
//!
//!     let workbook = extract(&xlsx);
//!     assert_text(table(&workbook, 0, 0), "row-2", "col1", "Ada");
//! }
//! ```
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

pub mod common;
pub mod fixtures;

pub use common::{assert_number, assert_span, assert_text, extract, table};
pub use fixtures::{CellValue, SheetBuilder, XlsxBuilder};
