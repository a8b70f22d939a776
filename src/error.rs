//! Structured error types for xltables.
//!
//! Cell-level faults never reach these types: they are recovered inside
//! [`crate::normalize`]. Only workbook-level failures surface here.

/// Failures while decoding an XLSX container into the raw workbook model.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required package part is absent.
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// General parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The two fatal outcomes of processing a workbook.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The input could not be decoded as a workbook at all.
    #[error("cannot read workbook: {0}")]
    UnreadableWorkbook(#[from] DecodeError),

    /// Decoding succeeded but no table survived pruning on any sheet.
    #[error("no data found in workbook")]
    EmptyResult,
}

impl ExtractError {
    /// Stable machine-readable code, used by the JS binding.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnreadableWorkbook(_) => "unreadable_workbook",
            Self::EmptyResult => "empty_result",
        }
    }
}

/// Convenience alias used by the decoder.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
