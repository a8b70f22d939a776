//! Data types: the raw workbook model, normalized scalars, and the output model.

mod output;
mod raw;
mod scalar;

pub use output::*;
pub use raw::*;
pub use scalar::*;
