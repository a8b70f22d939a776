use serde::{Deserialize, Serialize};

/// The canonical value of a cell after normalization.
///
/// Serializes as `null`, a JSON number, or a JSON string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedScalar {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

/// Category of a scalar, derived from its variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Empty,
    Numeric,
    Text,
}

impl NormalizedScalar {
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Empty => ScalarKind::Empty,
            Self::Number(_) => ScalarKind::Numeric,
            Self::Text(_) => ScalarKind::Text,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Display form used for header labels.
    ///
    /// Integral numbers print without a fractional part (`2024`, not `2024.0`).
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        // Bounded above, so the cast is exact.
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Horizontal alignment hint for a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Right,
}

impl Align {
    /// Helper for serde `skip_serializing_if`.
    #[must_use]
    pub fn is_left(&self) -> bool {
        matches!(self, Self::Left)
    }
}
