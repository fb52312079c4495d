//! Source locations.

use alloc::string::String;
use core::fmt;

/// Position of a construct in its source file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Source file name.
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl Location {
    /// Create a new location.
    #[must_use]
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: String::from(file),
            line,
            column,
        }
    }

    /// Location for nodes the linker creates itself (synthetic cases).
    #[must_use]
    pub fn synthetic(file: &str) -> Self {
        Self::new(file, 0, 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
