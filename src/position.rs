use std::fmt;

use serde::Serialize;

/// A reference to a line and column in the query document a node was parsed
/// from.
///
/// Positions are handed over by the (external) parser. Nodes built by hand
/// use [`SourcePosition::new_origin`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SourcePosition {
    line: usize,
    column: usize,
}

impl SourcePosition {
    /// Creates a position from zero-based `line` and `column` numbers.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    #[doc(hidden)]
    pub fn new_origin() -> Self {
        Self::default()
    }

    /// The line of the node in the query document.
    ///
    /// Zero-based index: the first line is line zero.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The column of the node in the query document.
    ///
    /// Zero-based index: the first column is column zero.
    pub fn column(&self) -> usize {
        self.column
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
