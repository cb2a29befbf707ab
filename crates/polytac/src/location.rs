//! Source positions attached to IR instructions.
//!
//! Parsers report zero-based rows; the IR carries one-based lines so that
//! downstream tooling (tracebacks, CFG dumps) can print positions without
//! further conversion. Columns stay zero-based.

use std::fmt;

/// File path used when an instruction has no known source position.
pub const UNKNOWN_FILE: &str = "<unknown>";

/// A zero-based (row, column) position as reported by a tree-sitter-style
/// parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    #[must_use]
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

/// Source span of an emitted instruction.
///
/// Lines are one-based (converted from the parser's zero-based rows at
/// emission time); columns are zero-based. The [`SourceLocation::unknown`]
/// sentinel marks synthetic instructions with no originating node.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceLocation {
    /// Builds a location from parser points, converting rows to one-based lines.
    #[must_use]
    pub fn from_points(file: &str, start: Point, end: Point) -> Self {
        Self {
            file: file.to_owned(),
            start_line: start.row + 1,
            start_column: start.column,
            end_line: end.row + 1,
            end_column: end.column,
        }
    }

    /// The sentinel location for instructions with no source node.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            file: UNKNOWN_FILE.to_owned(),
            start_line: 0,
            start_column: 0,
            end_line: 0,
            end_column: 0,
        }
    }

    /// Whether this is the unknown sentinel.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.file == UNKNOWN_FILE && self.start_line == 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_convert_to_one_based_lines() {
        let loc = SourceLocation::from_points("a.py", Point::new(0, 4), Point::new(2, 0));
        assert_eq!(loc.start_line, 1);
        assert_eq!(loc.end_line, 3);
        assert_eq!(loc.start_column, 4);
    }

    #[test]
    fn unknown_sentinel_round_trips() {
        let loc = SourceLocation::unknown();
        assert!(loc.is_unknown());
        assert_eq!(loc.to_string(), "<unknown>:0:0");
    }
}
