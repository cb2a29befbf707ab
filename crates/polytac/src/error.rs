//! Typed errors for the public entry points.
//!
//! The lowering core itself operates under a no-fail contract (unknown
//! constructs degrade to `SYMBOLIC` instructions); the only hard failures
//! are a parser refusing the input and a tree with no traversable root.
//! Keeping the stages distinct lets callers handle recovery without string
//! matching.

use std::fmt;

use crate::adapters::Language;

/// The parser collaborator rejected the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub language: Language,
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub fn new(language: Language, message: impl Into<String>) -> Self {
        Self {
            language,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parse error: {}", self.language, self.message)
    }
}

impl std::error::Error for ParseError {}

/// The parser returned a tree without a traversable root node.
///
/// This indicates a parser contract violation, not a property of the source
/// program; partially-understood programs still lower successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorruptTree;

impl fmt::Display for CorruptTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("syntax tree has no traversable root node")
    }
}

impl std::error::Error for CorruptTree {}

/// Error type for the convenience entry point, separating failures by stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    /// Parsing failed before lowering started.
    Parse(ParseError),
    /// The parsed tree could not be traversed.
    CorruptTree(CorruptTree),
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "{error}"),
            Self::CorruptTree(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for LowerError {}

impl From<ParseError> for LowerError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<CorruptTree> for LowerError {
    fn from(error: CorruptTree) -> Self {
        Self::CorruptTree(error)
    }
}
