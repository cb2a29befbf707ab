//! The minimal node-access seam between the engine and an external parser.
//!
//! The engine runs entirely on syntactic shape: node kind strings, child
//! traversal, field lookup, and byte/point spans. Any tree-sitter-style
//! parser can plug in by implementing [`TreeNode`] on its node handle and
//! [`SourceTree`] on its tree; no richer parser API is consumed anywhere.

use crate::{adapters::Language, location::Point};

/// A traversable syntax-tree node.
///
/// Implementations are expected to be cheap handles (tree-sitter nodes are
/// `Copy`-like cursors); `Clone` must not duplicate the underlying tree.
pub trait TreeNode: Clone {
    /// The grammar's node-type string (e.g. `"binary_operator"`).
    fn kind(&self) -> &str;

    /// All children, including anonymous tokens such as operators and
    /// punctuation, in source order.
    fn children(&self) -> Vec<Self>;

    /// Named children only, in source order.
    fn named_children(&self) -> Vec<Self>;

    /// The child occupying the given grammar field, if present.
    fn child_by_field_name(&self, field: &str) -> Option<Self>;

    /// Byte offset of the first byte of this node's span.
    fn start_byte(&self) -> usize;

    /// Byte offset one past the last byte of this node's span.
    fn end_byte(&self) -> usize;

    /// Zero-based start position.
    fn start_point(&self) -> Point;

    /// Zero-based end position.
    fn end_point(&self) -> Point;

    /// Whether the node is named in the grammar (anonymous tokens return
    /// false). Defaults to true for parsers that only expose named nodes.
    fn is_named(&self) -> bool {
        true
    }
}

/// A parsed tree handing out its root node.
pub trait SourceTree {
    type Node: TreeNode;

    /// The root node, or `None` when the parser produced an untraversable
    /// tree (the one hard-failure case of the lowering contract).
    fn root_node(&self) -> Option<Self::Node>;
}

/// The parser collaborator used by the convenience entry point.
///
/// The parser itself is out of scope for this crate; callers supply an
/// implementation (typically wrapping tree-sitter grammars) and the engine
/// consumes only the [`SourceTree`] it returns.
pub trait SourceParser {
    type Tree: SourceTree;

    /// Parses `source` as `language`, returning a traversable tree.
    fn parse(&mut self, source: &[u8], language: Language) -> Result<Self::Tree, crate::error::ParseError>;
}
