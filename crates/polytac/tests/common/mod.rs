//! Shared test support: a synthetic syntax tree implementing the engine's
//! node trait.
//!
//! Builders lay leaf texts out into a generated source buffer (one space
//! between adjacent leaves), so byte ranges and points stay consistent with
//! the text the engine extracts. Interior nodes span their children.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::rc::Rc;

use polytac::{Instruction, Language, Opcode, Point, SourceTree, TreeNode};

#[derive(Debug)]
struct NodeData {
    kind: String,
    named: bool,
    children: Vec<TestNode>,
    fields: Vec<(String, usize)>,
    start_byte: usize,
    end_byte: usize,
}

/// A cheap-to-clone synthetic node.
#[derive(Debug, Clone)]
pub struct TestNode(Rc<NodeData>);

impl TreeNode for TestNode {
    fn kind(&self) -> &str {
        &self.0.kind
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }

    fn named_children(&self) -> Vec<Self> {
        self.0.children.iter().filter(|c| c.0.named).cloned().collect()
    }

    fn child_by_field_name(&self, field: &str) -> Option<Self> {
        self.0
            .fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|&(_, index)| self.0.children[index].clone())
    }

    fn start_byte(&self) -> usize {
        self.0.start_byte
    }

    fn end_byte(&self) -> usize {
        self.0.end_byte
    }

    fn start_point(&self) -> Point {
        Point::new(0, u32::try_from(self.0.start_byte).unwrap_or(0))
    }

    fn end_point(&self) -> Point {
        Point::new(0, u32::try_from(self.0.end_byte).unwrap_or(0))
    }

    fn is_named(&self) -> bool {
        self.0.named
    }
}

/// A synthetic tree plus the source bytes its spans index into.
pub struct TestTree {
    root: TestNode,
    pub source: Vec<u8>,
}

impl SourceTree for TestTree {
    type Node = TestNode;

    fn root_node(&self) -> Option<TestNode> {
        Some(self.root.clone())
    }
}

/// Builder for one node; assemble with [`node`], [`leaf`], and [`token`],
/// then call [`build`].
pub struct Builder {
    kind: String,
    named: bool,
    text: Option<String>,
    children: Vec<(Option<String>, Builder)>,
}

/// An interior named node.
pub fn node(kind: &str) -> Builder {
    Builder {
        kind: kind.to_owned(),
        named: true,
        text: None,
        children: Vec::new(),
    }
}

/// A named leaf carrying source text.
pub fn leaf(kind: &str, text: &str) -> Builder {
    Builder {
        kind: kind.to_owned(),
        named: true,
        text: Some(text.to_owned()),
        children: Vec::new(),
    }
}

/// An anonymous token (operators, keywords); its kind is its text.
pub fn token(text: &str) -> Builder {
    Builder {
        kind: text.to_owned(),
        named: false,
        text: Some(text.to_owned()),
        children: Vec::new(),
    }
}

impl Builder {
    /// Appends a named child.
    #[must_use]
    pub fn child(mut self, child: Builder) -> Self {
        self.children.push((None, child));
        self
    }

    /// Appends a child reachable through `field`.
    #[must_use]
    pub fn field(mut self, field: &str, child: Builder) -> Self {
        self.children.push((Some(field.to_owned()), child));
        self
    }

    fn realize(self, source: &mut String) -> TestNode {
        if let Some(text) = self.text {
            if !source.is_empty() {
                source.push(' ');
            }
            let start_byte = source.len();
            source.push_str(&text);
            return TestNode(Rc::new(NodeData {
                kind: self.kind,
                named: self.named,
                children: Vec::new(),
                fields: Vec::new(),
                start_byte,
                end_byte: source.len(),
            }));
        }
        let mut children = Vec::new();
        let mut fields = Vec::new();
        for (field, child) in self.children {
            let index = children.len();
            children.push(child.realize(source));
            if let Some(field) = field {
                fields.push((field, index));
            }
        }
        let start_byte = children.first().map_or(source.len(), TestNode::start_byte);
        let end_byte = children.last().map_or(start_byte, TestNode::end_byte);
        TestNode(Rc::new(NodeData {
            kind: self.kind,
            named: self.named,
            children,
            fields,
            start_byte,
            end_byte,
        }))
    }
}

/// Realizes a builder into a tree and its generated source.
pub fn build(root: Builder) -> TestTree {
    let mut source = String::new();
    let root = root.realize(&mut source);
    TestTree {
        root,
        source: source.into_bytes(),
    }
}

/// Builds and lowers in one step.
pub fn lower(language: Language, root: Builder) -> Vec<Instruction> {
    let tree = build(root);
    let mut lowerer = language.lowerer::<TestNode>();
    lowerer.lower(&tree, &tree.source).expect("synthetic tree has a root")
}

/// The root node kind each grammar uses.
pub fn root_kind(language: Language) -> &'static str {
    match language {
        Language::Python => "module",
        Language::JavaScript | Language::TypeScript | Language::Java | Language::Ruby | Language::Php => "program",
        Language::Kotlin | Language::Go | Language::Rust => "source_file",
        Language::Scala | Language::CSharp => "compilation_unit",
        Language::C | Language::Cpp => "translation_unit",
        Language::Lua => "chunk",
        Language::Pascal => "root",
    }
}

/// The opcodes of a stream, in order.
pub fn opcodes(instructions: &[Instruction]) -> Vec<Opcode> {
    instructions.iter().map(Instruction::opcode).collect()
}

/// The first instruction with the given opcode, if any.
pub fn find_op(instructions: &[Instruction], opcode: Opcode) -> Option<&Instruction> {
    instructions.iter().find(|i| i.opcode() == opcode)
}

/// All label names in emission order.
pub fn labels(instructions: &[Instruction]) -> Vec<String> {
    instructions
        .iter()
        .filter_map(|i| i.label().map(ToOwned::to_owned))
        .collect()
}

/// Asserts that an instruction with the given opcode and operand list
/// exists.
pub fn assert_has(instructions: &[Instruction], opcode: Opcode, operands: &[&str]) {
    let found = instructions
        .iter()
        .any(|i| i.opcode() == opcode && i.operands() == operands);
    assert!(
        found,
        "expected {opcode} {operands:?} in:\n{}",
        polytac::render(instructions)
    );
}
