//! The language-agnostic lowering engine.
//!
//! A [`Lowerer`] walks a syntax tree by recursive descent and appends flat
//! IR instructions to an internal buffer. Per-language adapters configure a
//! lowerer by populating its two dispatch tables (node-type string →
//! handler) and overriding the grammar-specific constants in its
//! [`Profile`]; the engine supplies register/label allocation, emission,
//! loop bookkeeping, and the reusable lowerers in the `exprs`, `control`,
//! and `defs` submodules.
//!
//! The engine never fails on program shape: unknown expression kinds
//! degrade to `SYMBOLIC "unsupported:<kind>"`, unknown statement kinds fall
//! through to expression dispatch, and handlers read grammar fields
//! defensively with positional fallbacks.

mod control;
mod defs;
mod exprs;

pub use control::{CatchClause, SwitchArm};

use ahash::AHashMap;

use crate::{
    canon,
    error::CorruptTree,
    ir::{InstKind, Instruction, Reg},
    location::SourceLocation,
    tracer::{LowerTracer, NoopTracer},
    tree::{SourceTree, TreeNode},
};

/// Statement handler: emits instructions by side effect.
pub type StmtHandler<N, T> = fn(&mut Lowerer<N, T>, &N);

/// Expression handler: emits instructions and returns the result register.
pub type ExprHandler<N, T> = fn(&mut Lowerer<N, T>, &N) -> Reg;

/// Store-target override hook (e.g. pointer dereference targets in C).
pub type StoreHandler<N, T> = fn(&mut Lowerer<N, T>, &N, Reg);

/// Parameter-binding override hook: extracts the bound name from a
/// grammar-specific parameter node shape.
pub type ParamBindingFn<N, T> = fn(&Lowerer<N, T>, &N) -> Option<String>;

/// Maximum recursion depth for one lowering call.
///
/// Trees nested beyond this degrade to `SYMBOLIC "depth_limit_exceeded"`
/// instead of overflowing the native stack, preserving the no-fail contract
/// on pathological inputs.
pub const MAX_LOWER_DEPTH: u32 = 400;

/// Grammar-specific constants an adapter may override.
///
/// Defaults follow the tree-sitter-python grammar; adapters override only
/// the fields whose spelling differs in their grammar. The two `Option`
/// fields are behavior hooks consulted before the engine's generic store
/// target / parameter extraction.
pub struct Profile<N: TreeNode, T: LowerTracer = NoopTracer> {
    /// Field names used to extract parts of a function definition node.
    pub func_name_field: &'static str,
    pub func_params_field: &'static str,
    pub func_body_field: &'static str,
    /// Field names on if nodes.
    pub if_condition_field: &'static str,
    pub if_consequence_field: &'static str,
    pub if_alternative_field: &'static str,
    /// Node types an if alternative may carry (else / elif shapes).
    pub elif_node_types: &'static [&'static str],
    pub else_node_types: &'static [&'static str],
    /// Field names on while nodes.
    pub while_condition_field: &'static str,
    pub while_body_field: &'static str,
    /// Field names on call nodes.
    pub call_function_field: &'static str,
    pub call_arguments_field: &'static str,
    /// Field names on class nodes.
    pub class_name_field: &'static str,
    pub class_body_field: &'static str,
    /// Member-access node shape.
    pub attr_object_field: &'static str,
    pub attr_attribute_field: &'static str,
    pub attribute_node_type: &'static str,
    /// Callee node types lowered as method calls (usually just the
    /// attribute type; some grammars add scoped/navigation shapes).
    pub method_call_node_types: &'static [&'static str],
    /// Node types treated as plain names for loads, stores, and static
    /// call targets.
    pub name_node_types: &'static [&'static str],
    /// Subscript node shape.
    pub subscript_node_types: &'static [&'static str],
    pub subscript_value_field: &'static str,
    pub subscript_index_field: &'static str,
    /// Assignment node shape.
    pub assign_left_field: &'static str,
    pub assign_right_field: &'static str,
    /// Node types treated as block containers. Every kind registered with
    /// [`Lowerer::lower_block`] as its statement handler must be listed
    /// here, otherwise single-statement dispatch re-enters the handler.
    pub block_node_types: &'static [&'static str],
    /// Node types silently skipped.
    pub comment_types: &'static [&'static str],
    pub noise_types: &'static [&'static str],
    /// The grammar's parenthesized-expression node type.
    pub paren_expr_type: &'static str,
    /// Canonical literal spellings emitted into the IR.
    pub none_literal: &'static str,
    pub true_literal: &'static str,
    pub false_literal: &'static str,
    /// Literal emitted for implicit returns.
    pub default_return_value: &'static str,
    /// Override for store-target classification.
    pub store_target: Option<StoreHandler<N, T>>,
    /// Override for parameter-name extraction.
    pub param_binding: Option<ParamBindingFn<N, T>>,
}

impl<N: TreeNode, T: LowerTracer> Default for Profile<N, T> {
    fn default() -> Self {
        Self {
            func_name_field: "name",
            func_params_field: "parameters",
            func_body_field: "body",
            if_condition_field: "condition",
            if_consequence_field: "consequence",
            if_alternative_field: "alternative",
            elif_node_types: &["elif_clause"],
            else_node_types: &["else_clause"],
            while_condition_field: "condition",
            while_body_field: "body",
            call_function_field: "function",
            call_arguments_field: "arguments",
            class_name_field: "name",
            class_body_field: "body",
            attr_object_field: "object",
            attr_attribute_field: "attribute",
            attribute_node_type: "attribute",
            method_call_node_types: &["attribute"],
            name_node_types: &["identifier"],
            subscript_node_types: &["subscript"],
            subscript_value_field: "value",
            subscript_index_field: "subscript",
            assign_left_field: "left",
            assign_right_field: "right",
            block_node_types: &["block", "module"],
            comment_types: &["comment"],
            noise_types: &[],
            paren_expr_type: "parenthesized_expression",
            none_literal: canon::NONE_LITERAL,
            true_literal: canon::TRUE_LITERAL,
            false_literal: canon::FALSE_LITERAL,
            default_return_value: canon::NONE_LITERAL,
            store_target: None,
            param_binding: None,
        }
    }
}

/// Innermost-first loop context for `continue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopFrame {
    pub continue_label: String,
    pub end_label: String,
}

/// The lowering engine: dispatch tables, allocator counters, and the
/// instruction buffer for one file at a time.
///
/// One instance is exclusively owned during a `lower()` call and is NOT
/// safe to share across threads mid-call, but it is reusable sequentially:
/// all per-call state is reset at the start of each call.
pub struct Lowerer<N: TreeNode, T: LowerTracer = NoopTracer> {
    pub profile: Profile<N, T>,
    pub(crate) stmt_dispatch: AHashMap<&'static str, StmtHandler<N, T>>,
    pub(crate) expr_dispatch: AHashMap<&'static str, ExprHandler<N, T>>,
    tracer: T,
    file: String,
    source: Vec<u8>,
    instructions: Vec<Instruction>,
    reg_counter: u32,
    label_counter: u32,
    depth: u32,
    loop_stack: Vec<LoopFrame>,
    break_targets: Vec<String>,
    /// Set while lowering a function body in languages where assignment to
    /// the function name means "return" (Pascal).
    pub(crate) current_function_name: Option<String>,
}

impl<N: TreeNode> Lowerer<N, NoopTracer> {
    /// Creates an engine with the given profile and the zero-cost tracer.
    #[must_use]
    pub fn new(profile: Profile<N, NoopTracer>) -> Self {
        Self::with_tracer(profile, NoopTracer)
    }
}

impl<N: TreeNode, T: LowerTracer> Lowerer<N, T> {
    /// Creates an engine with the given profile and tracer.
    #[must_use]
    pub fn with_tracer(profile: Profile<N, T>, tracer: T) -> Self {
        Self {
            profile,
            stmt_dispatch: AHashMap::new(),
            expr_dispatch: AHashMap::new(),
            tracer,
            file: crate::location::UNKNOWN_FILE.to_owned(),
            source: Vec::new(),
            instructions: Vec::new(),
            reg_counter: 0,
            label_counter: 0,
            depth: 0,
            loop_stack: Vec::new(),
            break_targets: Vec::new(),
            current_function_name: None,
        }
    }

    /// Sets the file path recorded in source locations.
    pub fn set_file(&mut self, file: impl Into<String>) {
        self.file = file.into();
    }

    /// Registers one statement handler.
    pub fn stmt(&mut self, kind: &'static str, handler: StmtHandler<N, T>) {
        self.stmt_dispatch.insert(kind, handler);
    }

    /// Registers one expression handler.
    pub fn expr(&mut self, kind: &'static str, handler: ExprHandler<N, T>) {
        self.expr_dispatch.insert(kind, handler);
    }

    /// Bulk statement registration.
    pub fn stmts(&mut self, entries: &[(&'static str, StmtHandler<N, T>)]) {
        for &(kind, handler) in entries {
            self.stmt_dispatch.insert(kind, handler);
        }
    }

    /// Bulk expression registration.
    pub fn exprs(&mut self, entries: &[(&'static str, ExprHandler<N, T>)]) {
        for &(kind, handler) in entries {
            self.expr_dispatch.insert(kind, handler);
        }
    }

    /// Removes a statement handler (used by derived adapters to re-route
    /// an inherited entry through expression dispatch).
    pub fn unregister_stmt(&mut self, kind: &str) {
        self.stmt_dispatch.remove(kind);
    }

    /// Read access to the tracer (e.g. to harvest a recording afterwards).
    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    /// Consumes the engine, returning the tracer.
    pub fn into_tracer(self) -> T {
        self.tracer
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Lowers a whole tree, resetting all per-call state first.
    ///
    /// The returned stream always starts with `LABEL entry`. The only error
    /// is a tree without a traversable root (parser contract violation);
    /// unknown constructs inside a valid tree never fail.
    pub fn lower<S: SourceTree<Node = N>>(&mut self, tree: &S, source: &[u8]) -> Result<Vec<Instruction>, CorruptTree> {
        let root = tree.root_node().ok_or(CorruptTree)?;
        Ok(self.lower_root(&root, source))
    }

    /// Lowers from a root node directly.
    pub fn lower_root(&mut self, root: &N, source: &[u8]) -> Vec<Instruction> {
        self.reset(source);
        self.push_at(
            root,
            InstKind::Label {
                name: canon::ENTRY_LABEL.to_owned(),
            },
        );
        self.lower_block(root);
        std::mem::take(&mut self.instructions)
    }

    fn reset(&mut self, source: &[u8]) {
        self.source = source.to_vec();
        self.instructions.clear();
        self.reg_counter = 0;
        self.label_counter = 0;
        self.depth = 0;
        self.loop_stack.clear();
        self.break_targets.clear();
        self.current_function_name = None;
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Lowers a block container: single-statement bodies dispatch directly,
    /// otherwise each named child is lowered as a statement.
    pub fn lower_block(&mut self, node: &N) {
        let kind = node.kind();
        if !self.profile.block_node_types.contains(&kind) && self.stmt_dispatch.contains_key(kind) {
            self.lower_stmt(node);
            return;
        }
        for child in node.named_children() {
            if self.is_skippable(child.kind()) {
                continue;
            }
            self.lower_stmt(&child);
        }
    }

    /// Lowers one statement; kinds without a statement handler fall through
    /// to expression dispatch (expression statements).
    pub fn lower_stmt(&mut self, node: &N) {
        let kind = node.kind();
        if self.is_skippable(kind) {
            return;
        }
        if self.depth >= MAX_LOWER_DEPTH {
            self.symbolic_at(node, "depth_limit_exceeded");
            return;
        }
        self.depth += 1;
        if let Some(&handler) = self.stmt_dispatch.get(kind) {
            self.tracer.on_stmt(kind);
            handler(self, node);
        } else {
            let _ = self.lower_expr_inner(node);
        }
        self.depth -= 1;
    }

    /// Lowers one expression, returning its result register. Unknown kinds
    /// degrade to `SYMBOLIC "unsupported:<kind>"`; this never fails.
    pub fn lower_expr(&mut self, node: &N) -> Reg {
        if self.depth >= MAX_LOWER_DEPTH {
            return self.symbolic_at(node, "depth_limit_exceeded");
        }
        self.depth += 1;
        let reg = self.lower_expr_inner(node);
        self.depth -= 1;
        reg
    }

    fn lower_expr_inner(&mut self, node: &N) -> Reg {
        let kind = node.kind();
        if let Some(&handler) = self.expr_dispatch.get(kind) {
            self.tracer.on_expr(kind);
            handler(self, node)
        } else {
            self.tracer.on_fallback(kind);
            let hint = format!("unsupported:{kind}");
            self.symbolic_at(node, &hint)
        }
    }

    /// Whether a node kind is comment or noise.
    #[must_use]
    pub fn is_skippable(&self, kind: &str) -> bool {
        self.profile.comment_types.contains(&kind) || self.profile.noise_types.contains(&kind)
    }

    // ------------------------------------------------------------------
    // Text and field access
    // ------------------------------------------------------------------

    /// The verbatim source text of a node.
    #[must_use]
    pub fn text(&self, node: &N) -> String {
        let start = node.start_byte().min(self.source.len());
        let end = node.end_byte().clamp(start, self.source.len());
        String::from_utf8_lossy(&self.source[start..end]).into_owned()
    }

    /// Field lookup with positional fallback: the `index`-th named child
    /// (skipping comments/noise) when the field is absent.
    #[must_use]
    pub fn field_or_nth(&self, node: &N, field: &str, index: usize) -> Option<N> {
        node.child_by_field_name(field).or_else(|| {
            node.named_children()
                .into_iter()
                .filter(|c| !self.is_skippable(c.kind()))
                .nth(index)
        })
    }

    /// Named children with comments/noise filtered out.
    #[must_use]
    pub fn useful_children(&self, node: &N) -> Vec<N> {
        node.named_children()
            .into_iter()
            .filter(|c| !self.is_skippable(c.kind()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocates the next register.
    pub fn fresh_reg(&mut self) -> Reg {
        let reg = Reg::new(self.reg_counter);
        self.reg_counter += 1;
        reg
    }

    /// Allocates the next label with the given prefix. All prefixes share
    /// one counter, so labels never collide across prefixes.
    pub fn fresh_label(&mut self, prefix: &str) -> String {
        let ordinal = self.label_counter;
        self.label_counter += 1;
        format!("{prefix}_{ordinal}")
    }

    /// Allocates a unique synthetic variable name (phi variables, anonymous
    /// function names). Draws from the label counter so synthetic names
    /// never repeat within a lowering.
    pub fn fresh_synthetic(&mut self, prefix: &str) -> String {
        self.fresh_label(prefix)
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// The source location of a node, in the IR's 1-based line convention.
    #[must_use]
    pub fn loc_of(&self, node: &N) -> SourceLocation {
        SourceLocation::from_points(&self.file, node.start_point(), node.end_point())
    }

    /// Appends an instruction located at `node`.
    pub fn push_at(&mut self, node: &N, kind: InstKind) {
        let location = self.loc_of(node);
        self.push_loc(kind, location);
    }

    /// Appends an instruction with an explicit location.
    pub fn push_loc(&mut self, kind: InstKind, location: SourceLocation) {
        let inst = Instruction::new(kind, location);
        self.tracer.on_emit(self.instructions.len(), &inst);
        self.instructions.push(inst);
    }

    /// Emits `CONST value`, returning the result register.
    pub fn const_at(&mut self, node: &N, value: impl Into<String>) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(node, InstKind::Const { dest, value: value.into() });
        dest
    }

    /// Emits `LOAD_VAR name`, returning the result register.
    pub fn load_var_at(&mut self, node: &N, name: impl Into<String>) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(node, InstKind::LoadVar { dest, name: name.into() });
        dest
    }

    /// Emits `STORE_VAR name, src`.
    pub fn store_var_at(&mut self, node: &N, name: impl Into<String>, src: Reg) {
        self.push_at(node, InstKind::StoreVar { name: name.into(), src });
    }

    /// Emits `SYMBOLIC hint`, returning the result register.
    pub fn symbolic_at(&mut self, node: &N, hint: &str) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::Symbolic {
                dest,
                hint: hint.to_owned(),
            },
        );
        dest
    }

    /// Emits `LABEL name`.
    pub fn label_at(&mut self, node: &N, name: impl Into<String>) {
        self.push_at(node, InstKind::Label { name: name.into() });
    }

    /// Emits `BRANCH target`.
    pub fn branch_at(&mut self, node: &N, target: impl Into<String>) {
        self.push_at(node, InstKind::Branch { target: target.into() });
    }

    /// Emits `BRANCH_IF cond, true_target, false_target`.
    pub fn branch_if_at(&mut self, node: &N, cond: Reg, true_target: impl Into<String>, false_target: impl Into<String>) {
        self.push_at(
            node,
            InstKind::BranchIf {
                cond,
                true_target: true_target.into(),
                false_target: false_target.into(),
            },
        );
    }

    // ------------------------------------------------------------------
    // Loop bookkeeping
    // ------------------------------------------------------------------

    /// Pushes a loop context; `continue` will target `continue_label` and
    /// `break` will target `end_label` until the matching pop.
    pub fn push_loop(&mut self, continue_label: &str, end_label: &str) {
        self.loop_stack.push(LoopFrame {
            continue_label: continue_label.to_owned(),
            end_label: end_label.to_owned(),
        });
        self.break_targets.push(end_label.to_owned());
    }

    /// Pops the innermost loop context. Must pair with [`Self::push_loop`]
    /// on every exit path.
    pub fn pop_loop(&mut self) {
        self.loop_stack.pop();
        self.break_targets.pop();
    }

    /// Pushes a break-only target (switch/case end labels).
    pub fn push_break_target(&mut self, label: &str) {
        self.break_targets.push(label.to_owned());
    }

    /// Pops a break-only target.
    pub fn pop_break_target(&mut self) {
        self.break_targets.pop();
    }

    /// The innermost `continue` target, if inside a loop.
    #[must_use]
    pub fn continue_target(&self) -> Option<String> {
        self.loop_stack.last().map(|frame| frame.continue_label.clone())
    }

    /// The innermost `break` target, if inside a loop or switch.
    #[must_use]
    pub fn break_target(&self) -> Option<String> {
        self.break_targets.last().cloned()
    }

    pub(crate) fn tracer_mut(&mut self) -> &mut T {
        &mut self.tracer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Opcode;

    // A tiny hand-rolled node for engine-level tests; integration tests use
    // the richer builder in tests/common.
    #[derive(Debug, Clone)]
    struct MiniNode {
        kind: &'static str,
        children: Vec<MiniNode>,
    }

    impl TreeNode for MiniNode {
        fn kind(&self) -> &str {
            self.kind
        }
        fn children(&self) -> Vec<Self> {
            self.children.clone()
        }
        fn named_children(&self) -> Vec<Self> {
            self.children.clone()
        }
        fn child_by_field_name(&self, _field: &str) -> Option<Self> {
            None
        }
        fn start_byte(&self) -> usize {
            0
        }
        fn end_byte(&self) -> usize {
            0
        }
        fn start_point(&self) -> crate::location::Point {
            crate::location::Point::default()
        }
        fn end_point(&self) -> crate::location::Point {
            crate::location::Point::default()
        }
    }

    fn engine() -> Lowerer<MiniNode> {
        Lowerer::new(Profile::default())
    }

    #[test]
    fn unknown_expression_degrades_to_symbolic() {
        let mut lw = engine();
        let root = MiniNode {
            kind: "module",
            children: vec![MiniNode {
                kind: "mystery_construct",
                children: vec![],
            }],
        };
        let insts = lw.lower_root(&root, b"");
        assert_eq!(insts[0].opcode(), Opcode::Label);
        assert_eq!(insts[0].label(), Some("entry"));
        assert_eq!(insts[1].opcode(), Opcode::Symbolic);
        assert_eq!(insts[1].operands(), vec!["unsupported:mystery_construct"]);
    }

    #[test]
    fn register_and_label_counters_are_independent() {
        let mut lw = engine();
        let r0 = lw.fresh_reg();
        let l0 = lw.fresh_label("if_true");
        let r1 = lw.fresh_reg();
        let l1 = lw.fresh_label("while_cond");
        assert_eq!(r0.to_string(), "%0");
        assert_eq!(r1.to_string(), "%1");
        assert_eq!(l0, "if_true_0");
        assert_eq!(l1, "while_cond_1");
    }

    #[test]
    fn depth_guard_degrades_instead_of_overflowing() {
        let mut deep = MiniNode {
            kind: "mystery",
            children: vec![],
        };
        for _ in 0..5000 {
            deep = MiniNode {
                kind: "module",
                children: vec![deep],
            };
        }
        let mut lw = engine();
        lw.stmt("module", Lowerer::lower_block);
        let insts = lw.lower_root(&deep, b"");
        assert!(
            insts
                .iter()
                .any(|i| i.opcode() == Opcode::Symbolic && i.operands() == ["depth_limit_exceeded"])
        );
    }

    #[test]
    fn state_resets_between_calls() {
        let mut lw = engine();
        let root = MiniNode {
            kind: "module",
            children: vec![MiniNode {
                kind: "mystery",
                children: vec![],
            }],
        };
        let first = lw.lower_root(&root, b"");
        let second = lw.lower_root(&root, b"");
        assert_eq!(first, second);
    }
}
