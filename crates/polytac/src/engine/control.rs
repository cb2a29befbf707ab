//! Reusable control-flow lowerers.
//!
//! All control flow lowers to the same flat shape: labels, unconditional
//! branches, and two-target conditional branches. Loop constructs push a
//! `{continue, end}` context so `break`/`continue` resolve against the
//! innermost enclosing loop; switch lowerers push their end label on the
//! break-target stack only.

use super::Lowerer;
use crate::{
    ir::{InstKind, Reg},
    tracer::LowerTracer,
    tree::TreeNode,
};

/// The uniform catch-clause shape adapters extract from their grammar's
/// catch/rescue/except nodes before calling [`Lowerer::lower_try_catch`].
#[derive(Debug, Clone)]
pub struct CatchClause<N> {
    /// The handler body, if present.
    pub body: Option<N>,
    /// The caught-exception binding variable, if any.
    pub variable: Option<String>,
    /// The exception type text, if any.
    pub type_name: Option<String>,
}

/// One arm of a switch/match construct, extracted by the adapter.
#[derive(Debug, Clone)]
pub struct SwitchArm<N> {
    /// Case value expressions; multiple values are OR-chained.
    pub values: Vec<N>,
    /// Statements of the arm body.
    pub body: Vec<N>,
    /// Whether this is the default/else arm.
    pub is_default: bool,
}

impl<N: TreeNode, T: LowerTracer> Lowerer<N, T> {
    // ------------------------------------------------------------------
    // Conditionals
    // ------------------------------------------------------------------

    /// If statement over the profile's condition/consequence/alternative
    /// fields. Grammars that attach a flat run of elif/else alternatives to
    /// one node (tree-sitter-python) and grammars that nest the chain in
    /// the alternative (JavaScript `else if`) both lower to the same
    /// branch shape. A missing condition degrades to an always-true branch
    /// so linear control flow is preserved.
    pub fn lower_if(&mut self, node: &N) {
        let cond = node.child_by_field_name(self.profile.if_condition_field);
        let consequence = self.field_or_nth(node, self.profile.if_consequence_field, 1);
        // Grammars with clause nodes carry a flat run of elif/else children;
        // grammars without (Java, Go) put a bare statement in the
        // alternative field.
        let mut alternatives: Vec<N> = self
            .useful_children(node)
            .into_iter()
            .filter(|c| {
                self.profile.elif_node_types.contains(&c.kind()) || self.profile.else_node_types.contains(&c.kind())
            })
            .collect();
        if alternatives.is_empty() {
            if let Some(alt) = node.child_by_field_name(self.profile.if_alternative_field) {
                alternatives.push(alt);
            }
        }
        self.lower_if_chain(node, cond.as_ref(), consequence.as_ref(), &alternatives);
    }

    /// One link of an if/elif/else chain.
    pub fn lower_if_chain(&mut self, node: &N, cond: Option<&N>, consequence: Option<&N>, alternatives: &[N]) {
        let cond_reg = match cond {
            Some(n) => self.lower_expr(n),
            None => {
                let value = self.profile.true_literal;
                self.const_at(node, value)
            }
        };
        let true_label = self.fresh_label("if_true");
        let end_label = self.fresh_label("if_end");
        if let Some((first, rest)) = alternatives.split_first() {
            let false_label = self.fresh_label("if_false");
            self.branch_if_at(node, cond_reg, &true_label, &false_label);
            self.label_at(node, &true_label);
            if let Some(body) = consequence {
                self.lower_block(body);
            }
            self.branch_at(node, &end_label);
            self.label_at(node, &false_label);
            if self.profile.elif_node_types.contains(&first.kind()) {
                let elif_cond = first.child_by_field_name(self.profile.if_condition_field);
                let elif_body = self.field_or_nth(first, self.profile.if_consequence_field, 1);
                self.lower_if_chain(first, elif_cond.as_ref(), elif_body.as_ref(), rest);
            } else {
                self.lower_alternative(first);
            }
            self.branch_at(node, &end_label);
        } else {
            self.branch_if_at(node, cond_reg, &true_label, &end_label);
            self.label_at(node, &true_label);
            if let Some(body) = consequence {
                self.lower_block(body);
            }
            self.branch_at(node, &end_label);
        }
        self.label_at(node, &end_label);
    }

    /// Lowers an if alternative: elif shapes recurse into [`Self::lower_if`],
    /// else clauses lower their body, anything else lowers as a block.
    pub fn lower_alternative(&mut self, node: &N) {
        let kind = node.kind();
        if self.profile.elif_node_types.contains(&kind) {
            self.lower_if(node);
            return;
        }
        if self.profile.else_node_types.contains(&kind) {
            if let Some(body) = node.child_by_field_name("body") {
                self.lower_block(&body);
            } else {
                for child in self.useful_children(node) {
                    self.lower_stmt(&child);
                }
            }
            return;
        }
        self.lower_block(node);
    }

    // ------------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------------

    /// Pre-test loop over the profile's condition/body fields.
    pub fn lower_while(&mut self, node: &N) {
        let cond = self.field_or_nth(node, self.profile.while_condition_field, 0);
        let body = node
            .child_by_field_name(self.profile.while_body_field)
            .or_else(|| self.useful_children(node).into_iter().next_back());

        let cond_label = self.fresh_label("while_cond");
        let body_label = self.fresh_label("while_body");
        let end_label = self.fresh_label("while_end");
        self.label_at(node, &cond_label);
        let cond_reg = match cond {
            Some(n) => self.lower_expr(&n),
            None => {
                let value = self.profile.true_literal;
                self.const_at(node, value)
            }
        };
        self.branch_if_at(node, cond_reg, &body_label, &end_label);
        self.label_at(node, &body_label);
        self.push_loop(&cond_label, &end_label);
        if let Some(body) = body {
            self.lower_block(&body);
        }
        self.pop_loop();
        self.branch_at(node, &cond_label);
        self.label_at(node, &end_label);
    }

    /// Post-test loop (`do..while`, `repeat..until`). When
    /// `continue_while_true` is false the branch targets swap, so the loop
    /// re-enters while the condition is false (`repeat..until`).
    pub fn lower_post_test_loop(&mut self, node: &N, body: Option<&N>, cond: Option<&N>, continue_while_true: bool) {
        let body_label = self.fresh_label("loop_body");
        let cond_label = self.fresh_label("loop_cond");
        let end_label = self.fresh_label("loop_end");
        self.label_at(node, &body_label);
        self.push_loop(&cond_label, &end_label);
        if let Some(body) = body {
            self.lower_block(body);
        }
        self.pop_loop();
        self.label_at(node, &cond_label);
        let cond_reg = match cond {
            Some(n) => self.lower_expr(n),
            None => {
                let value = self.profile.false_literal;
                self.const_at(node, value)
            }
        };
        if continue_while_true {
            self.branch_if_at(node, cond_reg, &body_label, &end_label);
        } else {
            self.branch_if_at(node, cond_reg, &end_label, &body_label);
        }
        self.label_at(node, &end_label);
    }

    /// C-style `for (init; cond; update)`. `continue` targets the update
    /// label when an update exists, otherwise the condition label.
    pub fn lower_c_style_for(&mut self, node: &N, init: Option<&N>, cond: Option<&N>, update: Option<&N>, body: Option<&N>) {
        if let Some(init) = init {
            self.lower_stmt(init);
        }
        let cond_label = self.fresh_label("for_cond");
        let body_label = self.fresh_label("for_body");
        let end_label = self.fresh_label("for_end");
        let update_label = update.map(|_| self.fresh_label("for_update"));

        self.label_at(node, &cond_label);
        match cond {
            Some(n) => {
                let cond_reg = self.lower_expr(n);
                self.branch_if_at(node, cond_reg, &body_label, &end_label);
            }
            None => self.branch_at(node, &body_label),
        }
        self.label_at(node, &body_label);
        let continue_label = update_label.as_deref().unwrap_or(&cond_label).to_owned();
        self.push_loop(&continue_label, &end_label);
        if let Some(body) = body {
            self.lower_block(body);
        }
        self.pop_loop();
        if let Some(update_label) = &update_label {
            self.label_at(node, update_label);
            if let Some(update) = update {
                self.lower_stmt(update);
            }
        }
        self.branch_at(node, &cond_label);
        self.label_at(node, &end_label);
    }

    /// For-each desugared to an index loop over a pre-lowered iterable
    /// register: a synthetic index variable counts from zero to
    /// `len(iter)`, loading `iter[idx]` into the loop target each pass.
    pub fn lower_foreach_indexed(&mut self, node: &N, iter: Reg, target: Option<&N>, body: Option<&N>) {
        let body = body.cloned();
        self.lower_foreach_with(node, iter, target, |lw| {
            if let Some(body) = &body {
                lw.lower_block(body);
            }
        });
    }

    /// Closure-bodied variant of the indexed for-each desugar, also used by
    /// comprehension lowering. `each` runs inside the loop context, after
    /// the element has been stored into `target` (when present).
    pub fn lower_foreach_with(&mut self, node: &N, iter: Reg, target: Option<&N>, each: impl FnOnce(&mut Self)) {
        let idx_var = self.fresh_synthetic("__foreach_idx");
        let zero = self.const_at(node, "0");
        self.store_var_at(node, &idx_var, zero);
        let len = self.emit_call_function1(node, "len", iter);

        let cond_label = self.fresh_label("foreach_cond");
        let body_label = self.fresh_label("foreach_body");
        let end_label = self.fresh_label("foreach_end");
        self.label_at(node, &cond_label);
        let idx = self.load_var_at(node, &idx_var);
        let in_bounds = self.emit_binop(node, "<", idx, len);
        self.branch_if_at(node, in_bounds, &body_label, &end_label);
        self.label_at(node, &body_label);
        let element = {
            let dest = self.fresh_reg();
            self.push_at(
                node,
                InstKind::LoadIndex {
                    dest,
                    object: iter,
                    index: idx,
                },
            );
            dest
        };
        if let Some(target) = target {
            self.lower_store_target(target, element);
        }
        self.push_loop(&cond_label, &end_label);
        each(self);
        self.pop_loop();
        let idx_again = self.load_var_at(node, &idx_var);
        let one = self.const_at(node, "1");
        let bumped = self.emit_binop(node, "+", idx_again, one);
        self.store_var_at(node, &idx_var, bumped);
        self.branch_at(node, &cond_label);
        self.label_at(node, &end_label);
    }

    // ------------------------------------------------------------------
    // Switch / match chains
    // ------------------------------------------------------------------

    /// Lowers switch arms as an if-else chain against a pre-lowered
    /// subject. Fall-through is not modeled: every arm ends with a branch
    /// to the end label, which also serves as the `break` target. Multiple
    /// case values OR-chain with `or_op`; default arms branch
    /// unconditionally.
    pub fn lower_switch_chain(&mut self, node: &N, subject: Reg, arms: &[SwitchArm<N>], eq_op: &str, or_op: &str) {
        let end_label = self.fresh_label("switch_end");
        self.push_break_target(&end_label);
        for arm in arms {
            let arm_label = self.fresh_label("switch_arm");
            let next_label = self.fresh_label("switch_next");
            if arm.is_default || arm.values.is_empty() {
                self.branch_at(node, &arm_label);
            } else {
                let mut matched: Option<Reg> = None;
                for value in &arm.values {
                    let value_reg = self.lower_expr(value);
                    let cmp = self.emit_binop(value, eq_op, subject, value_reg);
                    matched = Some(match matched {
                        Some(acc) => self.emit_binop(value, or_op, acc, cmp),
                        None => cmp,
                    });
                }
                if let Some(matched) = matched {
                    self.branch_if_at(node, matched, &arm_label, &next_label);
                }
            }
            self.label_at(node, &arm_label);
            for stmt in &arm.body {
                self.lower_stmt(stmt);
            }
            self.branch_at(node, &end_label);
            self.label_at(node, &next_label);
        }
        self.pop_break_target();
        self.label_at(node, &end_label);
    }

    /// Expression-positioned switch/match/when: like
    /// [`Self::lower_switch_chain`] but every arm stores its last value
    /// into a synthesized phi variable, loaded back at the merge point.
    /// The phi is initialized to the canonical null so the merge load is
    /// defined even when no arm matches.
    pub fn lower_switch_phi_chain(
        &mut self,
        node: &N,
        subject: Reg,
        arms: &[SwitchArm<N>],
        eq_op: &str,
        or_op: &str,
        phi_prefix: &str,
    ) -> Reg {
        let phi = self.fresh_synthetic(phi_prefix);
        let none = self.profile.none_literal;
        let initial = self.const_at(node, none);
        self.store_var_at(node, &phi, initial);
        let end_label = self.fresh_label("switch_end");
        self.push_break_target(&end_label);
        for arm in arms {
            let arm_label = self.fresh_label("switch_arm");
            let next_label = self.fresh_label("switch_next");
            if arm.is_default || arm.values.is_empty() {
                self.branch_at(node, &arm_label);
            } else {
                let mut matched: Option<Reg> = None;
                for value in &arm.values {
                    let value_reg = self.lower_expr(value);
                    let cmp = self.emit_binop(value, eq_op, subject, value_reg);
                    matched = Some(match matched {
                        Some(acc) => self.emit_binop(value, or_op, acc, cmp),
                        None => cmp,
                    });
                }
                if let Some(matched) = matched {
                    self.branch_if_at(node, matched, &arm_label, &next_label);
                }
            }
            self.label_at(node, &arm_label);
            if let Some((last, init)) = arm.body.split_last() {
                for stmt in init {
                    self.lower_stmt(stmt);
                }
                let value = self.lower_expr(last);
                self.store_var_at(last, &phi, value);
            } else {
                let value = self.const_at(node, none);
                self.store_var_at(node, &phi, value);
            }
            self.branch_at(node, &end_label);
            self.label_at(node, &next_label);
        }
        self.pop_break_target();
        self.label_at(node, &end_label);
        self.load_var_at(node, &phi)
    }

    // ------------------------------------------------------------------
    // Exceptions
    // ------------------------------------------------------------------

    /// Try/catch in the uniform clause shape. The body is labeled; each
    /// clause gets its own label, a `SYMBOLIC "caught_exception:<type>"`
    /// placeholder (stored into the binding variable when one exists), and
    /// its body; all paths converge on the finally block (when present)
    /// and then the end label.
    pub fn lower_try_catch(
        &mut self,
        node: &N,
        body: Option<&N>,
        clauses: &[CatchClause<N>],
        else_block: Option<&N>,
        finally_block: Option<&N>,
    ) {
        let body_label = self.fresh_label("try_body");
        let finally_label = finally_block.map(|_| self.fresh_label("try_finally"));
        let end_label = self.fresh_label("try_end");
        let converge = finally_label.as_deref().unwrap_or(&end_label).to_owned();

        self.label_at(node, &body_label);
        if let Some(body) = body {
            self.lower_block(body);
        }
        if let Some(else_block) = else_block {
            self.lower_block(else_block);
        }
        self.branch_at(node, &converge);

        for clause in clauses {
            let clause_label = self.fresh_label("catch");
            self.label_at(node, &clause_label);
            let hint = match &clause.type_name {
                Some(ty) => format!("caught_exception:{ty}"),
                None => "caught_exception:any".to_owned(),
            };
            let caught = self.symbolic_at(node, &hint);
            if let Some(variable) = &clause.variable {
                self.store_var_at(node, variable, caught);
            }
            if let Some(body) = &clause.body {
                self.lower_block(body);
            }
            self.branch_at(node, &converge);
        }

        if let (Some(finally_label), Some(finally_block)) = (finally_label, finally_block) {
            self.label_at(node, &finally_label);
            self.lower_block(finally_block);
            self.branch_at(node, &end_label);
        }
        self.label_at(node, &end_label);
    }

    /// `THROW` of the first useful child (or the canonical null when the
    /// raise carries no value).
    pub fn lower_throw(&mut self, node: &N) {
        let value = match self.useful_children(node).first() {
            Some(child) => self.lower_expr(child),
            None => {
                let none = self.profile.none_literal;
                self.const_at(node, none)
            }
        };
        self.push_at(node, InstKind::Throw { value });
    }

    // ------------------------------------------------------------------
    // Jumps
    // ------------------------------------------------------------------

    /// `return [expr]`; without an operand the profile's default return
    /// value is materialized.
    pub fn lower_return(&mut self, node: &N) {
        let value = match self.useful_children(node).first() {
            Some(child) => self.lower_expr(child),
            None => {
                let default = self.profile.default_return_value;
                self.const_at(node, default)
            }
        };
        self.push_at(node, InstKind::Return { value });
    }

    /// Emits the implicit `CONST <default>; RETURN` pair.
    pub fn emit_implicit_return(&mut self, node: &N) {
        let default = self.profile.default_return_value;
        let value = self.const_at(node, default);
        self.push_at(node, InstKind::Return { value });
    }

    /// Emits `RETURN value` directly.
    pub fn emit_return(&mut self, node: &N, value: Reg) {
        self.push_at(node, InstKind::Return { value });
    }

    /// `break` targets the innermost break target (loop or switch end).
    /// Outside any loop or switch it degrades to a `SYMBOLIC`.
    pub fn lower_break(&mut self, node: &N) {
        match self.break_target() {
            Some(target) => self.branch_at(node, target),
            None => {
                self.symbolic_at(node, "break_outside_loop_or_switch");
            }
        }
    }

    /// `continue` targets the innermost loop's continue label.
    pub fn lower_continue(&mut self, node: &N) {
        match self.continue_target() {
            Some(target) => self.branch_at(node, target),
            None => {
                self.symbolic_at(node, "continue_outside_loop");
            }
        }
    }
}
