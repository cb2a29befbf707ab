//! Reusable expression lowerers.
//!
//! These methods have handler-compatible signatures so adapters register
//! them directly, e.g. `lw.expr("identifier", Lowerer::lower_identifier)`.
//! All of them read grammar fields defensively and fall back to positional
//! children, emitting `CONST None` or a `SYMBOLIC "unknown_<role>"` when a
//! required piece is missing.

use smallvec::SmallVec;

use super::Lowerer;
use crate::{
    ir::{ArgRegs, InstKind, Reg},
    tracer::LowerTracer,
    tree::TreeNode,
};

/// Token kinds never meaningful as binop/unop operands or operators.
const PUNCTUATION: &[&str] = &["(", ")", ",", ";", "[", "]", "{", "}"];

impl<N: TreeNode, T: LowerTracer> Lowerer<N, T> {
    // ------------------------------------------------------------------
    // Names and literals
    // ------------------------------------------------------------------

    /// `LOAD_VAR <node text>`.
    pub fn lower_identifier(&mut self, node: &N) -> Reg {
        let name = self.text(node);
        self.load_var_at(node, name)
    }

    /// `CONST <node text>`, verbatim.
    pub fn lower_const_literal(&mut self, node: &N) -> Reg {
        let value = self.text(node);
        self.const_at(node, value)
    }

    /// Canonical null: `CONST None` regardless of source spelling.
    pub fn lower_none(&mut self, node: &N) -> Reg {
        let value = self.profile.none_literal;
        self.const_at(node, value)
    }

    /// Canonical true.
    pub fn lower_true(&mut self, node: &N) -> Reg {
        let value = self.profile.true_literal;
        self.const_at(node, value)
    }

    /// Canonical false.
    pub fn lower_false(&mut self, node: &N) -> Reg {
        let value = self.profile.false_literal;
        self.const_at(node, value)
    }

    /// Canonical bool for grammars with a single `boolean` node type:
    /// inspects the text case-insensitively.
    pub fn lower_canonical_bool(&mut self, node: &N) -> Reg {
        if self.text(node).eq_ignore_ascii_case("true") {
            self.lower_true(node)
        } else {
            self.lower_false(node)
        }
    }

    /// Unwraps a parenthesized expression.
    pub fn lower_paren(&mut self, node: &N) -> Reg {
        match self.useful_children(node).first() {
            Some(inner) => self.lower_expr(inner),
            None => {
                let value = self.profile.none_literal;
                self.const_at(node, value)
            }
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    /// Children with punctuation tokens filtered out, in source order.
    #[must_use]
    pub fn operator_parts(&self, node: &N) -> Vec<N> {
        node.children()
            .into_iter()
            .filter(|c| !PUNCTUATION.contains(&c.kind()) && !self.is_skippable(c.kind()))
            .collect()
    }

    /// Binary operation. Operator text passes through verbatim; the engine
    /// performs no cross-language normalization.
    pub fn lower_binop(&mut self, node: &N) -> Reg {
        let lhs_node = node.child_by_field_name("left");
        let rhs_node = node.child_by_field_name("right");
        let op_node = node.child_by_field_name("operator");
        let (lhs_node, op_node, rhs_node) = if lhs_node.is_some() && rhs_node.is_some() {
            (lhs_node, op_node.or_else(|| self.first_unnamed(node)), rhs_node)
        } else {
            let parts = self.operator_parts(node);
            (parts.first().cloned(), parts.get(1).cloned(), parts.get(2).cloned())
        };
        let op = op_node.map_or_else(|| "?".to_owned(), |n| self.text(&n));
        let lhs = match lhs_node {
            Some(n) => self.lower_expr(&n),
            None => {
                let value = self.profile.none_literal;
                self.const_at(node, value)
            }
        };
        let rhs = match rhs_node {
            Some(n) => self.lower_expr(&n),
            None => {
                let value = self.profile.none_literal;
                self.const_at(node, value)
            }
        };
        self.emit_binop(node, &op, lhs, rhs)
    }

    /// Emits `BINOP op, lhs, rhs` directly (for adapters that resolve the
    /// operator themselves).
    pub fn emit_binop(&mut self, node: &N, op: &str, lhs: Reg, rhs: Reg) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::Binop {
                dest,
                op: op.to_owned(),
                lhs,
                rhs,
            },
        );
        dest
    }

    /// Unary operation, prefix or single-operand.
    pub fn lower_unop(&mut self, node: &N) -> Reg {
        let operand_node = node
            .child_by_field_name("argument")
            .or_else(|| node.child_by_field_name("operand"))
            .or_else(|| self.useful_children(node).into_iter().next_back());
        let op_node = node
            .child_by_field_name("operator")
            .or_else(|| self.first_unnamed(node));
        let op = op_node.map_or_else(|| "?".to_owned(), |n| self.text(&n));
        let operand = match operand_node {
            Some(n) => self.lower_expr(&n),
            None => {
                let value = self.profile.none_literal;
                self.const_at(node, value)
            }
        };
        self.emit_unop(node, &op, operand)
    }

    /// Emits `UNOP op, operand` directly.
    pub fn emit_unop(&mut self, node: &N, op: &str, operand: Reg) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::Unop {
                dest,
                op: op.to_owned(),
                operand,
            },
        );
        dest
    }

    /// `x++` / `--x` style updates: read, add/subtract one, store back.
    pub fn lower_update_expr(&mut self, node: &N) -> Reg {
        let Some(operand) = self
            .field_or_nth(node, "argument", 0)
        else {
            return self.symbolic_at(node, "unknown_update_target");
        };
        let op = if self.text(node).contains("++") { "+" } else { "-" };
        let current = self.lower_expr(&operand);
        let one = self.const_at(node, "1");
        let updated = self.emit_binop(node, op, current, one);
        self.lower_store_target(&operand, updated);
        updated
    }

    fn first_unnamed(&self, node: &N) -> Option<N> {
        node.children()
            .into_iter()
            .find(|c| !c.is_named() && !PUNCTUATION.contains(&c.kind()))
    }

    // ------------------------------------------------------------------
    // Member access and subscripts
    // ------------------------------------------------------------------

    /// `obj.field` read.
    pub fn lower_attribute(&mut self, node: &N) -> Reg {
        let object = self.field_or_nth(node, self.profile.attr_object_field, 0);
        let attr = self.field_or_nth(node, self.profile.attr_attribute_field, 1);
        let (Some(object), Some(attr)) = (object, attr) else {
            return self.symbolic_at(node, "unknown_attribute");
        };
        let obj_reg = self.lower_expr(&object);
        let field = self.text(&attr);
        self.emit_load_field(node, obj_reg, &field)
    }

    /// Emits `LOAD_FIELD obj, field` directly.
    pub fn emit_load_field(&mut self, node: &N, object: Reg, field: &str) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::LoadField {
                dest,
                object,
                field: field.to_owned(),
            },
        );
        dest
    }

    /// `obj[idx]` read.
    pub fn lower_subscript(&mut self, node: &N) -> Reg {
        let object = self.field_or_nth(node, self.profile.subscript_value_field, 0);
        let Some(object) = object else {
            return self.symbolic_at(node, "unknown_subscript");
        };
        let obj_reg = self.lower_expr(&object);
        let index = node
            .child_by_field_name(self.profile.subscript_index_field)
            .or_else(|| self.useful_children(node).into_iter().nth(1));
        let idx_reg = match index {
            Some(n) => self.lower_expr(&n),
            None => self.symbolic_at(node, "unknown_index"),
        };
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::LoadIndex {
                dest,
                object: obj_reg,
                index: idx_reg,
            },
        );
        dest
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Three-way call dispatch: attribute-like callee → `CALL_METHOD`,
    /// plain name → `CALL_FUNCTION`, anything else → `CALL_UNKNOWN`
    /// through the lowered callee.
    pub fn lower_call(&mut self, node: &N) -> Reg {
        let Some(callee) = self.field_or_nth(node, self.profile.call_function_field, 0) else {
            return self.symbolic_at(node, "unknown_call_target");
        };
        let kind = callee.kind();
        if self.profile.method_call_node_types.contains(&kind) {
            let object = self.field_or_nth(&callee, self.profile.attr_object_field, 0);
            let attr = self.field_or_nth(&callee, self.profile.attr_attribute_field, 1);
            if let (Some(object), Some(attr)) = (object, attr) {
                let obj_reg = self.lower_expr(&object);
                let method = self.text(&attr);
                let args = self.lower_call_args(node);
                return self.emit_call_method(node, obj_reg, &method, args);
            }
            return self.symbolic_at(node, "unknown_call_target");
        }
        if self.profile.name_node_types.contains(&kind) {
            let name = self.text(&callee);
            let args = self.lower_call_args(node);
            return self.emit_call_function(node, &name, args);
        }
        let target = self.lower_expr(&callee);
        let args = self.lower_call_args(node);
        let dest = self.fresh_reg();
        self.push_at(node, InstKind::CallUnknown { dest, target, args });
        dest
    }

    /// Lowers the call's argument list into registers, in source order.
    pub fn lower_call_args(&mut self, call_node: &N) -> ArgRegs {
        let Some(args_node) = call_node
            .child_by_field_name(self.profile.call_arguments_field)
            .or_else(|| self.useful_children(call_node).into_iter().nth(1))
        else {
            return SmallVec::new();
        };
        self.lower_arg_children(&args_node)
    }

    /// Lowers each useful child of an argument-list node.
    pub fn lower_arg_children(&mut self, args_node: &N) -> ArgRegs {
        let children = self.useful_children(args_node);
        let mut regs = SmallVec::with_capacity(children.len());
        for child in &children {
            regs.push(self.lower_expr(child));
        }
        regs
    }

    /// Emits `CALL_FUNCTION name, args...` directly.
    pub fn emit_call_function(&mut self, node: &N, name: &str, args: ArgRegs) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::CallFunction {
                dest,
                name: name.to_owned(),
                args,
            },
        );
        dest
    }

    /// Emits `CALL_METHOD obj, method, args...` directly.
    pub fn emit_call_method(&mut self, node: &N, object: Reg, method: &str, args: ArgRegs) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::CallMethod {
                dest,
                object,
                method: method.to_owned(),
                args,
            },
        );
        dest
    }

    /// Wraps a single register as a one-argument call (`len`, `keys`, ...).
    pub fn emit_call_function1(&mut self, node: &N, name: &str, arg: Reg) -> Reg {
        let mut args: ArgRegs = SmallVec::new();
        args.push(arg);
        self.emit_call_function(node, name, args)
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    /// Plain assignment: lower the RHS, classify and store into the LHS.
    /// Returns the value register so expression-positioned assignments
    /// (`a = b = c`) chain naturally.
    pub fn lower_assignment(&mut self, node: &N) -> Reg {
        let left = self.field_or_nth(node, self.profile.assign_left_field, 0);
        let right = node
            .child_by_field_name(self.profile.assign_right_field)
            .or_else(|| self.useful_children(node).into_iter().nth(1));
        let value = match right {
            Some(n) => self.lower_expr(&n),
            None => {
                let none = self.profile.none_literal;
                self.const_at(node, none)
            }
        };
        if let Some(target) = left {
            self.lower_store_target(&target, value);
        }
        value
    }

    /// Augmented assignment (`x += v`): read target, apply the operator
    /// with the trailing `=` stripped, store back.
    pub fn lower_aug_assignment(&mut self, node: &N) -> Reg {
        let left = self.field_or_nth(node, self.profile.assign_left_field, 0);
        let right = node
            .child_by_field_name(self.profile.assign_right_field)
            .or_else(|| self.useful_children(node).into_iter().nth(1));
        let op_text = node
            .child_by_field_name("operator")
            .or_else(|| self.first_unnamed(node))
            .map_or_else(|| "?".to_owned(), |n| self.text(&n));
        let op = op_text.strip_suffix('=').unwrap_or(&op_text).to_owned();
        let Some(target) = left else {
            return self.symbolic_at(node, "unknown_store_target");
        };
        let current = self.lower_expr(&target);
        let value = match right {
            Some(n) => self.lower_expr(&n),
            None => {
                let none = self.profile.none_literal;
                self.const_at(node, none)
            }
        };
        let updated = self.emit_binop(node, &op, current, value);
        self.lower_store_target(&target, updated);
        updated
    }

    /// Assignment dispatch for grammars where one node kind covers `=` and
    /// every compound operator: the operator text decides the lowering.
    pub fn lower_assignment_auto(&mut self, node: &N) -> Reg {
        let operator = node
            .child_by_field_name("operator")
            .or_else(|| self.first_unnamed(node))
            .map_or_else(|| "=".to_owned(), |op| self.text(&op));
        if operator == "=" {
            self.lower_assignment(node)
        } else {
            self.lower_aug_assignment(node)
        }
    }

    /// Statement wrapper for grammars that nest expressions inside an
    /// `expression_statement` container.
    pub fn lower_expression_statement(&mut self, node: &N) {
        for child in self.useful_children(node) {
            let _ = self.lower_expr(&child);
        }
    }

    // ------------------------------------------------------------------
    // Collection literals
    // ------------------------------------------------------------------

    /// Emits `NEW_ARRAY tag, size` directly.
    pub fn emit_new_array(&mut self, node: &N, tag: &str, size: Reg) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(
            node,
            InstKind::NewArray {
                dest,
                tag: tag.to_owned(),
                size,
            },
        );
        dest
    }

    /// Emits `NEW_OBJECT tag` directly.
    pub fn emit_new_object(&mut self, node: &N, tag: &str) -> Reg {
        let dest = self.fresh_reg();
        self.push_at(node, InstKind::NewObject { dest, tag: tag.to_owned() });
        dest
    }

    /// Emits `STORE_INDEX obj, idx, val` directly.
    pub fn emit_store_index(&mut self, node: &N, object: Reg, index: Reg, src: Reg) {
        self.push_at(node, InstKind::StoreIndex { object, index, src });
    }

    /// Emits `STORE_FIELD obj, field, val` directly.
    pub fn emit_store_field(&mut self, node: &N, object: Reg, field: &str, src: Reg) {
        self.push_at(
            node,
            InstKind::StoreField {
                object,
                field: field.to_owned(),
                src,
            },
        );
    }

    /// Sequence literal: `NEW_ARRAY tag, size` then one `STORE_INDEX` per
    /// element, indexed from zero.
    pub fn lower_sequence_elems(&mut self, node: &N, tag: &str, elems: &[N]) -> Reg {
        let size = self.const_at(node, elems.len().to_string());
        let arr = self.emit_new_array(node, tag, size);
        for (i, elem) in elems.iter().enumerate() {
            let idx = self.const_at(elem, i.to_string());
            let val = self.lower_expr(elem);
            self.emit_store_index(elem, arr, idx, val);
        }
        arr
    }

    /// `[a, b, c]` → list.
    pub fn lower_list(&mut self, node: &N) -> Reg {
        let elems = self.useful_children(node);
        self.lower_sequence_elems(node, "list", &elems)
    }

    /// `(a, b, c)` → tuple.
    pub fn lower_tuple(&mut self, node: &N) -> Reg {
        let elems = self.useful_children(node);
        self.lower_sequence_elems(node, "tuple", &elems)
    }

    /// `{a, b, c}` → set.
    pub fn lower_set(&mut self, node: &N) -> Reg {
        let elems = self.useful_children(node);
        self.lower_sequence_elems(node, "set", &elems)
    }

    /// Dict literal: `NEW_OBJECT "dict"` then one `STORE_INDEX` per pair.
    pub fn lower_dict(&mut self, node: &N) -> Reg {
        let obj = self.emit_new_object(node, "dict");
        for pair in self.useful_children(node) {
            self.lower_pair_into(&pair, obj);
        }
        obj
    }

    /// Lowers one key/value pair node into an existing object register.
    pub fn lower_pair_into(&mut self, pair: &N, obj: Reg) {
        let key = self.field_or_nth(pair, "key", 0);
        let value = pair
            .child_by_field_name("value")
            .or_else(|| self.useful_children(pair).into_iter().nth(1));
        let (Some(key), Some(value)) = (key, value) else {
            // Spreads and other non-pair entries are lowered for effect only.
            let _ = self.lower_expr(pair);
            return;
        };
        let key_reg = self.lower_expr(&key);
        let val_reg = self.lower_expr(&value);
        self.emit_store_index(pair, obj, key_reg, val_reg);
    }

    // ------------------------------------------------------------------
    // Expression-valued conditionals (phi variables)
    // ------------------------------------------------------------------

    /// Lowers a two-armed conditional expression through a synthesized phi
    /// variable: both arms store into the variable and the merge point
    /// loads it back as the result.
    pub fn lower_phi_branch<FT, FF>(&mut self, node: &N, prefix: &str, cond: Reg, then_arm: FT, else_arm: FF) -> Reg
    where
        FT: FnOnce(&mut Self) -> Reg,
        FF: FnOnce(&mut Self) -> Reg,
    {
        let phi = self.fresh_synthetic(prefix);
        let true_label = self.fresh_label("if_true");
        let false_label = self.fresh_label("if_false");
        let end_label = self.fresh_label("if_end");
        self.branch_if_at(node, cond, &true_label, &false_label);
        self.label_at(node, &true_label);
        let t = then_arm(self);
        self.store_var_at(node, &phi, t);
        self.branch_at(node, &end_label);
        self.label_at(node, &false_label);
        let f = else_arm(self);
        self.store_var_at(node, &phi, f);
        self.branch_at(node, &end_label);
        self.label_at(node, &end_label);
        self.load_var_at(node, &phi)
    }

    /// `cond ? a : b` with the common condition/consequence/alternative
    /// field names.
    pub fn lower_ternary(&mut self, node: &N) -> Reg {
        let cond = self.field_or_nth(node, "condition", 0);
        let consequence = node
            .child_by_field_name("consequence")
            .or_else(|| node.child_by_field_name("body"))
            .or_else(|| self.useful_children(node).into_iter().nth(1));
        let alternative = node
            .child_by_field_name("alternative")
            .or_else(|| self.useful_children(node).into_iter().nth(2));
        let cond_reg = match cond {
            Some(n) => self.lower_expr(&n),
            None => {
                let value = self.profile.true_literal;
                self.const_at(node, value)
            }
        };
        self.lower_phi_branch(
            node,
            "__ternary",
            cond_reg,
            |lw| match &consequence {
                Some(n) => lw.lower_expr(n),
                None => {
                    let value = lw.profile.none_literal;
                    lw.const_at(node, value)
                }
            },
            |lw| match &alternative {
                Some(n) => lw.lower_expr(n),
                None => {
                    let value = lw.profile.none_literal;
                    lw.const_at(node, value)
                }
            },
        )
    }
}
