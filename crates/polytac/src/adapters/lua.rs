//! Lua frontend over the tree-sitter-lua grammar.
//!
//! Tables index positionally from 1, `repeat..until` re-enters while its
//! condition is false, method calls (`a:m()`) carry their receiver, and
//! goto labels map directly onto IR labels. There are no classes.

use crate::{
    engine::{Lowerer, Profile},
    ir::{ArgRegs, InstKind, Reg},
    tracer::LowerTracer,
    tree::TreeNode,
};

pub(crate) fn lowerer<N: TreeNode, T: LowerTracer>(tracer: T) -> Lowerer<N, T> {
    let mut lw = Lowerer::with_tracer(profile(), tracer);
    install(&mut lw);
    lw
}

fn profile<N: TreeNode, T: LowerTracer>() -> Profile<N, T> {
    Profile {
        attr_object_field: "table",
        attr_attribute_field: "field",
        attribute_node_type: "dot_index_expression",
        method_call_node_types: &["dot_index_expression"],
        subscript_node_types: &["bracket_index_expression"],
        subscript_value_field: "table",
        subscript_index_field: "field",
        block_node_types: &["chunk", "block"],
        elif_node_types: &["elseif_statement"],
        else_node_types: &["else_statement"],
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("chunk", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("variable_declaration", lower_variable_declaration),
        ("assignment_statement", lower_assignment_statement),
        ("if_statement", Lowerer::lower_if),
        ("while_statement", Lowerer::lower_while),
        ("repeat_statement", lower_repeat),
        ("for_statement", lower_for),
        ("function_declaration", lower_function_declaration),
        ("return_statement", Lowerer::lower_return),
        ("break_statement", Lowerer::lower_break),
        ("goto_statement", lower_goto),
        ("label_statement", lower_label),
        ("do_statement", lower_do),
        ("empty_statement", lower_empty),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("number", Lowerer::lower_const_literal),
        ("string", Lowerer::lower_const_literal),
        ("true", Lowerer::lower_true),
        ("false", Lowerer::lower_false),
        ("nil", Lowerer::lower_none),
        ("vararg_expression", Lowerer::lower_identifier),
        ("binary_expression", Lowerer::lower_binop),
        ("unary_expression", Lowerer::lower_unop),
        ("function_call", lower_call),
        ("dot_index_expression", Lowerer::lower_attribute),
        ("bracket_index_expression", Lowerer::lower_subscript),
        ("method_index_expression", lower_method_index),
        ("table_constructor", lower_table),
        ("function_definition", lower_function_expression),
        ("parenthesized_expression", Lowerer::lower_paren),
    ]);
}

fn lower_empty<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// `local x = v` wraps an assignment; a bare `local x` binds nothing.
fn lower_variable_declaration<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for child in lw.useful_children(node) {
        if child.kind() == "assignment_statement" {
            lower_assignment_statement(lw, &child);
        }
    }
}

/// `a, b = x, y` stores pairwise; a single multi-valued RHS destructures
/// by index.
fn lower_assignment_statement<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let targets: Vec<N> = node
        .child_by_field_name("left")
        .map(|l| lw.useful_children(&l))
        .unwrap_or_else(|| {
            lw.useful_children(node)
                .into_iter()
                .filter(|c| c.kind() == "variable_list")
                .flat_map(|l| lw.useful_children(&l))
                .collect()
        });
    let values: Vec<N> = node
        .child_by_field_name("right")
        .map(|r| lw.useful_children(&r))
        .unwrap_or_else(|| {
            lw.useful_children(node)
                .into_iter()
                .filter(|c| c.kind() == "expression_list")
                .flat_map(|l| lw.useful_children(&l))
                .collect()
        });
    if targets.len() > 1 && values.len() == 1 {
        let value = lw.lower_expr(&values[0]);
        lw.lower_pattern_elements(&targets, value);
        return;
    }
    for (target, value_node) in targets.iter().zip(values.iter()) {
        let value = lw.lower_expr(value_node);
        lw.lower_store_target(target, value);
    }
}

/// `repeat .. until cond` re-enters the body while the condition is false,
/// so the branch targets swap relative to `do..while`.
fn lower_repeat<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    lw.lower_post_test_loop(node, body.as_ref(), cond.as_ref(), false);
}

fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let clause = node
        .child_by_field_name("clause")
        .or_else(|| {
            lw.useful_children(node)
                .into_iter()
                .find(|c| matches!(c.kind(), "for_generic_clause" | "for_numeric_clause"))
        });
    match clause {
        Some(clause) if clause.kind() == "for_numeric_clause" => lower_numeric_for(lw, node, &clause, body.as_ref()),
        Some(clause) => lower_generic_for(lw, node, &clause, body.as_ref()),
        None => {
            if let Some(body) = body {
                lw.lower_block(&body);
            }
        }
    }
}

/// `for i = start, stop[, step]` counts with `<=` against the bound.
fn lower_numeric_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, clause: &N, body: Option<&N>) {
    let name = clause
        .child_by_field_name("name")
        .map_or_else(|| "i".to_owned(), |n| lw.text(&n));
    let start = clause.child_by_field_name("start");
    let stop = clause.child_by_field_name("end");
    let step = clause.child_by_field_name("step");

    let start_reg = match start {
        Some(n) => lw.lower_expr(&n),
        None => lw.const_at(clause, "1"),
    };
    lw.store_var_at(clause, &name, start_reg);
    let stop_reg = match stop {
        Some(n) => lw.lower_expr(&n),
        None => lw.const_at(clause, "0"),
    };
    let step_reg = match step {
        Some(n) => lw.lower_expr(&n),
        None => lw.const_at(clause, "1"),
    };

    let cond_label = lw.fresh_label("for_cond");
    let body_label = lw.fresh_label("for_body");
    let update_label = lw.fresh_label("for_update");
    let end_label = lw.fresh_label("for_end");
    lw.label_at(node, &cond_label);
    let current = lw.load_var_at(node, &name);
    let in_bounds = lw.emit_binop(node, "<=", current, stop_reg);
    lw.branch_if_at(node, in_bounds, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.push_loop(&update_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(body);
    }
    lw.pop_loop();
    lw.label_at(node, &update_label);
    let again = lw.load_var_at(node, &name);
    let bumped = lw.emit_binop(node, "+", again, step_reg);
    lw.store_var_at(node, &name, bumped);
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

/// `for k, v in pairs(t)`: the increment lands in the synthetic
/// `__for_idx` name while the comparison keeps reading the initial index
/// register. This mirrors the documented simplification in the generic-for
/// lowering; the loop shape stays analyzable either way.
fn lower_generic_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, clause: &N, body: Option<&N>) {
    let targets: Vec<N> = clause
        .child_by_field_name("left")
        .map(|l| lw.useful_children(&l))
        .unwrap_or_default();
    let iter = match clause
        .child_by_field_name("right")
        .and_then(|r| lw.useful_children(&r).into_iter().next())
    {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(clause, "unknown_iterable"),
    };

    let idx_name = lw.fresh_synthetic("__for_idx");
    let idx = lw.const_at(node, "0");
    let len = lw.emit_call_function1(node, "len", iter);
    let cond_label = lw.fresh_label("foreach_cond");
    let body_label = lw.fresh_label("foreach_body");
    let end_label = lw.fresh_label("foreach_end");
    lw.label_at(node, &cond_label);
    let in_bounds = lw.emit_binop(node, "<", idx, len);
    lw.branch_if_at(node, in_bounds, &body_label, &end_label);
    lw.label_at(node, &body_label);
    match targets.len() {
        0 => {}
        1 => {
            let element = load_index(lw, node, iter, idx);
            lw.lower_store_target(&targets[0], element);
        }
        _ => {
            lw.lower_store_target(&targets[0], idx);
            let element = load_index(lw, node, iter, idx);
            lw.lower_store_target(&targets[1], element);
        }
    }
    lw.push_loop(&cond_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(body);
    }
    lw.pop_loop();
    let one = lw.const_at(node, "1");
    let bumped = lw.emit_binop(node, "+", idx, one);
    lw.store_var_at(node, &idx_name, bumped);
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

fn load_index<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, object: Reg, index: Reg) -> Reg {
    let dest = lw.fresh_reg();
    lw.push_at(node, InstKind::LoadIndex { dest, object, index });
    dest
}

/// `function t.f()` and `function t:m()` store through their index
/// expression; plain names store as variables.
fn lower_function_declaration<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name_node = node.child_by_field_name("name");
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    let name = name_node.as_ref().map_or_else(|| "anonymous".to_owned(), |n| lw.text(n));
    // Dotted and method names keep only the last component for the label.
    let label_name = name.rsplit([':', '.']).next().unwrap_or(&name).to_owned();
    let reference = lw.lower_function_parts(node, &label_name, params.as_ref(), body.as_ref());
    match name_node {
        Some(target) if !lw.profile.name_node_types.contains(&target.kind()) => {
            lw.lower_store_target(&target, reference);
        }
        Some(target) => {
            let text = lw.text(&target);
            lw.store_var_at(&target, text, reference);
        }
        None => {}
    }
}

fn lower_function_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__anon", params.as_ref(), body.as_ref())
}

/// Lua goto labels map directly onto IR labels.
fn lower_goto<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    match lw.useful_children(node).into_iter().next() {
        Some(label) => {
            let target = lw.text(&label);
            lw.branch_at(node, target);
        }
        None => {
            lw.symbolic_at(node, "unknown_goto_target");
        }
    }
}

fn lower_label<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(label) = lw.useful_children(node).into_iter().next() {
        let name = lw.text(&label);
        lw.label_at(node, name);
    }
}

fn lower_do<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_block(&body);
    }
}

/// Calls through `a:m()` become method calls; `a.f()` and plain names
/// follow the engine's three-way dispatch.
fn lower_call<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let Some(callee) = node.child_by_field_name("name") else {
        return lw.symbolic_at(node, "unknown_call_target");
    };
    if callee.kind() == "method_index_expression" {
        let table = callee.child_by_field_name("table");
        let method = callee
            .child_by_field_name("method")
            .map_or_else(|| "anonymous".to_owned(), |m| lw.text(&m));
        let obj = match table {
            Some(t) => lw.lower_expr(&t),
            None => lw.symbolic_at(&callee, "unknown_call_target"),
        };
        let args = match node.child_by_field_name("arguments") {
            Some(args_node) => lw.lower_arg_children(&args_node),
            None => ArgRegs::new(),
        };
        return lw.emit_call_method(node, obj, &method, args);
    }
    lw.lower_call(node)
}

/// `a:m` outside a call reads the method as a field.
fn lower_method_index<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let table = node.child_by_field_name("table");
    let method = node
        .child_by_field_name("method")
        .map_or_else(|| "anonymous".to_owned(), |m| lw.text(&m));
    let obj = match table {
        Some(t) => lw.lower_expr(&t),
        None => return lw.symbolic_at(node, "unknown_attribute"),
    };
    lw.emit_load_field(node, obj, &method)
}

/// Table constructors allocate a `"table"` object; named fields store
/// under their name, positional entries index from 1.
fn lower_table<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let table = lw.emit_new_object(node, "table");
    let mut position = 1usize;
    for field in lw.useful_children(node) {
        if field.kind() != "field" {
            let _ = lw.lower_expr(&field);
            continue;
        }
        if let Some(name) = field.child_by_field_name("name") {
            let key_text = lw.text(&name);
            let key = lw.const_at(&name, key_text);
            let value = match field.child_by_field_name("value") {
                Some(v) => lw.lower_expr(&v),
                None => {
                    let none = lw.profile.none_literal;
                    lw.const_at(&field, none)
                }
            };
            lw.emit_store_index(&field, table, key, value);
        } else if let Some(key_node) = field.child_by_field_name("key") {
            let key = lw.lower_expr(&key_node);
            let value = match field.child_by_field_name("value") {
                Some(v) => lw.lower_expr(&v),
                None => {
                    let none = lw.profile.none_literal;
                    lw.const_at(&field, none)
                }
            };
            lw.emit_store_index(&field, table, key, value);
        } else {
            let value_node = field
                .child_by_field_name("value")
                .or_else(|| lw.useful_children(&field).into_iter().next());
            let key = lw.const_at(&field, position.to_string());
            let value = match value_node {
                Some(v) => lw.lower_expr(&v),
                None => {
                    let none = lw.profile.none_literal;
                    lw.const_at(&field, none)
                }
            };
            lw.emit_store_index(&field, table, key, value);
            position += 1;
        }
    }
    table
}
