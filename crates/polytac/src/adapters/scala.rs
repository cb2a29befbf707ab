//! Scala frontend over the tree-sitter-scala grammar.
//!
//! Everything is an expression: blocks yield their last value, `if` and
//! `match` merge through phi variables, `throw` is expression-typed, and
//! for-comprehensions desugar through `iter`/`has_next`/`next` calls with
//! guards as conditional branches. Implicit returns materialize `()`.

use crate::{
    canon,
    engine::{CatchClause, Lowerer, Profile, SwitchArm},
    ir::{InstKind, Reg},
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
        attr_object_field: "value",
        attr_attribute_field: "field",
        attribute_node_type: "field_expression",
        method_call_node_types: &["field_expression"],
        name_node_types: &["identifier", "operator_identifier"],
        block_node_types: &["compilation_unit", "template_body"],
        elif_node_types: &[],
        else_node_types: &[],
        default_return_value: canon::UNIT_RETURN,
        store_target: Some(store_target),
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("compilation_unit", Lowerer::lower_block),
        ("template_body", Lowerer::lower_block),
        ("val_definition", lower_val_definition),
        ("var_definition", lower_val_definition),
        ("val_declaration", lower_nothing),
        ("var_declaration", lower_nothing),
        ("while_expression", Lowerer::lower_while),
        ("do_while_expression", lower_do_while),
        ("for_expression", lower_for),
        ("function_definition", lower_function),
        ("function_declaration", lower_nothing),
        ("class_definition", lower_class),
        ("object_definition", lower_class),
        ("trait_definition", lower_class),
        ("enum_definition", lower_class),
        ("import_declaration", lower_nothing),
        ("package_clause", lower_package),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("operator_identifier", Lowerer::lower_identifier),
        ("integer_literal", Lowerer::lower_const_literal),
        ("floating_point_literal", Lowerer::lower_const_literal),
        ("string", Lowerer::lower_const_literal),
        ("character_literal", Lowerer::lower_const_literal),
        ("symbol_literal", Lowerer::lower_const_literal),
        ("interpolated_string_expression", Lowerer::lower_const_literal),
        ("boolean_literal", Lowerer::lower_canonical_bool),
        ("null_literal", Lowerer::lower_none),
        ("unit", lower_unit),
        ("wildcard", Lowerer::lower_identifier),
        ("infix_expression", Lowerer::lower_binop),
        ("prefix_expression", Lowerer::lower_unop),
        ("assignment_expression", Lowerer::lower_assignment),
        ("assignment", Lowerer::lower_assignment),
        ("call_expression", Lowerer::lower_call),
        ("field_expression", Lowerer::lower_attribute),
        ("if_expression", lower_if_expression),
        ("match_expression", lower_match),
        ("try_expression", lower_try),
        ("return_expression", lower_return_expression),
        ("throw_expression", lower_throw_expression),
        ("lambda_expression", lower_lambda),
        ("block", lower_block_value),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("tuple_expression", Lowerer::lower_tuple),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// Tuple patterns destructure by index; plain patterns store their name.
fn store_target<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, target: &N, value: Reg) {
    match target.kind() {
        "tuple_pattern" => {
            let elements = lw.useful_children(target);
            lw.lower_pattern_elements(&elements, value);
        }
        "case_class_pattern" => {
            let elements: Vec<N> = lw.useful_children(target).into_iter().skip(1).collect();
            lw.lower_pattern_elements(&elements, value);
        }
        _ => lw.default_store_target(target, value),
    }
}

fn lower_val_definition<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let pattern = node.child_by_field_name("pattern");
    let value = match node.child_by_field_name("value") {
        Some(v) => lw.lower_expr(&v),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    if let Some(pattern) = pattern {
        lw.lower_store_target(&pattern, value);
    }
}

fn lower_do_while<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    lw.lower_post_test_loop(node, body.as_ref(), cond.as_ref(), true);
}

/// For-comprehensions walk a cursor: `iter`/`has_next`/`next` calls, with
/// guards branching back to the loop head when they fail.
fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let enumerators = node
        .child_by_field_name("enumerators")
        .map(|e| lw.useful_children(&e))
        .unwrap_or_default();
    let body = node.child_by_field_name("body");
    lower_enumerators(lw, node, &enumerators, body.as_ref());
}

fn lower_enumerators<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, enumerators: &[N], body: Option<&N>) {
    let Some((first, rest)) = enumerators.split_first() else {
        if let Some(body) = body {
            lw.lower_block(body);
        }
        return;
    };
    match first.kind() {
        "enumerator" | "generator" => {
            let pattern = lw.useful_children(first).into_iter().next();
            let source = lw
                .useful_children(first)
                .into_iter()
                .nth(1)
                .or_else(|| first.child_by_field_name("value"));
            let collection = match source {
                Some(n) => lw.lower_expr(&n),
                None => lw.symbolic_at(first, "unknown_iterable"),
            };
            let cursor = lw.emit_call_function1(first, "iter", collection);
            let cond_label = lw.fresh_label("for_cond");
            let body_label = lw.fresh_label("for_body");
            let end_label = lw.fresh_label("for_end");
            lw.label_at(node, &cond_label);
            let has_next = lw.emit_call_function1(node, "has_next", cursor);
            lw.branch_if_at(node, has_next, &body_label, &end_label);
            lw.label_at(node, &body_label);
            let element = lw.emit_call_function1(node, "next", cursor);
            if let Some(pattern) = &pattern {
                lw.lower_store_target(pattern, element);
            }
            lw.push_loop(&cond_label, &end_label);
            lower_enumerators(lw, node, rest, body);
            lw.pop_loop();
            lw.branch_at(node, &cond_label);
            lw.label_at(node, &end_label);
        }
        "guard" => {
            let cond = match lw.useful_children(first).into_iter().next() {
                Some(n) => lw.lower_expr(&n),
                None => {
                    let t = lw.profile.true_literal;
                    lw.const_at(first, t)
                }
            };
            let keep_label = lw.fresh_label("guard_keep");
            let skip_label = lw.fresh_label("guard_skip");
            lw.branch_if_at(first, cond, &keep_label, &skip_label);
            lw.label_at(first, &keep_label);
            lower_enumerators(lw, node, rest, body);
            lw.branch_at(first, &skip_label);
            lw.label_at(first, &skip_label);
        }
        _ => lower_enumerators(lw, node, rest, body),
    }
}

/// Functions: block bodies lower as blocks, expression bodies return
/// their value.
fn lower_function<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    let reference = lw.emit_function_scaffold(node, &name, |lw| {
        if let Some(params) = &params {
            lw.lower_parameters(params);
        }
        if let Some(body) = &body {
            if body.kind() == "block" {
                lw.lower_block(body);
            } else {
                let value = lw.lower_expr(body);
                lw.emit_return(body, value);
            }
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// Classes, objects, traits, enums, and case classes all share the class
/// shape.
fn lower_class<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let body = node.child_by_field_name("body");
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        if let Some(body) = &body {
            lw.lower_block(body);
        }
    });
    lw.store_var_at(node, &name, reference);
}

fn lower_package<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_block(&body);
    }
}

fn lower_unit<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lw.const_at(node, canon::UNIT_RETURN)
}

/// Expression-if merges through a phi variable.
fn lower_if_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let cond = node.child_by_field_name("condition");
    let consequence = node.child_by_field_name("consequence");
    let alternative = node.child_by_field_name("alternative");
    let cond_reg = match cond {
        Some(n) => lw.lower_expr(&n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    lw.lower_phi_branch(
        node,
        "__if_result",
        cond_reg,
        |lw| match &consequence {
            Some(n) => lw.lower_expr(n),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(node, none)
            }
        },
        |lw| match &alternative {
            Some(n) => lw.lower_expr(n),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(node, none)
            }
        },
    )
}

/// `match` as an `==` chain over the case patterns, merging through a phi
/// variable; `_` and binding patterns are wildcards.
fn lower_match<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let subject = match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_match_subject"),
    };
    let body = node
        .child_by_field_name("body")
        .or_else(|| {
            lw.useful_children(node)
                .into_iter()
                .find(|c| c.kind() == "case_block")
        });
    let Some(body) = body else {
        return lw.symbolic_at(node, "unknown_match_body");
    };
    let mut arms = Vec::new();
    for clause in lw.useful_children(&body) {
        if clause.kind() != "case_clause" {
            continue;
        }
        let pattern = clause.child_by_field_name("pattern");
        let arm_body: Vec<N> = clause.child_by_field_name("body").into_iter().collect();
        let is_default = pattern
            .as_ref()
            .is_none_or(|p| lw.text(p) == "_" || p.kind() == "identifier");
        arms.push(SwitchArm {
            values: if is_default { Vec::new() } else { pattern.into_iter().collect() },
            body: arm_body,
            is_default,
        });
    }
    lw.lower_switch_phi_chain(node, subject, &arms, "==", "||", "__match_result")
}

fn lower_try<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let body = node.child_by_field_name("body");
    let mut clauses = Vec::new();
    for child in lw.useful_children(node) {
        if child.kind() == "catch_clause" {
            clauses.push(CatchClause {
                body: lw.useful_children(&child).into_iter().next(),
                variable: None,
                type_name: None,
            });
        }
    }
    let finally_block = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "finally_clause")
        .and_then(|f| lw.useful_children(&f).into_iter().next());
    lw.lower_try_catch(node, body.as_ref(), &clauses, None, finally_block.as_ref());
    let none = lw.profile.none_literal;
    lw.const_at(node, none)
}

fn lower_return_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let value = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let default = lw.profile.default_return_value;
            lw.const_at(node, default)
        }
    };
    lw.emit_return(node, value);
    lw.const_at(node, canon::UNIT_RETURN)
}

/// `throw` is expression-typed; it yields unit to its surroundings.
fn lower_throw_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let value = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.push_at(node, InstKind::Throw { value });
    lw.const_at(node, canon::UNIT_RETURN)
}

fn lower_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__lambda", params.as_ref(), body.as_ref())
}

/// Expression blocks run their statements and yield the last
/// expression's register.
fn lower_block_value<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let stmts = lw.useful_children(node);
    let Some((last, init)) = stmts.split_last() else {
        return lw.const_at(node, canon::UNIT_RETURN);
    };
    for stmt in init {
        lw.lower_stmt(stmt);
    }
    if lw.stmt_dispatch.contains_key(last.kind()) && !lw.expr_dispatch.contains_key(last.kind()) {
        lw.lower_stmt(last);
        return lw.const_at(node, canon::UNIT_RETURN);
    }
    lw.lower_expr(last)
}
