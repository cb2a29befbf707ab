//! Java frontend over the tree-sitter-java grammar.
//!
//! Method invocations carry their receiver in a field rather than a nested
//! callee, so the call lowering is adapter-local. Class bodies partition
//! methods ahead of fields and instance initializers; constructors lower
//! under the name `__init__`.

use crate::{
    engine::{CatchClause, Lowerer, Profile, SwitchArm},
    ir::{ArgRegs, Reg},
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
        attr_object_field: "object",
        attr_attribute_field: "field",
        attribute_node_type: "field_access",
        method_call_node_types: &["field_access"],
        name_node_types: &["identifier", "scoped_identifier"],
        subscript_node_types: &["array_access"],
        subscript_value_field: "array",
        subscript_index_field: "index",
        block_node_types: &["program", "block", "constructor_body", "switch_block"],
        elif_node_types: &[],
        else_node_types: &[],
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("program", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("local_variable_declaration", lower_variable_declaration),
        ("field_declaration", lower_variable_declaration),
        ("if_statement", Lowerer::lower_if),
        ("while_statement", Lowerer::lower_while),
        ("do_statement", lower_do),
        ("for_statement", lower_for),
        ("enhanced_for_statement", lower_enhanced_for),
        ("method_declaration", Lowerer::lower_function_def),
        ("constructor_declaration", lower_constructor),
        ("class_declaration", lower_class),
        ("interface_declaration", lower_class),
        ("enum_declaration", lower_class),
        ("return_statement", Lowerer::lower_return),
        ("break_statement", Lowerer::lower_break),
        ("continue_statement", Lowerer::lower_continue),
        ("throw_statement", Lowerer::lower_throw),
        ("try_statement", lower_try),
        ("try_with_resources_statement", lower_try),
        ("switch_expression", lower_switch),
        ("labeled_statement", lower_labeled),
        ("package_declaration", lower_nothing),
        ("import_declaration", lower_nothing),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("scoped_identifier", Lowerer::lower_identifier),
        ("this", Lowerer::lower_identifier),
        ("super", Lowerer::lower_identifier),
        ("decimal_integer_literal", Lowerer::lower_const_literal),
        ("hex_integer_literal", Lowerer::lower_const_literal),
        ("octal_integer_literal", Lowerer::lower_const_literal),
        ("binary_integer_literal", Lowerer::lower_const_literal),
        ("decimal_floating_point_literal", Lowerer::lower_const_literal),
        ("string_literal", Lowerer::lower_const_literal),
        ("character_literal", Lowerer::lower_const_literal),
        ("true", Lowerer::lower_true),
        ("false", Lowerer::lower_false),
        ("null_literal", Lowerer::lower_none),
        ("binary_expression", Lowerer::lower_binop),
        ("unary_expression", Lowerer::lower_unop),
        ("update_expression", lower_update),
        ("ternary_expression", Lowerer::lower_ternary),
        ("assignment_expression", Lowerer::lower_assignment_auto),
        ("method_invocation", lower_invocation),
        ("field_access", Lowerer::lower_attribute),
        ("array_access", Lowerer::lower_subscript),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("instanceof_expression", lower_instanceof),
        ("cast_expression", lower_cast),
        ("lambda_expression", lower_lambda),
        ("method_reference", lower_method_reference),
        ("object_creation_expression", lower_object_creation),
        ("array_creation_expression", lower_array_creation),
        ("array_initializer", Lowerer::lower_list),
        ("switch_expression", lower_switch_expression),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// Declarations store each initialized declarator; bare declarators bind
/// nothing.
fn lower_variable_declaration<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for declarator in lw.useful_children(node) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(value_node) = declarator.child_by_field_name("value") else {
            continue;
        };
        let value = lw.lower_expr(&value_node);
        if let Some(name) = declarator.child_by_field_name("name") {
            let text = lw.text(&name);
            lw.store_var_at(&name, text, value);
        }
    }
}

fn lower_do<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    lw.lower_post_test_loop(node, body.as_ref(), cond.as_ref(), true);
}

fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let init = node.child_by_field_name("init");
    let cond = node.child_by_field_name("condition");
    let update = node.child_by_field_name("update");
    let body = node.child_by_field_name("body");
    lw.lower_c_style_for(node, init.as_ref(), cond.as_ref(), update.as_ref(), body.as_ref());
}

/// `for (T x : iterable)` desugars to the indexed loop.
fn lower_enhanced_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node.child_by_field_name("name");
    let value = node.child_by_field_name("value");
    let body = node.child_by_field_name("body");
    let iter = match value {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_iterable"),
    };
    lw.lower_foreach_indexed(node, iter, name.as_ref(), body.as_ref());
}

/// Constructors lower as functions named `__init__` within the class body.
fn lower_constructor<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    let reference = lw.lower_function_parts(node, "__init__", params.as_ref(), body.as_ref());
    lw.store_var_at(node, "__init__", reference);
}

/// Class bodies lower methods first, then fields and initializers, so
/// method references exist before field initializers run.
fn lower_class<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let body = node.child_by_field_name("body");
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        let Some(body) = &body else { return };
        let members = lw.useful_children(body);
        let is_method =
            |kind: &str| matches!(kind, "method_declaration" | "constructor_declaration" | "class_declaration");
        for member in members.iter().filter(|m| is_method(m.kind())) {
            lw.lower_stmt(member);
        }
        for member in members.iter().filter(|m| !is_method(m.kind())) {
            lw.lower_stmt(member);
        }
    });
    lw.store_var_at(node, &name, reference);
}

fn lower_try<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let mut clauses = Vec::new();
    let mut finally_block = None;
    for child in lw.useful_children(node) {
        match child.kind() {
            "catch_clause" => {
                let mut type_name = None;
                let mut variable = None;
                if let Some(formal) = lw
                    .useful_children(&child)
                    .into_iter()
                    .find(|c| c.kind() == "catch_formal_parameter")
                {
                    let parts = lw.useful_children(&formal);
                    type_name = parts.first().map(|p| lw.text(p));
                    variable = parts
                        .iter()
                        .find(|p| p.kind() == "identifier")
                        .map(|p| lw.text(p));
                }
                clauses.push(CatchClause {
                    body: child.child_by_field_name("body"),
                    variable,
                    type_name,
                });
            }
            "finally_clause" => {
                finally_block = lw.useful_children(&child).into_iter().next_back();
            }
            _ => {}
        }
    }
    lw.lower_try_catch(node, body.as_ref(), &clauses, None, finally_block.as_ref());
}

/// Switch lowers to an `==` chain; the end label is pushed on the break
/// stack so `break` inside arms exits correctly.
fn lower_switch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject = match node.child_by_field_name("condition") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let arms = collect_arms(lw, &body);
    lw.lower_switch_chain(node, subject, &arms, "==", "||");
}

/// Expression-positioned switch: the arms store into a phi variable.
fn lower_switch_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let subject = match node.child_by_field_name("condition") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return lw.symbolic_at(node, "unknown_switch_body");
    };
    let arms = collect_arms(lw, &body);
    lw.lower_switch_phi_chain(node, subject, &arms, "==", "||", "__switch_result")
}

fn collect_arms<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, body: &N) -> Vec<SwitchArm<N>> {
    let mut arms = Vec::new();
    for group in lw.useful_children(body) {
        match group.kind() {
            "switch_block_statement_group" | "switch_rule" => {
                let mut values = Vec::new();
                let mut stmts = Vec::new();
                let mut is_default = false;
                for child in lw.useful_children(&group) {
                    if child.kind() == "switch_label" {
                        let label_values = lw.useful_children(&child);
                        if label_values.is_empty() {
                            is_default = true;
                        }
                        values.extend(label_values);
                    } else {
                        stmts.push(child);
                    }
                }
                arms.push(SwitchArm {
                    values,
                    body: stmts,
                    is_default,
                });
            }
            _ => {}
        }
    }
    arms
}

fn lower_labeled<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let mut children = lw.useful_children(node).into_iter();
    if let Some(label) = children.next() {
        let name = lw.text(&label);
        lw.emit_user_label(node, &name);
    }
    for stmt in children {
        lw.lower_stmt(&stmt);
    }
}

fn lower_update<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    // Java puts the operand in an unnamed position; fall back to the first
    // useful child.
    let operand = lw.useful_children(node).into_iter().next();
    let Some(operand) = operand else {
        return lw.symbolic_at(node, "unknown_update_target");
    };
    let op = if lw.text(node).contains("++") { "+" } else { "-" };
    let current = lw.lower_expr(&operand);
    let one = lw.const_at(node, "1");
    let updated = lw.emit_binop(node, op, current, one);
    lw.lower_store_target(&operand, updated);
    updated
}

/// `obj.m(args)` / `m(args)`: the receiver lives in a field, not a nested
/// callee node.
fn lower_invocation<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let object = node.child_by_field_name("object");
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let args = match node.child_by_field_name("arguments") {
        Some(args_node) => lw.lower_arg_children(&args_node),
        None => ArgRegs::new(),
    };
    match object {
        Some(object) => {
            let obj_reg = lw.lower_expr(&object);
            lw.emit_call_method(node, obj_reg, &name, args)
        }
        None => lw.emit_call_function(node, &name, args),
    }
}

fn lower_instanceof<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let left = node.child_by_field_name("left");
    let right = node.child_by_field_name("right");
    let mut args = ArgRegs::new();
    if let Some(left) = left {
        args.push(lw.lower_expr(&left));
    }
    if let Some(right) = right {
        let ty = lw.text(&right);
        args.push(lw.const_at(&right, ty));
    }
    lw.emit_call_function(node, "instanceof", args)
}

/// Casts are transparent.
fn lower_cast<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match node
        .child_by_field_name("value")
        .or_else(|| lw.useful_children(node).into_iter().next_back())
    {
        Some(value) => lw.lower_expr(&value),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

fn lower_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__lambda", params.as_ref(), body.as_ref())
}

/// `obj::method` reads the method as a field so the reference is visible
/// to dataflow.
fn lower_method_reference<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let Some(object) = parts.first() else {
        return lw.symbolic_at(node, "unknown_method_reference");
    };
    let obj_reg = lw.lower_expr(object);
    let method = parts
        .get(1)
        .map_or_else(|| "new".to_owned(), |m| lw.text(m));
    lw.emit_load_field(node, obj_reg, &method)
}

/// `new Foo(args)` allocates and calls the constructor.
fn lower_object_creation<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let tag = node
        .child_by_field_name("type")
        .map_or_else(|| "object".to_owned(), |t| lw.text(&t));
    let obj = lw.emit_new_object(node, &tag);
    let args = match node.child_by_field_name("arguments") {
        Some(args_node) => lw.lower_arg_children(&args_node),
        None => ArgRegs::new(),
    };
    let _ = lw.emit_call_method(node, obj, "constructor", args);
    obj
}

/// `new int[n]` / `new int[] {..}`.
fn lower_array_creation<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    if let Some(value) = node.child_by_field_name("value") {
        return lw.lower_list(&value);
    }
    let size = match node.child_by_field_name("dimensions") {
        Some(dims) => match lw.useful_children(&dims).into_iter().next() {
            Some(dim) => lw.lower_expr(&dim),
            None => lw.const_at(node, "0"),
        },
        None => lw.const_at(node, "0"),
    };
    lw.emit_new_array(node, "array", size)
}
