//! C# frontend over the tree-sitter-c-sharp grammar.
//!
//! Class bodies defer fields behind methods, properties store onto `this`,
//! constructors lower as `__init__`, pattern/type operators degrade to
//! named calls, and `?.` reads structurally as a plain field access.

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
        attr_object_field: "expression",
        attr_attribute_field: "name",
        attribute_node_type: "member_access_expression",
        method_call_node_types: &["member_access_expression"],
        name_node_types: &["identifier", "qualified_name"],
        subscript_node_types: &["element_access_expression"],
        subscript_value_field: "expression",
        subscript_index_field: "subscript",
        block_node_types: &["compilation_unit", "block", "declaration_list", "switch_body", "global_statement"],
        elif_node_types: &[],
        else_node_types: &[],
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("compilation_unit", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("global_statement", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("using_directive", lower_nothing),
        ("namespace_declaration", lower_namespace),
        ("file_scoped_namespace_declaration", lower_namespace),
        ("local_declaration_statement", lower_local_declaration),
        ("field_declaration", lower_local_declaration),
        ("event_field_declaration", lower_event),
        ("property_declaration", lower_property),
        ("if_statement", Lowerer::lower_if),
        ("while_statement", Lowerer::lower_while),
        ("do_statement", lower_do),
        ("for_statement", lower_for),
        ("foreach_statement", lower_foreach),
        ("method_declaration", lower_method),
        ("local_function_statement", lower_method),
        ("constructor_declaration", lower_constructor),
        ("class_declaration", lower_class),
        ("struct_declaration", lower_class),
        ("record_declaration", lower_class),
        ("interface_declaration", lower_class),
        ("enum_declaration", lower_enum),
        ("return_statement", Lowerer::lower_return),
        ("break_statement", Lowerer::lower_break),
        ("continue_statement", Lowerer::lower_continue),
        ("throw_statement", Lowerer::lower_throw),
        ("yield_statement", lower_yield_statement),
        ("try_statement", lower_try),
        ("switch_statement", lower_switch),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("qualified_name", Lowerer::lower_identifier),
        ("this_expression", Lowerer::lower_identifier),
        ("base_expression", Lowerer::lower_identifier),
        ("integer_literal", Lowerer::lower_const_literal),
        ("real_literal", Lowerer::lower_const_literal),
        ("string_literal", Lowerer::lower_const_literal),
        ("verbatim_string_literal", Lowerer::lower_const_literal),
        ("raw_string_literal", Lowerer::lower_const_literal),
        ("character_literal", Lowerer::lower_const_literal),
        ("boolean_literal", Lowerer::lower_canonical_bool),
        ("null_literal", Lowerer::lower_none),
        ("binary_expression", Lowerer::lower_binop),
        ("prefix_unary_expression", Lowerer::lower_unop),
        ("postfix_unary_expression", lower_postfix),
        ("conditional_expression", Lowerer::lower_ternary),
        ("assignment_expression", Lowerer::lower_assignment_auto),
        ("invocation_expression", Lowerer::lower_call),
        ("member_access_expression", Lowerer::lower_attribute),
        ("element_access_expression", Lowerer::lower_subscript),
        ("bracketed_argument_list", lower_transparent),
        ("argument", lower_transparent),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("object_creation_expression", lower_new),
        ("implicit_object_creation_expression", lower_new),
        ("lambda_expression", lower_lambda),
        ("anonymous_method_expression", lower_lambda),
        ("await_expression", lower_await),
        ("is_expression", lower_is),
        ("is_pattern_expression", lower_is),
        ("as_expression", lower_as),
        ("typeof_expression", lower_typeof),
        ("cast_expression", lower_cast),
        ("conditional_access_expression", lower_conditional_access),
        ("interpolated_string_expression", lower_interpolated_string),
        ("interpolation", lower_transparent),
        ("switch_expression", lower_switch_expression),
        ("throw_expression", lower_throw_expression),
        ("collection_expression", Lowerer::lower_list),
        ("array_creation_expression", lower_array_creation),
        ("initializer_expression", Lowerer::lower_list),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

fn lower_namespace<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_block(&body);
    } else {
        for child in lw.useful_children(node) {
            if child.kind() == "qualified_name" || child.kind() == "identifier" {
                continue;
            }
            lw.lower_stmt(&child);
        }
    }
}

fn lower_local_declaration<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for declaration in lw.useful_children(node) {
        if declaration.kind() != "variable_declaration" {
            continue;
        }
        for declarator in lw.useful_children(&declaration) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let name = declarator.child_by_field_name("name");
            let value_node = lw
                .useful_children(&declarator)
                .into_iter()
                .nth(1)
                .or_else(|| declarator.child_by_field_name("value"));
            let Some(value_node) = value_node else { continue };
            let value = lw.lower_expr(&value_node);
            if let Some(name) = name {
                let text = lw.text(&name);
                lw.store_var_at(&name, text, value);
            }
        }
    }
}

/// Events reify as `CONST "event:Name"` bindings.
fn lower_event<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for declaration in lw.useful_children(node) {
        if declaration.kind() != "variable_declaration" {
            continue;
        }
        for declarator in lw.useful_children(&declaration) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let text = lw.text(&name);
            let value = lw.const_at(&name, format!("event:{text}"));
            lw.store_var_at(&name, text, value);
        }
    }
}

/// Properties store their initial value (or the canonical null) onto
/// `this`.
fn lower_property<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "property".to_owned(), |n| lw.text(&n));
    let value = match node.child_by_field_name("value") {
        Some(v) => lw.lower_expr(&v),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    let this = lw.load_var_at(node, "this");
    lw.emit_store_field(node, this, &name, value);
}

fn lower_do<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    lw.lower_post_test_loop(node, body.as_ref(), cond.as_ref(), true);
}

fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let init = node.child_by_field_name("initializer");
    let cond = node.child_by_field_name("condition");
    let update = node.child_by_field_name("update");
    let body = node.child_by_field_name("body");
    lw.lower_c_style_for(node, init.as_ref(), cond.as_ref(), update.as_ref(), body.as_ref());
}

fn lower_foreach<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let left = node.child_by_field_name("left");
    let right = node.child_by_field_name("right");
    let body = node.child_by_field_name("body");
    let iter = match right {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_iterable"),
    };
    lw.lower_foreach_indexed(node, iter, left.as_ref(), body.as_ref());
}

/// Methods: block bodies or `=>` expression bodies.
fn lower_method<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    lower_named_callable(lw, node, &name);
}

fn lower_constructor<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    lower_named_callable(lw, node, "__init__");
}

fn lower_named_callable<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, name: &str) {
    let params = node.child_by_field_name("parameters");
    let body = node
        .child_by_field_name("body")
        .or_else(|| {
            lw.useful_children(node)
                .into_iter()
                .find(|c| c.kind() == "arrow_expression_clause")
        });
    let reference = lw.emit_function_scaffold(node, name, |lw| {
        if let Some(params) = &params {
            lw.lower_parameters(params);
        }
        match &body {
            Some(body) if body.kind() == "arrow_expression_clause" => {
                let value = match lw.useful_children(body).into_iter().next() {
                    Some(expr) => lw.lower_expr(&expr),
                    None => {
                        let none = lw.profile.none_literal;
                        lw.const_at(body, none)
                    }
                };
                lw.emit_return(body, value);
            }
            Some(body) => lw.lower_block(body),
            None => {}
        }
    });
    lw.store_var_at(node, name, reference);
}

/// Class-shaped declarations hoist methods ahead of fields and
/// properties.
fn lower_class<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let body = node.child_by_field_name("body");
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        let Some(body) = &body else { return };
        let members = lw.useful_children(body);
        let is_method = |kind: &str| {
            matches!(
                kind,
                "method_declaration" | "constructor_declaration" | "local_function_statement" | "class_declaration"
            )
        };
        for member in members.iter().filter(|m| is_method(m.kind())) {
            lw.lower_stmt(member);
        }
        for member in members.iter().filter(|m| !is_method(m.kind())) {
            lw.lower_stmt(member);
        }
    });
    lw.store_var_at(node, &name, reference);
}

fn lower_enum<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &format!("enum:{name}"));
    if let Some(body) = node.child_by_field_name("body") {
        let mut ordinal = 0usize;
        for member in lw.useful_children(&body) {
            if member.kind() != "enum_member_declaration" {
                continue;
            }
            let member_name = member
                .child_by_field_name("name")
                .map_or_else(|| lw.text(&member), |n| lw.text(&n));
            let value = match member.child_by_field_name("value") {
                Some(v) => lw.lower_expr(&v),
                None => lw.const_at(&member, ordinal.to_string()),
            };
            lw.emit_store_field(&member, obj, &member_name, value);
            ordinal += 1;
        }
    }
    lw.store_var_at(node, name, obj);
}

fn lower_yield_statement<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let args = lw.lower_arg_children(node);
    let _ = lw.emit_call_function(node, "yield", args);
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
                if let Some(declaration) = lw
                    .useful_children(&child)
                    .into_iter()
                    .find(|c| c.kind() == "catch_declaration")
                {
                    type_name = declaration.child_by_field_name("type").map(|t| lw.text(&t));
                    variable = declaration.child_by_field_name("name").map(|n| lw.text(&n));
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

fn lower_switch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject = match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut arms = Vec::new();
    for section in lw.useful_children(&body) {
        if section.kind() != "switch_section" {
            continue;
        }
        let mut values = Vec::new();
        let mut stmts = Vec::new();
        let mut is_default = false;
        for child in lw.useful_children(&section) {
            match child.kind() {
                "case_switch_label" | "case_pattern_switch_label" => {
                    values.extend(lw.useful_children(&child));
                }
                "default_switch_label" => is_default = true,
                _ => stmts.push(child),
            }
        }
        arms.push(SwitchArm {
            values,
            body: stmts,
            is_default,
        });
    }
    lw.lower_switch_chain(node, subject, &arms, "==", "||");
}

/// `x switch { p => v, _ => d }` merges through a phi variable.
fn lower_switch_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let children = lw.useful_children(node);
    let subject = match children.first() {
        Some(n) => lw.lower_expr(n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let mut arms = Vec::new();
    for arm in &children {
        if arm.kind() != "switch_expression_arm" {
            continue;
        }
        let parts = lw.useful_children(arm);
        let pattern = parts.first().cloned();
        let result: Vec<N> = parts.into_iter().skip(1).collect();
        let is_default = pattern.as_ref().is_some_and(|p| lw.text(p) == "_");
        arms.push(SwitchArm {
            values: if is_default { Vec::new() } else { pattern.into_iter().collect() },
            body: result,
            is_default,
        });
    }
    lw.lower_switch_phi_chain(node, subject, &arms, "==", "||", "__switch_result")
}

fn lower_postfix<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let text = lw.text(node);
    if text.ends_with("++") || text.ends_with("--") {
        return Lowerer::lower_update_expr(lw, node);
    }
    Lowerer::lower_unop(lw, node)
}

fn lower_transparent<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match lw.useful_children(node).into_iter().next() {
        Some(inner) => lw.lower_expr(&inner),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

fn lower_new<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
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

fn lower_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node
        .child_by_field_name("parameters")
        .or_else(|| {
            lw.useful_children(node)
                .into_iter()
                .find(|c| matches!(c.kind(), "parameter_list" | "identifier"))
        });
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__lambda", params.as_ref(), body.as_ref())
}

fn lower_await<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let inner = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_call_function1(node, "await", inner)
}

fn lower_is<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lower_type_operator(lw, node, "is")
}

fn lower_as<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lower_type_operator(lw, node, "as")
}

fn lower_type_operator<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, op: &str) -> Reg {
    let parts = lw.useful_children(node);
    let mut args = ArgRegs::new();
    if let Some(value) = parts.first() {
        args.push(lw.lower_expr(value));
    }
    if let Some(ty) = parts.get(1) {
        let text = lw.text(ty);
        args.push(lw.const_at(ty, text));
    }
    lw.emit_call_function(node, op, args)
}

fn lower_typeof<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let ty = node
        .child_by_field_name("type")
        .or_else(|| lw.useful_children(node).into_iter().next());
    let arg = match ty {
        Some(t) => {
            let text = lw.text(&t);
            lw.const_at(&t, text)
        }
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_call_function1(node, "typeof", arg)
}

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

/// `a?.b` lowers structurally as a plain field read.
fn lower_conditional_access<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let Some(object) = parts.first() else {
        return lw.symbolic_at(node, "unknown_attribute");
    };
    let obj = lw.lower_expr(object);
    let field = parts
        .get(1)
        .map(|binding| {
            lw.useful_children(binding)
                .into_iter()
                .next()
                .map_or_else(|| lw.text(binding), |n| lw.text(&n))
        })
        .unwrap_or_else(|| "value".to_owned());
    lw.emit_load_field(node, obj, &field)
}

/// Interpolated strings fold into a `+` chain.
fn lower_interpolated_string<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    if parts.is_empty() {
        let text = lw.text(node);
        return lw.const_at(node, text);
    }
    let mut acc: Option<Reg> = None;
    for part in &parts {
        let piece = if part.kind() == "interpolation" {
            lower_transparent(lw, part)
        } else {
            let text = lw.text(part);
            lw.const_at(part, text)
        };
        acc = Some(match acc {
            Some(prev) => lw.emit_binop(part, "+", prev, piece),
            None => piece,
        });
    }
    acc.unwrap_or_else(|| {
        let text = lw.text(node);
        lw.const_at(node, text)
    })
}

fn lower_throw_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let value = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.push_at(node, crate::ir::InstKind::Throw { value });
    let none = lw.profile.none_literal;
    lw.const_at(node, none)
}

fn lower_array_creation<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    if let Some(initializer) = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "initializer_expression")
    {
        return lw.lower_list(&initializer);
    }
    let size = lw.const_at(node, "0");
    lw.emit_new_array(node, "array", size)
}
