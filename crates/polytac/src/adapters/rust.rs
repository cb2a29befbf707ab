//! Rust frontend over the tree-sitter-rust grammar.
//!
//! Expression orientation runs deep: blocks yield their last expression,
//! `if`/`match` merge through phi variables, and `return`/`break`/
//! `continue` are themselves expressions yielding unit. `?`, `.await`,
//! `as`, and macros degrade to named calls; ranges stay symbolic.
//! Implicit returns materialize `()`.

use crate::{
    canon,
    engine::{Lowerer, Profile, SwitchArm},
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
        attr_object_field: "value",
        attr_attribute_field: "field",
        attribute_node_type: "field_expression",
        method_call_node_types: &["field_expression"],
        name_node_types: &["identifier", "scoped_identifier", "field_identifier", "self"],
        subscript_node_types: &["index_expression"],
        subscript_value_field: "value",
        subscript_index_field: "index",
        block_node_types: &["source_file", "block", "declaration_list", "field_declaration_list"],
        comment_types: &["line_comment", "block_comment"],
        noise_types: &["attribute_item", "inner_attribute_item", "use_declaration", "extern_crate_declaration"],
        elif_node_types: &[],
        else_node_types: &["else_clause"],
        default_return_value: canon::UNIT_RETURN,
        store_target: Some(store_target),
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("source_file", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("declaration_list", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("let_declaration", lower_let),
        ("function_item", Lowerer::lower_function_def),
        ("struct_item", lower_struct_item),
        ("trait_item", lower_struct_item),
        ("union_item", lower_struct_item),
        ("enum_item", lower_enum_item),
        ("impl_item", lower_impl),
        ("mod_item", lower_mod),
        ("type_item", lower_nothing),
        ("const_item", lower_const_item),
        ("static_item", lower_const_item),
        ("macro_definition", lower_nothing),
        ("empty_statement", lower_nothing),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("scoped_identifier", Lowerer::lower_identifier),
        ("field_identifier", Lowerer::lower_identifier),
        ("self", Lowerer::lower_identifier),
        ("integer_literal", Lowerer::lower_const_literal),
        ("float_literal", Lowerer::lower_const_literal),
        ("string_literal", Lowerer::lower_const_literal),
        ("raw_string_literal", Lowerer::lower_const_literal),
        ("char_literal", Lowerer::lower_const_literal),
        ("boolean_literal", Lowerer::lower_canonical_bool),
        ("unit_expression", lower_unit),
        ("binary_expression", Lowerer::lower_binop),
        ("unary_expression", Lowerer::lower_unop),
        ("reference_expression", lower_reference),
        ("assignment_expression", Lowerer::lower_assignment),
        ("compound_assignment_expr", Lowerer::lower_aug_assignment),
        ("call_expression", Lowerer::lower_call),
        ("field_expression", Lowerer::lower_attribute),
        ("index_expression", Lowerer::lower_subscript),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("if_expression", lower_if_expression),
        ("match_expression", lower_match),
        ("while_expression", lower_while_expression),
        ("loop_expression", lower_loop),
        ("for_expression", lower_for_expression),
        ("block", lower_block_value),
        ("unsafe_block", lower_block_value),
        ("async_block", lower_block_value),
        ("return_expression", lower_return_expression),
        ("break_expression", lower_break_expression),
        ("continue_expression", lower_continue_expression),
        ("try_expression", lower_try_operator),
        ("await_expression", lower_await),
        ("type_cast_expression", lower_cast),
        ("macro_invocation", lower_macro),
        ("range_expression", lower_range),
        ("array_expression", Lowerer::lower_list),
        ("tuple_expression", Lowerer::lower_tuple),
        ("struct_expression", lower_struct_expression),
        ("closure_expression", lower_closure),
        ("let_condition", lower_let_condition),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// Patterns store through their bound names: `mut`/`ref` wrappers unwrap,
/// tuple patterns destructure by index.
fn store_target<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, target: &N, value: Reg) {
    match target.kind() {
        "tuple_pattern" | "slice_pattern" => {
            let elements = lw.useful_children(target);
            lw.lower_pattern_elements(&elements, value);
        }
        "tuple_struct_pattern" => {
            // The first child names the constructor; the rest bind.
            let elements: Vec<N> = lw.useful_children(target).into_iter().skip(1).collect();
            lw.lower_pattern_elements(&elements, value);
        }
        "mut_pattern" | "reference_pattern" | "ref_pattern" => {
            match lw.find_name_descendant(target) {
                Some(name) => {
                    let text = lw.text(&name);
                    lw.store_var_at(&name, text, value);
                }
                None => lw.default_store_target(target, value),
            }
        }
        _ => lw.default_store_target(target, value),
    }
}

/// `let pat = value;` stores through the pattern; the name may hide
/// under a `mut` wrapper.
fn lower_let<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let pattern = node.child_by_field_name("pattern");
    let Some(value_node) = node.child_by_field_name("value") else {
        return;
    };
    let value = lw.lower_expr(&value_node);
    if let Some(pattern) = pattern {
        lw.lower_store_target(&pattern, value);
    }
}

fn lower_const_item<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node.child_by_field_name("name");
    let Some(value_node) = node.child_by_field_name("value") else {
        return;
    };
    let value = lw.lower_expr(&value_node);
    if let Some(name) = name {
        let text = lw.text(&name);
        lw.store_var_at(&name, text, value);
    }
}

/// Structs, traits, and unions share the class shape.
fn lower_struct_item<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let body = node.child_by_field_name("body");
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        if let Some(body) = &body {
            for member in lw.useful_children(body) {
                if matches!(member.kind(), "field_declaration" | "enum_variant") {
                    continue;
                }
                lw.lower_stmt(&member);
            }
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// Enum variants store onto an `enum:`-tagged object.
fn lower_enum_item<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &format!("enum:{name}"));
    if let Some(body) = node.child_by_field_name("body") {
        let mut ordinal = 0usize;
        for variant in lw.useful_children(&body) {
            if variant.kind() != "enum_variant" {
                continue;
            }
            let variant_name = variant
                .child_by_field_name("name")
                .map_or_else(|| lw.text(&variant), |n| lw.text(&n));
            let value = match variant.child_by_field_name("value") {
                Some(v) => lw.lower_expr(&v),
                None => lw.const_at(&variant, ordinal.to_string()),
            };
            lw.emit_store_field(&variant, obj, &variant_name, value);
            ordinal += 1;
        }
    }
    lw.store_var_at(node, name, obj);
}

/// `impl` blocks are class-shaped containers named after their type.
fn lower_impl<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("type")
        .map_or_else(|| "anonymous".to_owned(), |t| lw.text(&t));
    let body = node.child_by_field_name("body");
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        if let Some(body) = &body {
            lw.lower_block(body);
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// Modules are transparent containers.
fn lower_mod<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_block(&body);
    }
}

fn lower_unit<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lw.const_at(node, canon::UNIT_RETURN)
}

/// `&x` / `&mut x`.
fn lower_reference<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let value = match node
        .child_by_field_name("value")
        .or_else(|| lw.useful_children(node).into_iter().next_back())
    {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_unop(node, "&", value)
}

/// Expression-if through a phi variable; a missing else arm contributes
/// unit.
fn lower_if_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let cond = node.child_by_field_name("condition");
    let consequence = node.child_by_field_name("consequence");
    let alternative = node
        .child_by_field_name("alternative")
        .and_then(|alt| lw.useful_children(&alt).into_iter().next());
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
            None => lw.const_at(node, canon::UNIT_RETURN),
        },
        |lw| match &alternative {
            Some(n) => lw.lower_expr(n),
            None => lw.const_at(node, canon::UNIT_RETURN),
        },
    )
}

/// `match` as an `==` chain over the arm patterns with a phi merge; `_`
/// and bare binding patterns are wildcards.
fn lower_match<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let subject = match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_match_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return lw.symbolic_at(node, "unknown_match_body");
    };
    let mut arms = Vec::new();
    for arm in lw.useful_children(&body) {
        if arm.kind() != "match_arm" {
            continue;
        }
        let pattern = arm
            .child_by_field_name("pattern")
            .and_then(|p| {
                if p.kind() == "match_pattern" {
                    lw.useful_children(&p).into_iter().next()
                } else {
                    Some(p)
                }
            });
        let value: Vec<N> = arm.child_by_field_name("value").into_iter().collect();
        let is_default = pattern
            .as_ref()
            .is_none_or(|p| lw.text(p) == "_" || p.kind() == "identifier");
        arms.push(SwitchArm {
            values: if is_default { Vec::new() } else { pattern.into_iter().collect() },
            body: value,
            is_default,
        });
    }
    lw.lower_switch_phi_chain(node, subject, &arms, "==", "||", "__match_result")
}

/// `while` yields unit; the loop itself is the engine shape.
fn lower_while_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    Lowerer::lower_while(lw, node);
    lw.const_at(node, canon::UNIT_RETURN)
}

/// `loop { ... }` is a while over a constant true.
fn lower_loop<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let body = node.child_by_field_name("body");
    let cond_label = lw.fresh_label("while_cond");
    let body_label = lw.fresh_label("while_body");
    let end_label = lw.fresh_label("while_end");
    lw.label_at(node, &cond_label);
    let t = lw.profile.true_literal;
    let cond = lw.const_at(node, t);
    lw.branch_if_at(node, cond, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.push_loop(&cond_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(&body);
    }
    lw.pop_loop();
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
    lw.const_at(node, canon::UNIT_RETURN)
}

fn lower_for_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let pattern = node.child_by_field_name("pattern");
    let value = node.child_by_field_name("value");
    let body = node.child_by_field_name("body");
    let iter = match value {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_iterable"),
    };
    lw.lower_foreach_indexed(node, iter, pattern.as_ref(), body.as_ref());
    lw.const_at(node, canon::UNIT_RETURN)
}

/// Blocks yield their last expression's value.
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

fn lower_break_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    Lowerer::lower_break(lw, node);
    lw.const_at(node, canon::UNIT_RETURN)
}

fn lower_continue_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    Lowerer::lower_continue(lw, node);
    lw.const_at(node, canon::UNIT_RETURN)
}

/// `expr?` → `CALL_FUNCTION "try_unwrap"`.
fn lower_try_operator<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let inner = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_call_function1(node, "try_unwrap", inner)
}

/// `expr.await` → `CALL_FUNCTION "await"`.
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

/// `expr as T` → `CALL_FUNCTION "as" expr "T"`.
fn lower_cast<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let mut args = ArgRegs::new();
    if let Some(value) = node.child_by_field_name("value") {
        args.push(lw.lower_expr(&value));
    }
    if let Some(ty) = node.child_by_field_name("type") {
        let text = lw.text(&ty);
        args.push(lw.const_at(&ty, text));
    }
    lw.emit_call_function(node, "as", args)
}

/// `name!(...)` → `CALL_FUNCTION "name!"`; token trees carry no lowerable
/// arguments.
fn lower_macro<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let name = node
        .child_by_field_name("macro")
        .map_or_else(|| "macro".to_owned(), |m| lw.text(&m));
    lw.emit_call_function(node, &format!("{name}!"), ArgRegs::new())
}

/// Ranges stay symbolic; downstream passes treat them as opaque.
fn lower_range<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lw.symbolic_at(node, "range")
}

/// `Foo { a: 1, b }` allocates the tagged object and stores each field;
/// shorthand fields read the same-named variable.
fn lower_struct_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let tag = node
        .child_by_field_name("name")
        .map_or_else(|| "struct".to_owned(), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &tag);
    if let Some(body) = node.child_by_field_name("body") {
        for field in lw.useful_children(&body) {
            match field.kind() {
                "field_initializer" => {
                    let field_name = field
                        .child_by_field_name("field")
                        .or_else(|| field.child_by_field_name("name"))
                        .map_or_else(|| "field".to_owned(), |f| lw.text(&f));
                    let value = match field.child_by_field_name("value") {
                        Some(v) => lw.lower_expr(&v),
                        None => {
                            let none = lw.profile.none_literal;
                            lw.const_at(&field, none)
                        }
                    };
                    lw.emit_store_field(&field, obj, &field_name, value);
                }
                "shorthand_field_initializer" => {
                    let name = lw.text(&field);
                    let value = lw.load_var_at(&field, name.clone());
                    lw.emit_store_field(&field, obj, &name, value);
                }
                "base_field_initializer" => {
                    let _ = lw.lower_expr(&field);
                }
                _ => {}
            }
        }
    }
    obj
}

fn lower_closure<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__closure", params.as_ref(), body.as_ref())
}

/// `if let pat = value`: the scrutinee binds and stands in for the
/// condition.
fn lower_let_condition<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
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
    value
}
