//! PHP frontend over the tree-sitter-php grammar.
//!
//! Variables keep their `$` sigil in IR names. `foreach` desugars to the
//! indexed loop (keys through the `keys()` helper for `$k => $v` pairs),
//! array literals detect associative vs indexed shape, `match` compares
//! strictly, and enum cases store onto `self`.

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
        attr_attribute_field: "name",
        attribute_node_type: "member_access_expression",
        method_call_node_types: &[],
        name_node_types: &["name", "qualified_name"],
        subscript_node_types: &["subscript_expression"],
        subscript_value_field: "object",
        subscript_index_field: "index",
        block_node_types: &[
            "program",
            "compound_statement",
            "declaration_list",
            "colon_block",
        ],
        elif_node_types: &["else_if_clause"],
        else_node_types: &["else_clause"],
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("program", Lowerer::lower_block),
        ("compound_statement", Lowerer::lower_block),
        ("declaration_list", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("php_tag", lower_nothing),
        ("text_interpolation", lower_nothing),
        ("text", lower_nothing),
        ("if_statement", Lowerer::lower_if),
        ("while_statement", Lowerer::lower_while),
        ("do_statement", lower_do),
        ("for_statement", lower_for),
        ("foreach_statement", lower_foreach),
        ("function_definition", Lowerer::lower_function_def),
        ("method_declaration", Lowerer::lower_function_def),
        ("class_declaration", Lowerer::lower_class_def),
        ("interface_declaration", Lowerer::lower_class_def),
        ("trait_declaration", Lowerer::lower_class_def),
        ("enum_declaration", lower_enum),
        ("property_declaration", lower_property),
        ("return_statement", Lowerer::lower_return),
        ("break_statement", Lowerer::lower_break),
        ("continue_statement", Lowerer::lower_continue),
        ("try_statement", lower_try),
        ("switch_statement", lower_switch),
        ("echo_statement", lower_echo),
        ("namespace_definition", lower_namespace),
        ("namespace_use_declaration", lower_nothing),
        ("goto_statement", lower_goto),
        ("named_label_statement", lower_named_label),
    ]);
    lw.exprs(&[
        ("name", Lowerer::lower_identifier),
        ("variable_name", Lowerer::lower_identifier),
        ("qualified_name", Lowerer::lower_identifier),
        ("integer", Lowerer::lower_const_literal),
        ("float", Lowerer::lower_const_literal),
        ("string", Lowerer::lower_const_literal),
        ("encapsed_string", Lowerer::lower_const_literal),
        ("heredoc", Lowerer::lower_const_literal),
        ("boolean", Lowerer::lower_canonical_bool),
        ("null", Lowerer::lower_none),
        ("binary_expression", Lowerer::lower_binop),
        ("unary_op_expression", Lowerer::lower_unop),
        ("update_expression", Lowerer::lower_update_expr),
        ("conditional_expression", Lowerer::lower_ternary),
        ("assignment_expression", Lowerer::lower_assignment),
        ("augmented_assignment_expression", Lowerer::lower_aug_assignment),
        ("function_call_expression", Lowerer::lower_call),
        ("member_access_expression", Lowerer::lower_attribute),
        ("member_call_expression", lower_member_call),
        ("scoped_call_expression", lower_scoped_call),
        ("subscript_expression", Lowerer::lower_subscript),
        ("array_creation_expression", lower_array),
        ("object_creation_expression", lower_new),
        ("anonymous_function_creation_expression", lower_anonymous),
        ("arrow_function", lower_arrow),
        ("match_expression", lower_match),
        ("throw_expression", lower_throw_expression),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("argument", lower_argument),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

fn lower_do<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    lw.lower_post_test_loop(node, body.as_ref(), cond.as_ref(), true);
}

fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let init = node.child_by_field_name("initialize");
    let cond = node.child_by_field_name("condition");
    let update = node.child_by_field_name("update");
    let body = node.child_by_field_name("body");
    lw.lower_c_style_for(node, init.as_ref(), cond.as_ref(), update.as_ref(), body.as_ref());
}

/// `foreach ($arr as $v)` / `foreach ($arr as $k => $v)`: the pair form
/// walks `keys($arr)` and loads the value through the key.
fn lower_foreach<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let children = lw.useful_children(node);
    let iterable = children.first();
    let Some(iterable) = iterable else {
        return;
    };
    let iter = lw.lower_expr(iterable);
    let pair = children.iter().find(|c| c.kind() == "pair");
    if let Some(pair) = pair {
        let parts = lw.useful_children(pair);
        let key_target = parts.first().cloned();
        let val_target = parts.get(1).cloned();
        let keys = lw.emit_call_function1(node, "keys", iter);
        lw.lower_foreach_with(node, keys, key_target.as_ref(), |lw| {
            if let (Some(key_target), Some(val_target)) = (&key_target, &val_target) {
                let key = lw.lower_expr(key_target);
                let value = {
                    let dest = lw.fresh_reg();
                    lw.push_at(
                        node,
                        crate::ir::InstKind::LoadIndex {
                            dest,
                            object: iter,
                            index: key,
                        },
                    );
                    dest
                };
                lw.lower_store_target(val_target, value);
            }
            if let Some(body) = &body {
                lw.lower_block(body);
            }
        });
        return;
    }
    let target = children
        .iter()
        .skip(1)
        .find(|c| Some(c.start_byte()) != body.as_ref().map(TreeNode::start_byte));
    lw.lower_foreach_indexed(node, iter, target, body.as_ref());
}

/// Enum cases store onto `self`; methods lower as usual inside the class
/// scaffold.
fn lower_enum<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let body = node.child_by_field_name("body");
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        let Some(body) = &body else { return };
        for member in lw.useful_children(body) {
            if member.kind() == "enum_case" {
                let case_name = member
                    .child_by_field_name("name")
                    .map_or_else(|| lw.text(&member), |n| lw.text(&n));
                let value = match member.child_by_field_name("value") {
                    Some(v) => lw.lower_expr(&v),
                    None => lw.const_at(&member, case_name.clone()),
                };
                let receiver = lw.load_var_at(&member, "self");
                lw.emit_store_field(&member, receiver, &case_name, value);
            } else {
                lw.lower_stmt(&member);
            }
        }
    });
    lw.store_var_at(node, &name, reference);
}

fn lower_property<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for element in lw.useful_children(node) {
        if element.kind() != "property_element" {
            continue;
        }
        let parts = lw.useful_children(&element);
        let Some(name) = parts.first() else { continue };
        let value = match parts.get(1) {
            Some(v) => lw.lower_expr(v),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(&element, none)
            }
        };
        let text = lw.text(name);
        lw.store_var_at(name, text, value);
    }
}

fn lower_try<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let mut clauses = Vec::new();
    let mut finally_block = None;
    for child in lw.useful_children(node) {
        match child.kind() {
            "catch_clause" => {
                let type_name = child.child_by_field_name("type").map(|t| lw.text(&t));
                let variable = child.child_by_field_name("name").map(|v| lw.text(&v));
                clauses.push(CatchClause {
                    body: child.child_by_field_name("body"),
                    variable,
                    type_name,
                });
            }
            "finally_clause" => {
                finally_block = child.child_by_field_name("body");
            }
            _ => {}
        }
    }
    lw.lower_try_catch(node, body.as_ref(), &clauses, None, finally_block.as_ref());
}

fn lower_switch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject = match node.child_by_field_name("condition") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let arms = super::javascript::collect_switch_arms(lw, &body, "case_statement", "default_statement");
    lw.lower_switch_chain(node, subject, &arms, "==", "||");
}

fn lower_echo<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let args = lw.lower_arg_children(node);
    let _ = lw.emit_call_function(node, "echo", args);
}

/// Namespaces are transparent.
fn lower_namespace<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_block(&body);
    }
}

fn lower_goto<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    match lw.useful_children(node).into_iter().next() {
        Some(label) => {
            let name = lw.text(&label);
            lw.emit_user_goto(node, &name);
        }
        None => {
            lw.symbolic_at(node, "unknown_goto_target");
        }
    }
}

fn lower_named_label<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(label) = lw.useful_children(node).into_iter().next() {
        let name = lw.text(&label);
        lw.emit_user_label(node, &name);
    }
}

/// `$obj->m(args)`.
fn lower_member_call<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let object = node.child_by_field_name("object");
    let method = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |m| lw.text(&m));
    let obj = match object {
        Some(o) => lw.lower_expr(&o),
        None => lw.symbolic_at(node, "unknown_call_target"),
    };
    let args = match node.child_by_field_name("arguments") {
        Some(args_node) => lw.lower_arg_children(&args_node),
        None => ArgRegs::new(),
    };
    lw.emit_call_method(node, obj, &method, args)
}

/// `Foo::bar(args)`: the scope is loaded as a variable.
fn lower_scoped_call<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let scope = node.child_by_field_name("scope");
    let method = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |m| lw.text(&m));
    let obj = match scope {
        Some(s) => {
            let text = lw.text(&s);
            lw.load_var_at(&s, text)
        }
        None => lw.symbolic_at(node, "unknown_call_target"),
    };
    let args = match node.child_by_field_name("arguments") {
        Some(args_node) => lw.lower_arg_children(&args_node),
        None => ArgRegs::new(),
    };
    lw.emit_call_method(node, obj, &method, args)
}

/// Array literals: any `=>` entry makes the array associative (a dict
/// object); otherwise it lowers as an indexed list.
fn lower_array<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let elements = lw.useful_children(node);
    let associative = elements.iter().any(|e| {
        lw.useful_children(e).len() > 1 || e.child_by_field_name("key").is_some()
    });
    if associative {
        let obj = lw.emit_new_object(node, "dict");
        for element in &elements {
            let parts = lw.useful_children(element);
            match (parts.first(), parts.get(1)) {
                (Some(key), Some(value_node)) => {
                    let key_reg = lw.lower_expr(key);
                    let value = lw.lower_expr(value_node);
                    lw.emit_store_index(element, obj, key_reg, value);
                }
                (Some(value_node), None) => {
                    let _ = lw.lower_expr(value_node);
                }
                _ => {}
            }
        }
        return obj;
    }
    let values: Vec<N> = elements
        .iter()
        .filter_map(|e| lw.useful_children(e).into_iter().next().or_else(|| Some(e.clone())))
        .collect();
    lw.lower_sequence_elems(node, "list", &values)
}

fn lower_new<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let children = lw.useful_children(node);
    let tag = children
        .first()
        .map_or_else(|| "object".to_owned(), |c| lw.text(c));
    let obj = lw.emit_new_object(node, &tag);
    let args = children
        .iter()
        .find(|c| c.kind() == "arguments")
        .map_or_else(ArgRegs::new, |args_node| lw.lower_arg_children(args_node));
    let _ = lw.emit_call_method(node, obj, "constructor", args);
    obj
}

fn lower_anonymous<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__closure", params.as_ref(), body.as_ref())
}

fn lower_arrow<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__arrow", params.as_ref(), body.as_ref())
}

/// `match` compares strictly and merges through a phi variable.
fn lower_match<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let subject = match node.child_by_field_name("condition") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_match_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return lw.symbolic_at(node, "unknown_match_body");
    };
    let mut arms = Vec::new();
    for arm in lw.useful_children(&body) {
        match arm.kind() {
            "match_conditional_expression" => {
                let values = arm
                    .child_by_field_name("conditional_expressions")
                    .map(|c| lw.useful_children(&c))
                    .unwrap_or_default();
                let body = arm.child_by_field_name("return_expression").into_iter().collect();
                arms.push(SwitchArm {
                    values,
                    body,
                    is_default: false,
                });
            }
            "match_default_expression" => {
                arms.push(SwitchArm {
                    values: Vec::new(),
                    body: arm.child_by_field_name("return_expression").into_iter().collect(),
                    is_default: true,
                });
            }
            _ => {}
        }
    }
    lw.lower_switch_phi_chain(node, subject, &arms, "===", "||", "__match_result")
}

/// PHP 8 `throw` is an expression.
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

/// Argument wrappers are transparent.
fn lower_argument<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match lw.useful_children(node).into_iter().next() {
        Some(inner) => lw.lower_expr(&inner),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}
