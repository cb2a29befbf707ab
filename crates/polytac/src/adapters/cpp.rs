//! C++ frontend: the C tables extended with the tree-sitter-cpp surface.
//!
//! Qualified names collapse to a single dotted load, namespaces and
//! templates are transparent, `new`/`delete` become named calls, lambdas
//! scaffold as anonymous functions, and constructor field initializers
//! store onto `this` between the parameters and the body.

use crate::{
    engine::{Lowerer, Profile},
    ir::{ArgRegs, Reg},
    tracer::LowerTracer,
    tree::TreeNode,
};

use super::c;

pub(crate) fn lowerer<N: TreeNode, T: LowerTracer>(tracer: T) -> Lowerer<N, T> {
    let mut lw = Lowerer::with_tracer(profile(), tracer);
    c::install(&mut lw);
    install(&mut lw);
    lw
}

fn profile<N: TreeNode, T: LowerTracer>() -> Profile<N, T> {
    let base: Profile<N, T> = c::profile();
    Profile {
        name_node_types: &["identifier", "qualified_identifier", "field_identifier", "destructor_name"],
        subscript_index_field: "indices",
        block_node_types: &["translation_unit", "compound_statement", "field_declaration_list"],
        ..base
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("function_definition", lower_function_definition),
        ("class_specifier", c::lower_record_specifier),
        ("namespace_definition", lower_namespace),
        ("template_declaration", lower_template),
        ("try_statement", lower_try),
        ("throw_statement", Lowerer::lower_throw),
        ("using_declaration", lower_nothing),
        ("alias_declaration", lower_nothing),
        ("static_assert_declaration", lower_nothing),
    ]);
    lw.exprs(&[
        ("qualified_identifier", Lowerer::lower_identifier),
        ("this", Lowerer::lower_identifier),
        ("nullptr", Lowerer::lower_none),
        ("condition_clause", lower_condition_clause),
        ("subscript_argument_list", lower_condition_clause),
        ("new_expression", lower_new),
        ("delete_expression", lower_delete),
        ("lambda_expression", lower_lambda),
        ("static_cast", c::lower_cast),
        ("dynamic_cast", c::lower_cast),
        ("const_cast", c::lower_cast),
        ("reinterpret_cast", c::lower_cast),
        ("raw_string_literal", Lowerer::lower_const_literal),
        ("user_defined_literal", Lowerer::lower_const_literal),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// `condition_clause` and `subscript_argument_list` wrap a single value.
fn lower_condition_clause<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match node
        .child_by_field_name("value")
        .or_else(|| lw.useful_children(node).into_iter().next())
    {
        Some(inner) => lw.lower_expr(&inner),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

/// Extends the C lowering with constructor field initializers: each
/// `member(expr)` stores onto `this` after the parameters, before the body.
fn lower_function_definition<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let initializers: Vec<N> = lw
        .useful_children(node)
        .into_iter()
        .filter(|c| c.kind() == "field_initializer_list")
        .flat_map(|list| lw.useful_children(&list))
        .filter(|c| c.kind() == "field_initializer")
        .collect();
    if initializers.is_empty() {
        c::lower_function_definition(lw, node);
        return;
    }

    let Some(func_decl) = c::find_function_declarator(node) else {
        c::lower_function_definition(lw, node);
        return;
    };
    let name = func_decl
        .child_by_field_name("declarator")
        .and_then(|d| c::declarator_name(lw, &d))
        .unwrap_or_else(|| "anonymous".to_owned());
    let params = func_decl.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    let reference = lw.emit_function_scaffold(node, &name, |lw| {
        if let Some(params) = &params {
            lw.lower_parameters(params);
        }
        for initializer in &initializers {
            let field = lw
                .useful_children(initializer)
                .into_iter()
                .next()
                .map_or_else(|| "field".to_owned(), |f| lw.text(&f));
            let value = match lw.useful_children(initializer).into_iter().nth(1) {
                Some(args) => match lw.useful_children(&args).into_iter().next() {
                    Some(arg) => lw.lower_expr(&arg),
                    None => {
                        let none = lw.profile.none_literal;
                        lw.const_at(initializer, none)
                    }
                },
                None => {
                    let none = lw.profile.none_literal;
                    lw.const_at(initializer, none)
                }
            };
            let this = lw.load_var_at(initializer, "this");
            lw.emit_store_field(initializer, this, &field, value);
        }
        if let Some(body) = &body {
            lw.lower_block(body);
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// Namespaces are transparent containers.
fn lower_namespace<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_block(&body);
    }
}

/// Templates are erased: the wrapped declaration lowers in place.
fn lower_template<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for child in lw.useful_children(node) {
        if child.kind() == "template_parameter_list" {
            continue;
        }
        lw.lower_stmt(&child);
    }
}

fn lower_try<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let clauses: Vec<_> = lw
        .useful_children(node)
        .into_iter()
        .filter(|c| c.kind() == "catch_clause")
        .map(|clause| c::catch_clause_from_parameters(lw, &clause))
        .collect();
    lw.lower_try_catch(node, body.as_ref(), &clauses, None, None);
}

/// `new T(args)` is a call to the type's name.
fn lower_new<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let type_name = node
        .child_by_field_name("type")
        .map_or_else(|| "object".to_owned(), |t| lw.text(&t));
    let args = match node.child_by_field_name("arguments") {
        Some(args_node) => lw.lower_arg_children(&args_node),
        None => ArgRegs::new(),
    };
    lw.emit_call_function(node, &type_name, args)
}

fn lower_delete<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let inner = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_call_function1(node, "delete", inner)
}

/// Lambdas scaffold under a synthetic `__lambda_N` name; captures are not
/// modeled, names resolve through lexical scope at execution time.
fn lower_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node
        .child_by_field_name("declarator")
        .and_then(|d| d.child_by_field_name("parameters"));
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__lambda", params.as_ref(), body.as_ref())
}
