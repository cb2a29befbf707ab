//! TypeScript frontend: the JavaScript tables with the type-level surface
//! stripped or reified.
//!
//! Type annotations, casts, `!`, and `satisfies` are transparent; type
//! aliases and ambient declarations vanish; interfaces and enums reify as
//! tagged objects so downstream analyses can see their member names.

use crate::{
    engine::{Lowerer, Profile},
    ir::Reg,
    tracer::LowerTracer,
    tree::TreeNode,
};

use super::javascript;

pub(crate) fn lowerer<N: TreeNode, T: LowerTracer>(tracer: T) -> Lowerer<N, T> {
    let mut lw = Lowerer::with_tracer(profile(), tracer);
    javascript::install(&mut lw);
    install(&mut lw);
    lw
}

fn profile<N: TreeNode, T: LowerTracer>() -> Profile<N, T> {
    Profile {
        // TypeScript parameters wrap their binding in required/optional
        // parameter nodes; the engine's descendant search still finds the
        // identifier, so only the node-type sets differ from JavaScript.
        name_node_types: &["identifier", "type_identifier"],
        ..javascript::profile()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("type_alias_declaration", lower_nothing),
        ("ambient_declaration", lower_nothing),
        ("import_statement", lower_nothing),
        ("export_statement", lower_export),
        ("interface_declaration", lower_interface),
        ("enum_declaration", lower_enum),
        ("abstract_class_declaration", Lowerer::lower_class_def),
        ("public_field_definition", lower_public_field),
        ("internal_module", lower_namespace),
        ("module", lower_namespace),
    ]);
    lw.exprs(&[
        ("as_expression", lower_transparent),
        ("satisfies_expression", lower_transparent),
        ("non_null_expression", lower_transparent),
        ("type_assertion", lower_type_assertion),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// Export wrappers lower their inner declarations; bare specifier exports
/// carry nothing to lower. Skippable keyword children are filtered by set
/// membership, matching the JavaScript behavior.
fn lower_export<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    const SKIPPED: &[&str] = &["export_clause", "string", "namespace_export"];
    for child in lw.useful_children(node) {
        if SKIPPED.contains(&child.kind()) {
            continue;
        }
        lw.lower_stmt(&child);
    }
}

/// The first named child of a cast-like wrapper is the value expression.
fn lower_transparent<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match lw.useful_children(node).into_iter().next() {
        Some(inner) => lw.lower_expr(&inner),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

/// `<T>value` keeps only the value (the type child comes first).
fn lower_type_assertion<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match lw.useful_children(node).into_iter().next_back() {
        Some(inner) => lw.lower_expr(&inner),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

/// `interface Foo { a; b }` → `NEW_OBJECT "interface:Foo"` with members
/// stored under their declaration index.
fn lower_interface<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &format!("interface:{name}"));
    if let Some(body) = node.child_by_field_name("body") {
        for (i, member) in lw.useful_children(&body).into_iter().enumerate() {
            let member_name = member
                .child_by_field_name("name")
                .map_or_else(|| lw.text(&member), |n| lw.text(&n));
            let idx = lw.const_at(&member, i.to_string());
            let value = lw.const_at(&member, member_name);
            lw.emit_store_index(&member, obj, idx, value);
        }
    }
    lw.store_var_at(node, name, obj);
}

/// `enum Color { Red, Green }` → `NEW_OBJECT "enum:Color"` with variants
/// indexed 0..n-1.
fn lower_enum<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &format!("enum:{name}"));
    if let Some(body) = node.child_by_field_name("body") {
        for (i, member) in lw.useful_children(&body).into_iter().enumerate() {
            let member_name = match member.kind() {
                "enum_assignment" => member
                    .child_by_field_name("name")
                    .map_or_else(|| lw.text(&member), |n| lw.text(&n)),
                _ => lw.text(&member),
            };
            let idx = lw.const_at(&member, i.to_string());
            let value = lw.const_at(&member, member_name);
            lw.emit_store_index(&member, obj, idx, value);
        }
    }
    lw.store_var_at(node, name, obj);
}

fn lower_public_field<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node.child_by_field_name("name");
    let value = match node.child_by_field_name("value") {
        Some(v) => lw.lower_expr(&v),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    if let Some(name) = name {
        let text = lw.text(&name);
        lw.store_var_at(&name, text, value);
    }
}

/// `namespace X { ... }` is transparent: the body lowers in place.
fn lower_namespace<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_block(&body);
    }
}
