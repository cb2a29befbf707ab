//! C frontend over the tree-sitter-c grammar.
//!
//! Preprocessor nodes are noise. Pointer dereference reads and writes go
//! through the sentinel field `"*"` so dataflow sees them as field traffic;
//! `goto` labels carry the `user_` prefix to stay clear of engine labels.
//! Implicit returns materialize `0`.

use crate::{
    canon,
    engine::{CatchClause, Lowerer, Profile, SwitchArm},
    ir::Reg,
    tracer::LowerTracer,
    tree::TreeNode,
};

pub(crate) fn lowerer<N: TreeNode, T: LowerTracer>(tracer: T) -> Lowerer<N, T> {
    let mut lw = Lowerer::with_tracer(profile(), tracer);
    install(&mut lw);
    lw
}

pub(crate) fn profile<N: TreeNode, T: LowerTracer>() -> Profile<N, T> {
    Profile {
        attr_object_field: "argument",
        attr_attribute_field: "field",
        attribute_node_type: "field_expression",
        method_call_node_types: &["field_expression"],
        subscript_node_types: &["subscript_expression"],
        subscript_value_field: "argument",
        subscript_index_field: "index",
        block_node_types: &["translation_unit", "compound_statement"],
        elif_node_types: &[],
        else_node_types: &["else_clause"],
        noise_types: &[
            "preproc_include",
            "preproc_def",
            "preproc_function_def",
            "preproc_call",
            "preproc_if",
            "preproc_ifdef",
            "preproc_else",
            "preproc_elif",
            "preproc_endif",
            "preproc_directive",
            "type_definition",
        ],
        default_return_value: canon::ZERO_RETURN,
        store_target: Some(store_target),
        param_binding: Some(param_binding),
        ..Profile::default()
    }
}

/// Parameter names hide inside (possibly pointer-wrapped) declarators.
fn param_binding<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, param: &N) -> Option<String> {
    param
        .child_by_field_name("declarator")
        .and_then(|d| declarator_name(lw, &d))
        .or_else(|| lw.default_param_name(param))
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("translation_unit", Lowerer::lower_block),
        ("compound_statement", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("declaration", lower_declaration),
        ("if_statement", Lowerer::lower_if),
        ("while_statement", Lowerer::lower_while),
        ("do_statement", lower_do),
        ("for_statement", lower_for),
        ("function_definition", lower_function_definition),
        ("return_statement", Lowerer::lower_return),
        ("break_statement", Lowerer::lower_break),
        ("continue_statement", Lowerer::lower_continue),
        ("goto_statement", lower_goto),
        ("labeled_statement", lower_labeled),
        ("switch_statement", lower_switch),
        ("struct_specifier", lower_record_specifier),
        ("union_specifier", lower_record_specifier),
        ("enum_specifier", lower_enum_specifier),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("field_identifier", Lowerer::lower_identifier),
        ("number_literal", Lowerer::lower_const_literal),
        ("string_literal", Lowerer::lower_const_literal),
        ("char_literal", Lowerer::lower_const_literal),
        ("concatenated_string", Lowerer::lower_const_literal),
        ("true", Lowerer::lower_true),
        ("false", Lowerer::lower_false),
        ("null", Lowerer::lower_none),
        ("binary_expression", Lowerer::lower_binop),
        ("unary_expression", Lowerer::lower_unop),
        ("update_expression", Lowerer::lower_update_expr),
        ("pointer_expression", lower_pointer),
        ("conditional_expression", Lowerer::lower_ternary),
        ("call_expression", Lowerer::lower_call),
        ("field_expression", Lowerer::lower_attribute),
        ("subscript_expression", Lowerer::lower_subscript),
        ("assignment_expression", Lowerer::lower_assignment_auto),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("sizeof_expression", lower_sizeof),
        ("cast_expression", lower_cast),
        ("comma_expression", lower_comma),
        ("initializer_list", Lowerer::lower_list),
    ]);
}

/// Store-target override: `*p = v` writes the sentinel field `"*"` on the
/// pointer register; everything else uses the engine classification.
pub(crate) fn store_target<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, target: &N, value: Reg) {
    if target.kind() == "pointer_expression" {
        let pointer = match lw.field_or_nth(target, "argument", 0) {
            Some(arg) => lw.lower_expr(&arg),
            None => lw.symbolic_at(target, "unknown_store_target"),
        };
        lw.emit_store_field(target, pointer, "*", value);
        return;
    }
    lw.default_store_target(target, value);
}

/// Initialized declarators store their value under the declared name;
/// uninitialized ones bind nothing.
fn lower_declaration<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for child in lw.useful_children(node) {
        if child.kind() != "init_declarator" {
            continue;
        }
        let declarator = child.child_by_field_name("declarator");
        let Some(value_node) = child.child_by_field_name("value") else {
            continue;
        };
        let value = lw.lower_expr(&value_node);
        if let Some(declarator) = declarator {
            let name = declarator_name(lw, &declarator);
            match name {
                Some(name) => lw.store_var_at(&declarator, name, value),
                None => lw.lower_store_target(&declarator, value),
            }
        }
    }
}

/// Unwraps pointer/array/paren declarators down to the declared name.
pub(crate) fn declarator_name<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, declarator: &N) -> Option<String> {
    if lw.profile.name_node_types.contains(&declarator.kind()) {
        return Some(lw.text(declarator));
    }
    lw.find_name_descendant(declarator).map(|n| lw.text(&n))
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

/// Function definitions dig the name and parameter list out of the nested
/// declarator chain (`int *f(int a)` nests the function declarator inside
/// a pointer declarator).
pub(crate) fn lower_function_definition<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let Some(func_decl) = find_function_declarator(node) else {
        // Malformed definition: lower the body linearly so nothing is lost.
        if let Some(body) = node.child_by_field_name("body") {
            lw.lower_block(&body);
        }
        return;
    };
    let name = func_decl
        .child_by_field_name("declarator")
        .and_then(|d| declarator_name(lw, &d))
        .unwrap_or_else(|| "anonymous".to_owned());
    let params = func_decl.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    let reference = lw.lower_function_parts(node, &name, params.as_ref(), body.as_ref());
    lw.store_var_at(node, &name, reference);
}

pub(crate) fn find_function_declarator<N: TreeNode>(node: &N) -> Option<N> {
    if node.kind() == "function_declarator" {
        return Some(node.clone());
    }
    for child in node.named_children() {
        if child.kind() == "compound_statement" {
            continue;
        }
        if let Some(found) = find_function_declarator(&child) {
            return Some(found);
        }
    }
    None
}

fn lower_goto<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    match node.child_by_field_name("label") {
        Some(label) => {
            let name = lw.text(&label);
            lw.emit_user_goto(node, &name);
        }
        None => {
            lw.symbolic_at(node, "unknown_goto_target");
        }
    }
}

fn lower_labeled<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(label) = node.child_by_field_name("label") {
        let name = lw.text(&label);
        lw.emit_user_label(node, &name);
    }
    // The labeled statement itself is the last named child.
    if let Some(stmt) = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() != "statement_identifier")
    {
        lw.lower_stmt(&stmt);
    }
}

/// Switch lowers to an `==` chain. Fall-through is not modeled: every arm
/// branches to the end label, which is also the `break` target.
fn lower_switch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject = match node.child_by_field_name("condition") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut arms = Vec::new();
    for case in lw.useful_children(&body) {
        if case.kind() != "case_statement" {
            continue;
        }
        let value = case.child_by_field_name("value");
        let value_start = value.as_ref().map(TreeNode::start_byte);
        let stmts: Vec<N> = lw
            .useful_children(&case)
            .into_iter()
            .filter(|c| Some(c.start_byte()) != value_start)
            .collect();
        let is_default = value.is_none();
        arms.push(SwitchArm {
            values: value.into_iter().collect(),
            body: stmts,
            is_default,
        });
    }
    lw.lower_switch_chain(node, subject, &arms, "==", "||");
}

/// Structs and unions share the class shape: a labeled body bracketed by a
/// branch-over, referenced by a `<class:...>` constant.
pub(crate) fn lower_record_specifier<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let Some(name) = node.child_by_field_name("name").map(|n| lw.text(&n)) else {
        // Anonymous struct in a declaration: nothing to bind.
        return;
    };
    let body = node.child_by_field_name("body");
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        if let Some(body) = &body {
            for field in lw.useful_children(body) {
                if field.kind() == "field_declaration" {
                    continue;
                }
                lw.lower_stmt(&field);
            }
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// Enum members store onto a tagged enum object.
fn lower_enum_specifier<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &format!("enum:{name}"));
    if let Some(body) = node.child_by_field_name("body") {
        let mut ordinal = 0usize;
        for member in lw.useful_children(&body) {
            if member.kind() != "enumerator" {
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

/// `*p` reads the sentinel field; `&x` is a unary borrow.
fn lower_pointer<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let operator = node
        .child_by_field_name("operator")
        .map_or_else(|| "*".to_owned(), |op| lw.text(&op));
    let argument = match lw.field_or_nth(node, "argument", 0) {
        Some(arg) => lw.lower_expr(&arg),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    if operator == "&" {
        lw.emit_unop(node, "&", argument)
    } else {
        lw.emit_load_field(node, argument, "*")
    }
}

fn lower_sizeof<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let arg = match node.child_by_field_name("value") {
        Some(v) => lw.lower_expr(&v),
        None => {
            let ty = node
                .child_by_field_name("type")
                .map_or_else(|| "?".to_owned(), |t| lw.text(&t));
            lw.const_at(node, ty)
        }
    };
    lw.emit_call_function1(node, "sizeof", arg)
}

/// Casts are transparent.
pub(crate) fn lower_cast<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
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

fn lower_comma<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let mut last = None;
    for child in lw.useful_children(node) {
        last = Some(lw.lower_expr(&child));
    }
    match last {
        Some(reg) => reg,
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

// Re-exported for the C++ adapter, which shares the clause extraction.
pub(crate) fn catch_clause_from_parameters<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, clause: &N) -> CatchClause<N> {
    let body = clause.child_by_field_name("body");
    let mut type_name = None;
    let mut variable = None;
    if let Some(params) = clause.child_by_field_name("parameters") {
        if let Some(param) = lw.useful_children(&params).into_iter().next() {
            type_name = param.child_by_field_name("type").map(|t| lw.text(&t));
            variable = param
                .child_by_field_name("declarator")
                .and_then(|d| declarator_name(lw, &d));
        }
    }
    CatchClause {
        body,
        variable,
        type_name,
    }
}
