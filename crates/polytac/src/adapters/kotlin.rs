//! Kotlin frontend over the tree-sitter-kotlin grammar.
//!
//! The grammar splits binary operators into one node kind per precedence
//! level and rarely uses fields, so handlers lean on positional children.
//! `if`/`when`/`try` are expression-oriented and merge through phi
//! variables; jump expressions dispatch on their leading keyword text.

use crate::{
    engine::{CatchClause, Lowerer, Profile, SwitchArm},
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
        name_node_types: &["simple_identifier", "identifier"],
        attr_object_field: "expression",
        attr_attribute_field: "suffix",
        attribute_node_type: "navigation_expression",
        method_call_node_types: &[],
        subscript_node_types: &["indexing_expression"],
        block_node_types: &[
            "source_file",
            "statements",
            "block",
            "control_structure_body",
            "class_body",
            "enum_class_body",
        ],
        comment_types: &["line_comment", "multiline_comment", "comment"],
        elif_node_types: &[],
        else_node_types: &[],
        store_target: Some(store_target),
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("source_file", Lowerer::lower_block),
        ("statements", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("control_structure_body", Lowerer::lower_block),
        ("property_declaration", lower_property),
        ("while_statement", Lowerer::lower_while),
        ("do_while_statement", lower_do_while),
        ("for_statement", lower_for),
        ("function_declaration", lower_function),
        ("class_declaration", lower_class),
        ("object_declaration", lower_object),
        ("companion_object", lower_object),
        ("enum_entry", lower_enum_entry),
        ("import_header", lower_nothing),
        ("package_header", lower_nothing),
    ]);
    lw.exprs(&[
        ("simple_identifier", Lowerer::lower_identifier),
        ("integer_literal", Lowerer::lower_const_literal),
        ("long_literal", Lowerer::lower_const_literal),
        ("real_literal", Lowerer::lower_const_literal),
        ("hex_literal", Lowerer::lower_const_literal),
        ("character_literal", Lowerer::lower_const_literal),
        ("string_literal", Lowerer::lower_const_literal),
        ("boolean_literal", Lowerer::lower_canonical_bool),
        ("null", Lowerer::lower_none),
        ("null_literal", Lowerer::lower_none),
        ("this_expression", Lowerer::lower_identifier),
        ("additive_expression", Lowerer::lower_binop),
        ("multiplicative_expression", Lowerer::lower_binop),
        ("comparison_expression", Lowerer::lower_binop),
        ("equality_expression", Lowerer::lower_binop),
        ("conjunction", Lowerer::lower_binop),
        ("disjunction", Lowerer::lower_binop),
        ("range_expression", Lowerer::lower_binop),
        ("infix_expression", lower_infix),
        ("elvis_expression", lower_elvis),
        ("prefix_expression", Lowerer::lower_unop),
        ("postfix_expression", lower_postfix),
        ("as_expression", lower_as),
        ("check_expression", lower_check),
        ("assignment", Lowerer::lower_assignment_auto),
        ("call_expression", lower_call),
        ("navigation_expression", lower_navigation),
        ("indexing_expression", lower_indexing),
        ("control_structure_body", lower_body_expr),
        ("if_expression", lower_if_expression),
        ("when_expression", lower_when),
        ("try_expression", lower_try),
        ("jump_expression", lower_jump),
        ("lambda_literal", lower_lambda),
        ("anonymous_function", lower_anonymous_function),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("collection_literal", Lowerer::lower_list),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// Declaration targets (`for (x in ..)`, destructuring) store through
/// their bound identifiers rather than raw declaration text.
fn store_target<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, target: &N, value: Reg) {
    match target.kind() {
        "variable_declaration" => match lw.find_name_descendant(target) {
            Some(name) => {
                let text = lw.text(&name);
                lw.store_var_at(&name, text, value);
            }
            None => lw.default_store_target(target, value),
        },
        "multi_variable_declaration" => {
            let elements: Vec<N> = lw
                .useful_children(target)
                .into_iter()
                .filter(|c| c.kind() == "variable_declaration")
                .collect();
            lw.lower_pattern_elements(&elements, value);
        }
        _ => lw.default_store_target(target, value),
    }
}

/// `val`/`var`: the declaration child binds, the trailing expression
/// initializes.
fn lower_property<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let children = lw.useful_children(node);
    let declaration = children
        .iter()
        .find(|c| matches!(c.kind(), "variable_declaration" | "multi_variable_declaration"));
    let initializer = children
        .iter()
        .filter(|c| !matches!(c.kind(), "variable_declaration" | "multi_variable_declaration" | "modifiers" | "type_constraints" | "getter" | "setter"))
        .next_back();
    let Some(initializer) = initializer else {
        return;
    };
    let value = lw.lower_expr(initializer);
    if let Some(declaration) = declaration {
        lw.lower_store_target(declaration, value);
    }
}

fn lower_do_while<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node
        .child_by_field_name("body")
        .or_else(|| {
            lw.useful_children(node)
                .into_iter()
                .find(|c| c.kind() == "control_structure_body")
        });
    let cond = node
        .child_by_field_name("condition")
        .or_else(|| lw.useful_children(node).into_iter().next_back());
    lw.lower_post_test_loop(node, body.as_ref(), cond.as_ref(), true);
}

/// `for (x in iter)` desugars to the indexed loop.
fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let children = lw.useful_children(node);
    let target = children
        .iter()
        .find(|c| matches!(c.kind(), "variable_declaration" | "multi_variable_declaration"));
    let body = children.iter().find(|c| c.kind() == "control_structure_body");
    let iterable = children
        .iter()
        .find(|c| !matches!(c.kind(), "variable_declaration" | "multi_variable_declaration" | "control_structure_body" | "annotation"));
    let iter = match iterable {
        Some(n) => lw.lower_expr(n),
        None => lw.symbolic_at(node, "unknown_iterable"),
    };
    lw.lower_foreach_indexed(node, iter, target, body);
}

/// Functions: block bodies lower as blocks, `= expr` bodies return their
/// expression.
fn lower_function<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "simple_identifier")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let params = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "function_value_parameters");
    let body = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "function_body");
    let reference = lw.emit_function_scaffold(node, &name, |lw| {
        if let Some(params) = &params {
            lw.lower_parameters(params);
        }
        if let Some(body) = &body {
            lower_function_body(lw, body);
        }
    });
    lw.store_var_at(node, &name, reference);
}

fn lower_function_body<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, body: &N) {
    let children = lw.useful_children(body);
    match children.first() {
        Some(block) if block.kind() == "block" || block.kind() == "statements" => {
            lw.lower_block(block);
        }
        Some(expr) => {
            let value = lw.lower_expr(expr);
            lw.emit_return(expr, value);
        }
        None => {}
    }
}

fn lower_class<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "simple_identifier" || c.kind() == "type_identifier")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let body = lw
        .useful_children(node)
        .into_iter()
        .find(|c| matches!(c.kind(), "class_body" | "enum_class_body"));
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        if let Some(body) = &body {
            lw.lower_block(body);
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// `object` / `companion object` allocate a tagged singleton.
fn lower_object<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "simple_identifier")
        .map_or_else(|| "Companion".to_owned(), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &format!("object:{name}"));
    if let Some(body) = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "class_body")
    {
        lw.lower_block(&body);
    }
    lw.store_var_at(node, &name, obj);
}

/// Enum entries allocate `enum:`-tagged objects bound to the entry name.
fn lower_enum_entry<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "simple_identifier")
        .map_or_else(|| lw.text(node), |n| lw.text(&n));
    let obj = lw.emit_new_object(node, &format!("enum:{name}"));
    lw.store_var_at(node, &name, obj);
}

/// Infix functions (`a shl b`) pass their operator text through verbatim.
fn lower_infix<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    Lowerer::lower_binop(lw, node)
}

fn lower_elvis<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let lhs = match parts.first() {
        Some(n) => lw.lower_expr(n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    let rhs = match parts.get(1) {
        Some(n) => lw.lower_expr(n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_binop(node, "?:", lhs, rhs)
}

/// `x++`/`x--` update; `x!!` asserts non-null.
fn lower_postfix<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let text = lw.text(node);
    if text.ends_with("++") || text.ends_with("--") {
        return Lowerer::lower_update_expr(lw, node);
    }
    let operand = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_unop(node, "!!", operand)
}

/// `x as T` → `CALL_FUNCTION "as" x "T"`.
fn lower_as<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let mut args = ArgRegs::new();
    if let Some(value) = parts.first() {
        args.push(lw.lower_expr(value));
    }
    if let Some(ty) = parts.get(1) {
        let text = lw.text(ty);
        args.push(lw.const_at(ty, text));
    }
    lw.emit_call_function(node, "as", args)
}

/// `x is T` → `CALL_FUNCTION "is"`; `x in c` stays a binop.
fn lower_check<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let text = lw.text(node);
    if text.contains(" in ") || text.contains(" !in ") {
        return Lowerer::lower_binop(lw, node);
    }
    let parts = lw.useful_children(node);
    let mut args = ArgRegs::new();
    if let Some(value) = parts.first() {
        args.push(lw.lower_expr(value));
    }
    if let Some(ty) = parts.get(1) {
        let ty_text = lw.text(ty);
        args.push(lw.const_at(ty, ty_text));
    }
    lw.emit_call_function(node, "is", args)
}

/// Calls: `f(args)`, `obj.m(args)`, computed targets, and trailing
/// lambdas appended as the final argument.
fn lower_call<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let children = lw.useful_children(node);
    let Some(callee) = children.first() else {
        return lw.symbolic_at(node, "unknown_call_target");
    };
    let suffix = children.iter().find(|c| c.kind() == "call_suffix");
    let mut args = ArgRegs::new();
    let mut trailing: Option<N> = None;
    if let Some(suffix) = suffix {
        for part in lw.useful_children(suffix) {
            match part.kind() {
                "value_arguments" => {
                    for arg in lw.useful_children(&part) {
                        let inner = lw
                            .useful_children(&arg)
                            .into_iter()
                            .next()
                            .unwrap_or_else(|| arg.clone());
                        args.push(lw.lower_expr(&inner));
                    }
                }
                "annotated_lambda" | "lambda_literal" => trailing = Some(part),
                _ => {}
            }
        }
    }
    let result = match callee.kind() {
        "simple_identifier" => {
            let name = lw.text(callee);
            if let Some(trailing) = &trailing {
                args.push(lower_trailing_lambda(lw, trailing));
            }
            lw.emit_call_function(node, &name, args)
        }
        "navigation_expression" => {
            let parts = lw.useful_children(callee);
            let object = parts.first().cloned();
            let method = parts
                .get(1)
                .and_then(|s| lw.useful_children(s).into_iter().next())
                .map_or_else(|| "anonymous".to_owned(), |m| lw.text(&m));
            let obj = match object {
                Some(o) => lw.lower_expr(&o),
                None => lw.symbolic_at(callee, "unknown_call_target"),
            };
            if let Some(trailing) = &trailing {
                args.push(lower_trailing_lambda(lw, trailing));
            }
            lw.emit_call_method(node, obj, &method, args)
        }
        _ => {
            let target = lw.lower_expr(callee);
            if let Some(trailing) = &trailing {
                args.push(lower_trailing_lambda(lw, trailing));
            }
            let dest = lw.fresh_reg();
            lw.push_at(node, InstKind::CallUnknown { dest, target, args });
            dest
        }
    };
    result
}

fn lower_trailing_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let lambda = if node.kind() == "lambda_literal" {
        node.clone()
    } else {
        match lw
            .useful_children(node)
            .into_iter()
            .find(|c| c.kind() == "lambda_literal")
        {
            Some(l) => l,
            None => return lw.lower_expr(node),
        }
    };
    lower_lambda(lw, &lambda)
}

/// `a.b`: the member name hides inside the navigation suffix.
fn lower_navigation<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let Some(object) = parts.first() else {
        return lw.symbolic_at(node, "unknown_attribute");
    };
    let obj = lw.lower_expr(object);
    let field = parts
        .get(1)
        .and_then(|s| lw.useful_children(s).into_iter().next())
        .map_or_else(|| "anonymous".to_owned(), |f| lw.text(&f));
    lw.emit_load_field(node, obj, &field)
}

fn lower_indexing<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let Some(object) = parts.first() else {
        return lw.symbolic_at(node, "unknown_subscript");
    };
    let obj = lw.lower_expr(object);
    let index = parts
        .get(1)
        .and_then(|s| lw.useful_children(s).into_iter().next());
    let idx = match index {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_index"),
    };
    let dest = lw.fresh_reg();
    lw.push_at(
        node,
        InstKind::LoadIndex {
            dest,
            object: obj,
            index: idx,
        },
    );
    dest
}

/// Expression-if merges both arms through a phi variable; a missing else
/// arm contributes the canonical null.
fn lower_if_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let children = lw.useful_children(node);
    let cond_node = children
        .iter()
        .find(|c| !matches!(c.kind(), "control_structure_body"))
        .cloned();
    let mut bodies = children.iter().filter(|c| c.kind() == "control_structure_body");
    let then_node = bodies.next().cloned();
    let else_node = bodies.next().cloned();
    let cond = match cond_node {
        Some(n) => lw.lower_expr(&n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    lw.lower_phi_branch(
        node,
        "__if_result",
        cond,
        |lw| match &then_node {
            Some(n) => lower_body_value(lw, n),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(node, none)
            }
        },
        |lw| match &else_node {
            Some(n) => lower_body_value(lw, n),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(node, none)
            }
        },
    )
}

/// Expression-position control-structure bodies (when/if arms) yield
/// their last expression.
fn lower_body_expr<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lower_body_value(lw, node)
}

/// Lowers a control-structure body for its value: statements run in
/// order and the final expression is the result.
fn lower_body_value<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, body: &N) -> Reg {
    let mut stmts = lw.useful_children(body);
    if stmts.len() == 1 && lw.profile.block_node_types.contains(&stmts[0].kind()) {
        stmts = lw.useful_children(&stmts[0]);
    }
    let Some((last, init)) = stmts.split_last() else {
        let none = lw.profile.none_literal;
        return lw.const_at(body, none);
    };
    for stmt in init {
        lw.lower_stmt(stmt);
    }
    if lw.stmt_dispatch.contains_key(last.kind()) && !lw.expr_dispatch.contains_key(last.kind()) {
        lw.lower_stmt(last);
        let none = lw.profile.none_literal;
        return lw.const_at(body, none);
    }
    lw.lower_expr(last)
}

/// `when` with a subject compares each entry; without one, each entry's
/// condition stands alone. Results merge through a phi variable.
fn lower_when<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let subject = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "when_subject")
        .and_then(|s| lw.useful_children(&s).into_iter().next());
    let subject_reg = match subject {
        Some(n) => lw.lower_expr(&n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    let mut arms = Vec::new();
    for entry in lw.useful_children(node) {
        if entry.kind() != "when_entry" {
            continue;
        }
        let conditions: Vec<N> = lw
            .useful_children(&entry)
            .into_iter()
            .filter(|c| c.kind() == "when_condition")
            .filter_map(|c| lw.useful_children(&c).into_iter().next())
            .collect();
        let body: Vec<N> = lw
            .useful_children(&entry)
            .into_iter()
            .filter(|c| c.kind() == "control_structure_body")
            .collect();
        let is_default = conditions.is_empty();
        arms.push(SwitchArm {
            values: conditions,
            body,
            is_default,
        });
    }
    lw.lower_switch_phi_chain(node, subject_reg, &arms, "==", "||", "__when_result")
}

/// Expression-try: the body's value and each catch body's value merge
/// through a phi variable; finally runs on the way out.
fn lower_try<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let children = lw.useful_children(node);
    let body = children.iter().find(|c| c.kind() == "block").cloned();
    let catches: Vec<N> = children.iter().filter(|c| c.kind() == "catch_block").cloned().collect();
    let finally = children.iter().find(|c| c.kind() == "finally_block").cloned();

    let phi = lw.fresh_synthetic("__try_result");
    let body_label = lw.fresh_label("try_body");
    let finally_label = finally.as_ref().map(|_| lw.fresh_label("try_finally"));
    let end_label = lw.fresh_label("try_end");
    let converge = finally_label.clone().unwrap_or_else(|| end_label.clone());

    lw.label_at(node, &body_label);
    let body_value = match &body {
        Some(b) => lower_body_value(lw, b),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.store_var_at(node, &phi, body_value);
    lw.branch_at(node, &converge);

    for catch in &catches {
        let clause = catch_clause(lw, catch);
        let clause_label = lw.fresh_label("catch");
        lw.label_at(catch, &clause_label);
        let hint = match &clause.type_name {
            Some(ty) => format!("caught_exception:{ty}"),
            None => "caught_exception:any".to_owned(),
        };
        let caught = lw.symbolic_at(catch, &hint);
        if let Some(variable) = &clause.variable {
            lw.store_var_at(catch, variable, caught);
        }
        let value = match &clause.body {
            Some(b) => lower_body_value(lw, b),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(catch, none)
            }
        };
        lw.store_var_at(catch, &phi, value);
        lw.branch_at(catch, &converge);
    }

    if let (Some(finally_label), Some(finally)) = (finally_label, &finally) {
        lw.label_at(node, &finally_label);
        if let Some(block) = lw.useful_children(finally).into_iter().next() {
            lw.lower_block(&block);
        }
        lw.branch_at(node, &end_label);
    }
    lw.label_at(node, &end_label);
    lw.load_var_at(node, &phi)
}

fn catch_clause<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, catch: &N) -> CatchClause<N> {
    let children = lw.useful_children(catch);
    let body = children.iter().find(|c| c.kind() == "block").cloned();
    let variable = children
        .iter()
        .find(|c| c.kind() == "simple_identifier")
        .map(|v| lw.text(v));
    let type_name = children
        .iter()
        .find(|c| matches!(c.kind(), "user_type" | "type_reference"))
        .map(|t| lw.text(t));
    CatchClause {
        body,
        variable,
        type_name,
    }
}

/// `return`/`break`/`continue`/`throw` share one node kind; the leading
/// keyword text selects the lowering.
fn lower_jump<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let text = lw.text(node);
    if text.starts_with("return") {
        let value = match lw.useful_children(node).into_iter().next() {
            Some(n) => lw.lower_expr(&n),
            None => {
                let default = lw.profile.default_return_value;
                lw.const_at(node, default)
            }
        };
        lw.emit_return(node, value);
    } else if text.starts_with("throw") {
        Lowerer::lower_throw(lw, node);
    } else if text.starts_with("break") {
        Lowerer::lower_break(lw, node);
    } else if text.starts_with("continue") {
        Lowerer::lower_continue(lw, node);
    } else {
        return lw.symbolic_at(node, "unknown_jump");
    }
    let none = lw.profile.none_literal;
    lw.const_at(node, none)
}

fn lower_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "lambda_parameters");
    let body = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "statements");
    lw.lower_anonymous_function(node, "__lambda", params.as_ref(), body.as_ref())
}

fn lower_anonymous_function<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "function_value_parameters");
    let body = lw
        .useful_children(node)
        .into_iter()
        .find(|c| c.kind() == "function_body");
    let name = lw.fresh_synthetic("__anon");
    let body = body.clone();
    lw.emit_function_scaffold(node, &name, |lw| {
        if let Some(params) = &params {
            lw.lower_parameters(params);
        }
        if let Some(body) = &body {
            lower_function_body(lw, body);
        }
    })
}
