//! Go frontend over the tree-sitter-go grammar.
//!
//! `func main` is hoisted: its body lowers at top level so locals land in
//! frame zero. Multi-value returns emit one `RETURN` per value, the
//! three `for` shapes dispatch on the clause child, and `go`/`defer`/
//! channel operations degrade to named calls.

use crate::{
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
        attr_object_field: "operand",
        attr_attribute_field: "field",
        attribute_node_type: "selector_expression",
        method_call_node_types: &["selector_expression"],
        subscript_node_types: &["index_expression"],
        subscript_value_field: "operand",
        subscript_index_field: "index",
        block_node_types: &["source_file", "block"],
        elif_node_types: &[],
        else_node_types: &[],
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("source_file", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("package_clause", lower_nothing),
        ("import_declaration", lower_nothing),
        ("type_declaration", lower_nothing),
        ("var_declaration", lower_var_declaration),
        ("const_declaration", lower_var_declaration),
        ("short_var_declaration", lower_multi_assign),
        ("assignment_statement", lower_multi_assign),
        ("inc_statement", lower_inc_dec),
        ("dec_statement", lower_inc_dec),
        ("if_statement", lower_if),
        ("for_statement", lower_for),
        ("function_declaration", lower_function),
        ("method_declaration", lower_method),
        ("return_statement", lower_return),
        ("break_statement", Lowerer::lower_break),
        ("continue_statement", Lowerer::lower_continue),
        ("goto_statement", lower_goto),
        ("labeled_statement", lower_labeled),
        ("go_statement", lower_go),
        ("defer_statement", lower_defer),
        ("send_statement", lower_send),
        ("select_statement", lower_select),
        ("expression_switch_statement", lower_expression_switch),
        ("type_switch_statement", lower_type_switch),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("field_identifier", Lowerer::lower_identifier),
        ("package_identifier", Lowerer::lower_identifier),
        ("blank_identifier", Lowerer::lower_identifier),
        ("int_literal", Lowerer::lower_const_literal),
        ("float_literal", Lowerer::lower_const_literal),
        ("imaginary_literal", Lowerer::lower_const_literal),
        ("rune_literal", Lowerer::lower_const_literal),
        ("interpreted_string_literal", Lowerer::lower_const_literal),
        ("raw_string_literal", Lowerer::lower_const_literal),
        ("true", Lowerer::lower_true),
        ("false", Lowerer::lower_false),
        ("nil", Lowerer::lower_none),
        ("binary_expression", Lowerer::lower_binop),
        ("unary_expression", Lowerer::lower_unop),
        ("call_expression", Lowerer::lower_call),
        ("selector_expression", Lowerer::lower_attribute),
        ("index_expression", Lowerer::lower_subscript),
        ("slice_expression", lower_slice),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("composite_literal", lower_composite),
        ("literal_element", lower_literal_element),
        ("func_literal", lower_func_literal),
        ("type_assertion_expression", lower_type_assertion),
        ("type_conversion_expression", lower_type_conversion),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// `var x = v` / `const x = v`: one store per initialized spec.
fn lower_var_declaration<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for spec in lw.useful_children(node) {
        if !matches!(spec.kind(), "var_spec" | "const_spec") {
            continue;
        }
        let Some(value_node) = spec.child_by_field_name("value") else {
            continue;
        };
        let values = expression_list(lw, &value_node);
        // Bound names are the identifiers declared ahead of the value.
        let value_start = value_node.start_byte();
        let names: Vec<N> = lw
            .useful_children(&spec)
            .into_iter()
            .filter(|c| c.kind() == "identifier" && c.start_byte() < value_start)
            .collect();
        store_pairwise(lw, &names, &values);
    }
}

/// Splits an `expression_list` into its members; a bare expression is a
/// one-element list.
fn expression_list<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, node: &N) -> Vec<N> {
    if node.kind() == "expression_list" {
        lw.useful_children(node)
    } else {
        vec![node.clone()]
    }
}

/// Pairwise stores for `a, b = x, y`; a single multi-valued RHS
/// destructures by index.
fn store_pairwise<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, targets: &[N], values: &[N]) {
    if targets.len() > 1 && values.len() == 1 {
        let value = lw.lower_expr(&values[0]);
        lw.lower_pattern_elements(targets, value);
        return;
    }
    for (target, value_node) in targets.iter().zip(values.iter()) {
        let value = lw.lower_expr(value_node);
        lw.lower_store_target(target, value);
    }
}

/// `:=` and `=` over expression lists on both sides.
fn lower_multi_assign<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let Some(left) = node.child_by_field_name("left") else {
        return;
    };
    let Some(right) = node.child_by_field_name("right") else {
        return;
    };
    let operator = node
        .child_by_field_name("operator")
        .map_or_else(|| "=".to_owned(), |op| lw.text(&op));
    let targets = expression_list(lw, &left);
    let values = expression_list(lw, &right);
    if operator == "=" || operator == ":=" {
        store_pairwise(lw, &targets, &values);
        return;
    }
    // Compound assignment: single target, operator with `=` stripped.
    let op = operator.strip_suffix('=').unwrap_or(&operator).to_owned();
    if let (Some(target), Some(value_node)) = (targets.first(), values.first()) {
        let current = lw.lower_expr(target);
        let value = lw.lower_expr(value_node);
        let updated = lw.emit_binop(node, &op, current, value);
        lw.lower_store_target(target, updated);
    }
}

fn lower_inc_dec<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let Some(operand) = lw.useful_children(node).into_iter().next() else {
        return;
    };
    let op = if node.kind() == "inc_statement" { "+" } else { "-" };
    let current = lw.lower_expr(&operand);
    let one = lw.const_at(node, "1");
    let updated = lw.emit_binop(node, op, current, one);
    lw.lower_store_target(&operand, updated);
}

/// Go `if` may carry an initializer statement ahead of the condition.
fn lower_if<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(init) = node.child_by_field_name("initializer") {
        lw.lower_stmt(&init);
    }
    Lowerer::lower_if(lw, node);
}

/// Three-way `for` dispatch: clause, range, or bare condition.
fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let clause = lw
        .useful_children(node)
        .into_iter()
        .find(|c| matches!(c.kind(), "for_clause" | "range_clause") || body.as_ref().map(TreeNode::start_byte) != Some(c.start_byte()));
    match clause {
        Some(clause) if clause.kind() == "for_clause" => {
            let init = clause.child_by_field_name("initializer");
            let cond = clause.child_by_field_name("condition");
            let update = clause.child_by_field_name("update");
            lw.lower_c_style_for(node, init.as_ref(), cond.as_ref(), update.as_ref(), body.as_ref());
        }
        Some(clause) if clause.kind() == "range_clause" => lower_range(lw, node, &clause, body.as_ref()),
        Some(cond) => {
            // `for cond { ... }` is a while loop.
            lower_condition_loop(lw, node, Some(&cond), body.as_ref());
        }
        None => {
            // Bare `for { ... }` loops forever.
            lower_condition_loop(lw, node, None, body.as_ref());
        }
    }
}

fn lower_condition_loop<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, cond: Option<&N>, body: Option<&N>) {
    let cond_label = lw.fresh_label("while_cond");
    let body_label = lw.fresh_label("while_body");
    let end_label = lw.fresh_label("while_end");
    lw.label_at(node, &cond_label);
    let cond_reg = match cond {
        Some(n) => lw.lower_expr(n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    lw.branch_if_at(node, cond_reg, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.push_loop(&cond_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(body);
    }
    lw.pop_loop();
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

/// `for k, v := range iter` desugars to the indexed loop; the index binds
/// to the first target and the element to the second.
fn lower_range<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, clause: &N, body: Option<&N>) {
    let iter = match clause.child_by_field_name("right") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(clause, "unknown_iterable"),
    };
    let targets = clause
        .child_by_field_name("left")
        .map(|left| expression_list(lw, &left))
        .unwrap_or_default();
    if targets.len() < 2 {
        lw.lower_foreach_indexed(node, iter, targets.first(), body);
        return;
    }

    let key_target = targets[0].clone();
    let val_target = targets[1].clone();
    let idx_var = lw.fresh_synthetic("__foreach_idx");
    let zero = lw.const_at(node, "0");
    lw.store_var_at(node, &idx_var, zero);
    let len = lw.emit_call_function1(node, "len", iter);
    let cond_label = lw.fresh_label("foreach_cond");
    let body_label = lw.fresh_label("foreach_body");
    let end_label = lw.fresh_label("foreach_end");
    lw.label_at(node, &cond_label);
    let idx = lw.load_var_at(node, &idx_var);
    let in_bounds = lw.emit_binop(node, "<", idx, len);
    lw.branch_if_at(node, in_bounds, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.lower_store_target(&key_target, idx);
    let element = {
        let dest = lw.fresh_reg();
        lw.push_at(
            node,
            crate::ir::InstKind::LoadIndex {
                dest,
                object: iter,
                index: idx,
            },
        );
        dest
    };
    lw.lower_store_target(&val_target, element);
    lw.push_loop(&cond_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(body);
    }
    lw.pop_loop();
    let idx_again = lw.load_var_at(node, &idx_var);
    let one = lw.const_at(node, "1");
    let bumped = lw.emit_binop(node, "+", idx_again, one);
    lw.store_var_at(node, &idx_var, bumped);
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

/// `func main` hoists its body to top level so its locals live in the
/// entry frame; every other function scaffolds normally.
fn lower_function<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    if name == "main" {
        if let Some(body) = node.child_by_field_name("body") {
            lw.lower_block(&body);
        }
        return;
    }
    Lowerer::lower_function_def(lw, node);
}

/// Methods include the receiver binding ahead of the parameters.
fn lower_method<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let receiver = node.child_by_field_name("receiver");
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    let reference = lw.emit_function_scaffold(node, &name, |lw| {
        if let Some(receiver) = &receiver {
            lw.lower_parameters(receiver);
        }
        if let Some(params) = &params {
            lw.lower_parameters(params);
        }
        if let Some(body) = &body {
            lw.lower_block(body);
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// Multi-value returns emit one `RETURN` per value.
fn lower_return<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let values: Vec<N> = lw
        .useful_children(node)
        .into_iter()
        .flat_map(|c| expression_list(lw, &c))
        .collect();
    if values.is_empty() {
        let default = lw.profile.default_return_value;
        let value = lw.const_at(node, default);
        lw.emit_return(node, value);
        return;
    }
    for value_node in &values {
        let value = lw.lower_expr(value_node);
        lw.emit_return(value_node, value);
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

/// `go f(x)` wraps the lowered call in the `go` helper.
fn lower_go<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    lower_wrapped_call(lw, node, "go");
}

fn lower_defer<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    lower_wrapped_call(lw, node, "defer");
}

fn lower_wrapped_call<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, wrapper: &str) {
    let inner = match lw.useful_children(node).into_iter().next() {
        Some(call) => lw.lower_expr(&call),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    let _ = lw.emit_call_function1(node, wrapper, inner);
}

/// `ch <- v` → `CALL_FUNCTION "chan_send" ch v`.
fn lower_send<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let channel = node.child_by_field_name("channel");
    let value = node.child_by_field_name("value");
    let mut args = ArgRegs::new();
    if let Some(channel) = channel {
        args.push(lw.lower_expr(&channel));
    }
    if let Some(value) = value {
        args.push(lw.lower_expr(&value));
    }
    let _ = lw.emit_call_function(node, "chan_send", args);
}

/// `select` lowers each communication case under its own label, all
/// branching to a shared end.
fn lower_select<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let end_label = lw.fresh_label("select_end");
    lw.push_break_target(&end_label);
    for case in lw.useful_children(node) {
        if !matches!(case.kind(), "communication_case" | "default_case") {
            continue;
        }
        let case_label = lw.fresh_label("select_case");
        lw.label_at(&case, &case_label);
        for child in lw.useful_children(&case) {
            lw.lower_stmt(&child);
        }
        lw.branch_at(&case, &end_label);
    }
    lw.pop_break_target();
    lw.label_at(node, &end_label);
}

fn lower_expression_switch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(init) = node.child_by_field_name("initializer") {
        lw.lower_stmt(&init);
    }
    let subject = match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => {
            // Conditionless switch compares each case against true.
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    let arms = collect_switch_arms(lw, node);
    lw.lower_switch_chain(node, subject, &arms, "==", "||");
}

/// Type switches compare `type_of(subject)` against the case type names.
fn lower_type_switch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject_value = match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let subject = lw.emit_call_function1(node, "type_of", subject_value);
    let arms = collect_switch_arms(lw, node);
    lw.lower_switch_chain(node, subject, &arms, "==", "||");
}

fn collect_switch_arms<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, node: &N) -> Vec<SwitchArm<N>> {
    let mut arms = Vec::new();
    for case in lw.useful_children(node) {
        match case.kind() {
            "expression_case" | "type_case" => {
                let values = case
                    .child_by_field_name("value")
                    .or_else(|| case.child_by_field_name("type"))
                    .map(|v| expression_list(lw, &v))
                    .unwrap_or_default();
                let value_starts: Vec<usize> = values.iter().map(TreeNode::start_byte).collect();
                let stmts: Vec<N> = lw
                    .useful_children(&case)
                    .into_iter()
                    .filter(|c| !value_starts.contains(&c.start_byte()) && c.kind() != "expression_list" && c.kind() != "type_list")
                    .collect();
                arms.push(SwitchArm {
                    values,
                    body: stmts,
                    is_default: false,
                });
            }
            "default_case" => {
                arms.push(SwitchArm {
                    values: Vec::new(),
                    body: lw.useful_children(&case),
                    is_default: true,
                });
            }
            _ => {}
        }
    }
    arms
}

/// `a[1:2]` → `CALL_FUNCTION "slice" a start stop`.
fn lower_slice<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let mut args = ArgRegs::new();
    if let Some(operand) = node.child_by_field_name("operand") {
        args.push(lw.lower_expr(&operand));
    }
    for field in ["start", "end", "capacity"] {
        if let Some(bound) = node.child_by_field_name(field) {
            args.push(lw.lower_expr(&bound));
        }
    }
    lw.emit_call_function(node, "slice", args)
}

/// Composite literals allocate a tagged object; keyed elements store as
/// fields, positional ones by index.
fn lower_composite<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let tag = node
        .child_by_field_name("type")
        .map_or_else(|| "composite".to_owned(), |t| lw.text(&t));
    let obj = lw.emit_new_object(node, &tag);
    let Some(body) = node.child_by_field_name("body") else {
        return obj;
    };
    let mut position = 0usize;
    for element in lw.useful_children(&body) {
        if element.kind() == "keyed_element" {
            let parts = lw.useful_children(&element);
            let key = parts.first();
            let value = parts.get(1);
            match (key, value) {
                (Some(key), Some(value_node)) if matches!(key.kind(), "field_identifier" | "identifier") => {
                    let field = lw.text(key);
                    let value = lw.lower_expr(value_node);
                    lw.emit_store_field(&element, obj, &field, value);
                }
                (Some(key), Some(value_node)) => {
                    let key_reg = lw.lower_expr(key);
                    let value = lw.lower_expr(value_node);
                    lw.emit_store_index(&element, obj, key_reg, value);
                }
                _ => {}
            }
        } else {
            let idx = lw.const_at(&element, position.to_string());
            let inner = lw
                .useful_children(&element)
                .into_iter()
                .next()
                .unwrap_or_else(|| element.clone());
            let value = lw.lower_expr(&inner);
            lw.emit_store_index(&element, obj, idx, value);
            position += 1;
        }
    }
    obj
}

/// Literal elements wrap the actual value expression.
fn lower_literal_element<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match lw.useful_children(node).into_iter().next() {
        Some(inner) => lw.lower_expr(&inner),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

fn lower_func_literal<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__closure", params.as_ref(), body.as_ref())
}

/// `x.(T)` → `CALL_FUNCTION "type_assert" x "T"`.
fn lower_type_assertion<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let mut args = ArgRegs::new();
    if let Some(operand) = node.child_by_field_name("operand") {
        args.push(lw.lower_expr(&operand));
    }
    if let Some(ty) = node.child_by_field_name("type") {
        let text = lw.text(&ty);
        args.push(lw.const_at(&ty, text));
    }
    lw.emit_call_function(node, "type_assert", args)
}

/// `T(x)` conversions are transparent.
fn lower_type_conversion<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match node
        .child_by_field_name("operand")
        .or_else(|| lw.useful_children(node).into_iter().next_back())
    {
        Some(operand) => lw.lower_expr(&operand),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}
