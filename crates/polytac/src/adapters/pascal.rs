//! Pascal frontend over the tree-sitter-pascal grammar.
//!
//! The grammar surfaces keywords as named `k`-prefixed nodes, so a
//! dedicated noise set filters them; operator keyword nodes (`kAdd`,
//! `kLt`, ...) map onto IR operator strings. Assignment to the enclosing
//! function's name lowers as `RETURN`, and `repeat..until` swaps its
//! branch targets so the loop re-enters while the condition is false.

use crate::{
    engine::{Lowerer, Profile, SwitchArm},
    ir::Reg,
    tracer::LowerTracer,
    tree::TreeNode,
};

pub(crate) fn lowerer<N: TreeNode, T: LowerTracer>(tracer: T) -> Lowerer<N, T> {
    let mut lw = Lowerer::with_tracer(profile(), tracer);
    install(&mut lw);
    lw
}

/// Keyword nodes carrying no lowering content.
const KEYWORD_NOISE: &[&str] = &[
    "kProgram", "kUnit", "kUses", "kBegin", "kEnd", "kEndDot", "kVar", "kConst", "kType",
    "kProcedure", "kFunction", "kThen", "kDo", "kOf", "kIf", "kWhile", "kFor", "kRepeat",
    "kUntil", "kCase", "kElse", "kTo", "kDownto", "kSemicolon", "kColon", "kComma", "kDot",
    "kAssign", "kInterface", "kImplementation",
];

fn profile<N: TreeNode, T: LowerTracer>() -> Profile<N, T> {
    Profile {
        assign_left_field: "lhs",
        assign_right_field: "rhs",
        attr_object_field: "lhs",
        attr_attribute_field: "rhs",
        attribute_node_type: "exprDot",
        method_call_node_types: &["exprDot"],
        subscript_node_types: &["exprBrackets"],
        subscript_value_field: "operand",
        subscript_index_field: "index",
        block_node_types: &["root", "program", "unit", "block", "statements"],
        noise_types: KEYWORD_NOISE,
        elif_node_types: &[],
        else_node_types: &[],
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("root", Lowerer::lower_block),
        ("program", Lowerer::lower_block),
        ("unit", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("statements", Lowerer::lower_block),
        ("assignment", lower_assignment),
        ("if", lower_if),
        ("while", lower_while),
        ("repeat", lower_repeat),
        ("for", lower_for),
        ("case", lower_case),
        ("declProc", lower_routine),
        ("declFunc", lower_routine),
        ("declVar", lower_decl_var),
        ("declConst", lower_decl_var),
        ("declType", lower_nothing),
        ("exprCall", lower_call_statement),
        ("break", Lowerer::lower_break),
        ("continue", Lowerer::lower_continue),
        ("exit", lower_exit),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("literalNumber", Lowerer::lower_const_literal),
        ("literalString", Lowerer::lower_const_literal),
        ("kTrue", Lowerer::lower_true),
        ("kFalse", Lowerer::lower_false),
        ("kNil", Lowerer::lower_none),
        ("exprBinary", lower_binary),
        ("exprUnary", lower_unary),
        ("exprCall", Lowerer::lower_call),
        ("exprDot", Lowerer::lower_attribute),
        ("exprBrackets", Lowerer::lower_subscript),
        ("exprParens", Lowerer::lower_paren),
        ("exprArgs", Lowerer::lower_paren),
    ]);
}

fn lower_nothing<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// Maps an operator keyword node kind to its IR operator string.
fn operator_text(kind: &str) -> Option<&'static str> {
    let op = match kind {
        "kAdd" => "+",
        "kSub" => "-",
        "kMul" => "*",
        "kFpDiv" => "/",
        "kDiv" => "div",
        "kMod" => "mod",
        "kLt" => "<",
        "kLte" => "<=",
        "kGt" => ">",
        "kGte" => ">=",
        "kEq" => "=",
        "kNeq" => "<>",
        "kAnd" => "and",
        "kOr" => "or",
        "kXor" => "xor",
        "kNot" => "not",
        "kShl" => "shl",
        "kShr" => "shr",
        "kAt" => "@",
        "kHat" => "^",
        _ => return None,
    };
    Some(op)
}

fn lower_binary<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let lhs_node = node.child_by_field_name("lhs");
    let rhs_node = node.child_by_field_name("rhs");
    let op = node
        .children()
        .into_iter()
        .find_map(|c| operator_text(c.kind()))
        .unwrap_or("?");
    let lhs = match lhs_node.or_else(|| lw.useful_children(node).into_iter().next()) {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    let rhs = match rhs_node.or_else(|| lw.useful_children(node).into_iter().next_back()) {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_binop(node, op, lhs, rhs)
}

fn lower_unary<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let op = node
        .children()
        .into_iter()
        .find_map(|c| operator_text(c.kind()))
        .unwrap_or("-");
    let operand = match lw.useful_children(node).into_iter().next_back() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_unop(node, op, operand)
}

/// `x := v`; assigning to the enclosing function's name returns instead
/// (Pascal's result idiom). The comparison is case-insensitive.
fn lower_assignment<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let lhs = lw.field_or_nth(node, "lhs", 0);
    let rhs = node
        .child_by_field_name("rhs")
        .or_else(|| lw.useful_children(node).into_iter().nth(1));
    let value = match rhs {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    let Some(lhs) = lhs else { return };
    if lhs.kind() == "identifier" {
        let name = lw.text(&lhs);
        if lw
            .current_function_name
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case(&name))
        {
            lw.emit_return(node, value);
            return;
        }
    }
    lw.lower_store_target(&lhs, value);
}

fn lower_if<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let parts = lw.useful_children(node);
    let cond = parts.first();
    let consequence = parts.get(1);
    let alternative = parts.get(2);
    let cond_reg = match cond {
        Some(n) => lw.lower_expr(n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    let true_label = lw.fresh_label("if_true");
    let end_label = lw.fresh_label("if_end");
    if let Some(alt) = alternative {
        let false_label = lw.fresh_label("if_false");
        lw.branch_if_at(node, cond_reg, &true_label, &false_label);
        lw.label_at(node, &true_label);
        if let Some(body) = consequence {
            lw.lower_block(body);
        }
        lw.branch_at(node, &end_label);
        lw.label_at(node, &false_label);
        lw.lower_block(alt);
        lw.branch_at(node, &end_label);
    } else {
        lw.branch_if_at(node, cond_reg, &true_label, &end_label);
        lw.label_at(node, &true_label);
        if let Some(body) = consequence {
            lw.lower_block(body);
        }
        lw.branch_at(node, &end_label);
    }
    lw.label_at(node, &end_label);
}

fn lower_while<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let parts = lw.useful_children(node);
    let cond = parts.first().cloned();
    let body = parts.get(1).cloned();

    let cond_label = lw.fresh_label("while_cond");
    let body_label = lw.fresh_label("while_body");
    let end_label = lw.fresh_label("while_end");
    lw.label_at(node, &cond_label);
    let cond_reg = match cond {
        Some(n) => lw.lower_expr(&n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    lw.branch_if_at(node, cond_reg, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.push_loop(&cond_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(&body);
    }
    lw.pop_loop();
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

/// `repeat .. until cond`: branch targets swap so the loop continues
/// while the condition is false.
fn lower_repeat<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let parts = lw.useful_children(node);
    let Some((cond, body)) = parts.split_last() else {
        return;
    };
    let body_label = lw.fresh_label("loop_body");
    let cond_label = lw.fresh_label("loop_cond");
    let end_label = lw.fresh_label("loop_end");
    lw.label_at(node, &body_label);
    lw.push_loop(&cond_label, &end_label);
    for stmt in body {
        lw.lower_stmt(stmt);
    }
    lw.pop_loop();
    lw.label_at(node, &cond_label);
    let cond_reg = lw.lower_expr(cond);
    lw.branch_if_at(node, cond_reg, &end_label, &body_label);
    lw.label_at(node, &end_label);
}

/// `for i := a to b do` counts with `<=`; `downto` counts with `>=` and
/// steps by -1.
fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let parts = lw.useful_children(node);
    let variable = parts.first();
    let start = parts.get(1);
    let stop = parts.get(2);
    let body = parts.get(3);
    let descending = node.children().iter().any(|c| c.kind() == "kDownto");

    let name = variable.map_or_else(|| "i".to_owned(), |v| lw.text(v));
    let start_reg = match start {
        Some(n) => lw.lower_expr(n),
        None => lw.const_at(node, "0"),
    };
    lw.store_var_at(node, &name, start_reg);
    let stop_reg = match stop {
        Some(n) => lw.lower_expr(n),
        None => lw.const_at(node, "0"),
    };

    let cond_label = lw.fresh_label("for_cond");
    let body_label = lw.fresh_label("for_body");
    let update_label = lw.fresh_label("for_update");
    let end_label = lw.fresh_label("for_end");
    lw.label_at(node, &cond_label);
    let current = lw.load_var_at(node, &name);
    let cmp = if descending { ">=" } else { "<=" };
    let in_bounds = lw.emit_binop(node, cmp, current, stop_reg);
    lw.branch_if_at(node, in_bounds, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.push_loop(&update_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(body);
    }
    lw.pop_loop();
    lw.label_at(node, &update_label);
    let again = lw.load_var_at(node, &name);
    let one = lw.const_at(node, "1");
    let op = if descending { "-" } else { "+" };
    let stepped = lw.emit_binop(node, op, again, one);
    lw.store_var_at(node, &name, stepped);
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

/// `case` with multiple labels per arm OR-chained; the trailing arm
/// without labels is the else part.
fn lower_case<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let parts = lw.useful_children(node);
    let Some((subject_node, cases)) = parts.split_first() else {
        return;
    };
    let subject = lw.lower_expr(subject_node);
    let mut arms = Vec::new();
    for case in cases {
        if case.kind() == "caseCase" {
            let case_parts = lw.useful_children(case);
            let Some((body, labels)) = case_parts.split_last() else {
                continue;
            };
            arms.push(SwitchArm {
                values: labels.to_vec(),
                body: vec![body.clone()],
                is_default: labels.is_empty(),
            });
        } else {
            // The else part of the case statement.
            arms.push(SwitchArm {
                values: Vec::new(),
                body: vec![case.clone()],
                is_default: true,
            });
        }
    }
    lw.lower_switch_chain(node, subject, &arms, "=", "or");
}

/// Procedures and functions: name, argument declarations, then the block
/// (with any nested declarations lowered in order).
fn lower_routine<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let parts = lw.useful_children(node);
    let name = parts
        .iter()
        .find(|c| c.kind() == "identifier")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(n));
    let params = parts.iter().find(|c| c.kind() == "declArgs").cloned();
    let bodies: Vec<N> = parts
        .iter()
        .filter(|c| matches!(c.kind(), "block" | "declVar" | "declConst" | "declProc" | "declFunc"))
        .cloned()
        .collect();
    let enclosing = lw.current_function_name.replace(name.clone());
    let reference = lw.emit_function_scaffold(node, &name, |lw| {
        if let Some(params) = &params {
            lw.lower_parameters(params);
        }
        for body in &bodies {
            lw.lower_block(body);
        }
    });
    lw.current_function_name = enclosing;
    lw.store_var_at(node, &name, reference);
}

/// Initialized declarations store their default value.
fn lower_decl_var<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for declaration in lw.useful_children(node) {
        let parts = lw.useful_children(&declaration);
        let name = parts.iter().find(|c| c.kind() == "identifier");
        let value_node = parts.iter().filter(|c| c.kind() != "identifier").next_back();
        let (Some(name), Some(value_node)) = (name, value_node) else {
            continue;
        };
        if !matches!(
            value_node.kind(),
            "literalNumber" | "literalString" | "exprBinary" | "exprUnary" | "exprCall" | "kTrue" | "kFalse" | "kNil"
        ) {
            continue;
        }
        let value = lw.lower_expr(value_node);
        let text = lw.text(name);
        lw.store_var_at(name, text, value);
    }
}

/// Procedure calls in statement position.
fn lower_call_statement<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let _ = Lowerer::lower_call(lw, node);
}

/// `exit` returns the function-name variable when one is live (the
/// Pascal result idiom), otherwise the default return value.
fn lower_exit<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let value = match lw.current_function_name.clone() {
        Some(name) => lw.load_var_at(node, name),
        None => {
            let default = lw.profile.default_return_value;
            lw.const_at(node, default)
        }
    };
    lw.emit_return(node, value);
}
