//! Ruby frontend over the tree-sitter-ruby grammar.
//!
//! Modifier forms re-nest around their single statement, `unless`/`until`
//! negate their condition with `UNOP "!"`, blocks lower as anonymous
//! functions appended to the call's arguments, and sigiled variables
//! (`@x`, `@@x`, `$x`) keep their sigils in IR names.

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
        attr_object_field: "receiver",
        attr_attribute_field: "method",
        attribute_node_type: "call",
        method_call_node_types: &[],
        name_node_types: &[
            "identifier",
            "constant",
            "instance_variable",
            "class_variable",
            "global_variable",
        ],
        subscript_node_types: &["element_reference"],
        subscript_value_field: "object",
        subscript_index_field: "index",
        block_node_types: &["program", "body_statement", "block_body", "then", "do"],
        elif_node_types: &["elsif"],
        else_node_types: &["else"],
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("program", Lowerer::lower_block),
        ("body_statement", Lowerer::lower_block),
        ("then", Lowerer::lower_block),
        ("do", Lowerer::lower_block),
        ("if", Lowerer::lower_if),
        ("unless", lower_unless),
        ("while", Lowerer::lower_while),
        ("until", lower_until),
        ("for", lower_for),
        ("if_modifier", lower_if_modifier),
        ("unless_modifier", lower_unless_modifier),
        ("while_modifier", lower_while_modifier),
        ("until_modifier", lower_until_modifier),
        ("method", lower_method),
        ("singleton_method", lower_method),
        ("class", lower_class),
        ("module", lower_class),
        ("return", Lowerer::lower_return),
        ("break", Lowerer::lower_break),
        ("next", Lowerer::lower_continue),
        ("begin", lower_begin),
        ("case", lower_case),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("constant", Lowerer::lower_identifier),
        ("instance_variable", Lowerer::lower_identifier),
        ("class_variable", Lowerer::lower_identifier),
        ("global_variable", Lowerer::lower_identifier),
        ("self", Lowerer::lower_identifier),
        ("integer", Lowerer::lower_const_literal),
        ("float", Lowerer::lower_const_literal),
        ("string", Lowerer::lower_const_literal),
        ("symbol", Lowerer::lower_const_literal),
        ("simple_symbol", Lowerer::lower_const_literal),
        ("regex", Lowerer::lower_const_literal),
        ("true", Lowerer::lower_true),
        ("false", Lowerer::lower_false),
        ("nil", Lowerer::lower_none),
        ("binary", Lowerer::lower_binop),
        ("range", Lowerer::lower_binop),
        ("unary", Lowerer::lower_unop),
        ("assignment", Lowerer::lower_assignment),
        ("operator_assignment", Lowerer::lower_aug_assignment),
        ("conditional", Lowerer::lower_ternary),
        ("call", lower_call),
        ("method_call", lower_call),
        ("element_reference", lower_element_reference),
        ("array", Lowerer::lower_list),
        ("hash", Lowerer::lower_dict),
        ("pair", lower_pair_value),
        ("lambda", lower_lambda),
        ("yield", lower_yield),
        ("parenthesized_statements", Lowerer::lower_paren),
    ]);
}

/// `unless cond` is `if !cond`.
fn lower_unless<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let cond = node.child_by_field_name("condition");
    let consequence = node.child_by_field_name("consequence");
    let alternative = node.child_by_field_name("alternative");
    let cond_reg = negate_condition(lw, node, cond.as_ref());

    let true_label = lw.fresh_label("if_true");
    let end_label = lw.fresh_label("if_end");
    if let Some(alt) = alternative {
        let false_label = lw.fresh_label("if_false");
        lw.branch_if_at(node, cond_reg, &true_label, &false_label);
        lw.label_at(node, &true_label);
        if let Some(body) = consequence {
            lw.lower_block(&body);
        }
        lw.branch_at(node, &end_label);
        lw.label_at(node, &false_label);
        lw.lower_alternative(&alt);
        lw.branch_at(node, &end_label);
    } else {
        lw.branch_if_at(node, cond_reg, &true_label, &end_label);
        lw.label_at(node, &true_label);
        if let Some(body) = consequence {
            lw.lower_block(&body);
        }
        lw.branch_at(node, &end_label);
    }
    lw.label_at(node, &end_label);
}

fn negate_condition<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, cond: Option<&N>) -> Reg {
    let cond_reg = match cond {
        Some(n) => lw.lower_expr(n),
        None => {
            let f = lw.profile.false_literal;
            lw.const_at(node, f)
        }
    };
    lw.emit_unop(node, "!", cond_reg)
}

/// `until cond` loops while `!cond`.
fn lower_until<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let cond = node.child_by_field_name("condition");
    let body = node.child_by_field_name("body");
    let cond_label = lw.fresh_label("while_cond");
    let body_label = lw.fresh_label("while_body");
    let end_label = lw.fresh_label("while_end");
    lw.label_at(node, &cond_label);
    let negated = negate_condition(lw, node, cond.as_ref());
    lw.branch_if_at(node, negated, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.push_loop(&cond_label, &end_label);
    if let Some(body) = body {
        lw.lower_block(&body);
    }
    lw.pop_loop();
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let pattern = node.child_by_field_name("pattern");
    let value = node.child_by_field_name("value");
    let body = node.child_by_field_name("body");
    let iter = match value {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_iterable"),
    };
    lw.lower_foreach_indexed(node, iter, pattern.as_ref(), body.as_ref());
}

/// `stmt if cond`: the statement nests inside the modifier.
fn lower_if_modifier<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    let cond_reg = match cond {
        Some(n) => lw.lower_expr(&n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    modifier_branch(lw, node, cond_reg, body.as_ref());
}

fn lower_unless_modifier<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    let negated = negate_condition(lw, node, cond.as_ref());
    modifier_branch(lw, node, negated, body.as_ref());
}

fn modifier_branch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, cond: Reg, body: Option<&N>) {
    let body_label = lw.fresh_label("if_true");
    let end_label = lw.fresh_label("if_end");
    lw.branch_if_at(node, cond, &body_label, &end_label);
    lw.label_at(node, &body_label);
    if let Some(body) = body {
        lw.lower_stmt(body);
    }
    lw.branch_at(node, &end_label);
    lw.label_at(node, &end_label);
}

fn lower_while_modifier<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    modifier_loop(lw, node, false);
}

fn lower_until_modifier<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    modifier_loop(lw, node, true);
}

fn modifier_loop<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, negate: bool) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    let cond_label = lw.fresh_label("while_cond");
    let body_label = lw.fresh_label("while_body");
    let end_label = lw.fresh_label("while_end");
    lw.label_at(node, &cond_label);
    let cond_reg = if negate {
        negate_condition(lw, node, cond.as_ref())
    } else {
        match cond {
            Some(ref n) => lw.lower_expr(n),
            None => {
                let t = lw.profile.true_literal;
                lw.const_at(node, t)
            }
        }
    };
    lw.branch_if_at(node, cond_reg, &body_label, &end_label);
    lw.label_at(node, &body_label);
    lw.push_loop(&cond_label, &end_label);
    if let Some(body) = body {
        lw.lower_stmt(&body);
    }
    lw.pop_loop();
    lw.branch_at(node, &cond_label);
    lw.label_at(node, &end_label);
}

fn lower_method<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let params = node.child_by_field_name("parameters");
    let body = node
        .child_by_field_name("body")
        .or_else(|| {
            node.named_children()
                .into_iter()
                .find(|c| c.kind() == "body_statement")
        });
    let reference = lw.lower_function_parts(node, &name, params.as_ref(), body.as_ref());
    lw.store_var_at(node, &name, reference);
}

/// Classes and modules share the class shape.
fn lower_class<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let name = node
        .child_by_field_name("name")
        .map_or_else(|| "anonymous".to_owned(), |n| lw.text(&n));
    let body = node
        .child_by_field_name("body")
        .or_else(|| {
            node.named_children()
                .into_iter()
                .find(|c| c.kind() == "body_statement")
        });
    let reference = lw.emit_class_scaffold(node, &name, |lw| {
        if let Some(body) = &body {
            lw.lower_block(body);
        }
    });
    lw.store_var_at(node, &name, reference);
}

/// begin/rescue/else/ensure → the uniform try shape.
fn lower_begin<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let mut clauses = Vec::new();
    let mut else_block = None;
    let mut ensure_block = None;
    let mut body_stmts = Vec::new();
    for child in lw.useful_children(node) {
        match child.kind() {
            "rescue" => {
                let type_name = child
                    .child_by_field_name("exceptions")
                    .and_then(|e| lw.useful_children(&e).into_iter().next())
                    .map(|e| lw.text(&e));
                let variable = child
                    .child_by_field_name("variable")
                    .and_then(|v| lw.useful_children(&v).into_iter().next())
                    .map(|v| lw.text(&v));
                let body = child
                    .child_by_field_name("body")
                    .or_else(|| lw.useful_children(&child).into_iter().find(|c| c.kind() == "then"));
                clauses.push(CatchClause {
                    body,
                    variable,
                    type_name,
                });
            }
            "else" => {
                else_block = lw.useful_children(&child).into_iter().next();
            }
            "ensure" => {
                ensure_block = Some(child);
            }
            _ => body_stmts.push(child),
        }
    }

    let body_label = lw.fresh_label("try_body");
    let finally_label = ensure_block.as_ref().map(|_| lw.fresh_label("try_finally"));
    let end_label = lw.fresh_label("try_end");
    let converge = finally_label.clone().unwrap_or_else(|| end_label.clone());

    lw.label_at(node, &body_label);
    for stmt in &body_stmts {
        lw.lower_stmt(stmt);
    }
    if let Some(else_block) = &else_block {
        lw.lower_block(else_block);
    }
    lw.branch_at(node, &converge);
    for clause in &clauses {
        let clause_label = lw.fresh_label("catch");
        lw.label_at(node, &clause_label);
        let hint = match &clause.type_name {
            Some(ty) => format!("caught_exception:{ty}"),
            None => "caught_exception:any".to_owned(),
        };
        let caught = lw.symbolic_at(node, &hint);
        if let Some(variable) = &clause.variable {
            lw.store_var_at(node, variable, caught);
        }
        if let Some(body) = &clause.body {
            lw.lower_block(body);
        }
        lw.branch_at(node, &converge);
    }
    if let (Some(finally_label), Some(ensure_block)) = (finally_label, ensure_block) {
        lw.label_at(node, &finally_label);
        for stmt in lw.useful_children(&ensure_block) {
            lw.lower_stmt(&stmt);
        }
        lw.branch_at(node, &end_label);
    }
    lw.label_at(node, &end_label);
}

/// case/when → an `==` chain.
fn lower_case<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject = match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    let mut arms = Vec::new();
    for child in lw.useful_children(node) {
        match child.kind() {
            "when" => {
                let body: Vec<N> = lw
                    .useful_children(&child)
                    .into_iter()
                    .filter(|c| c.kind() == "then")
                    .collect();
                let values: Vec<N> = lw
                    .useful_children(&child)
                    .into_iter()
                    .filter(|c| c.kind() != "then")
                    .collect();
                arms.push(SwitchArm {
                    values,
                    body,
                    is_default: false,
                });
            }
            "else" => {
                arms.push(SwitchArm {
                    values: Vec::new(),
                    body: lw.useful_children(&child),
                    is_default: true,
                });
            }
            _ => {}
        }
    }
    lw.lower_switch_chain(node, subject, &arms, "==", "||");
}

/// Calls carry their receiver and block in fields; a block lowers as an
/// anonymous function appended to the arguments.
fn lower_call<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let receiver = node.child_by_field_name("receiver");
    let method = node
        .child_by_field_name("method")
        .map_or_else(|| "anonymous".to_owned(), |m| lw.text(&m));
    let mut args = match node.child_by_field_name("arguments") {
        Some(args_node) => lw.lower_arg_children(&args_node),
        None => ArgRegs::new(),
    };
    if let Some(block) = node.child_by_field_name("block") {
        args.push(lower_block_argument(lw, &block));
    }
    match receiver {
        Some(receiver) => {
            let obj = lw.lower_expr(&receiver);
            lw.emit_call_method(node, obj, &method, args)
        }
        None => lw.emit_call_function(node, &method, args),
    }
}

/// `{ |x| ... }` / `do |x| ... end` lower as anonymous functions.
fn lower_block_argument<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, block: &N) -> Reg {
    let params = block
        .child_by_field_name("parameters")
        .or_else(|| {
            block
                .named_children()
                .into_iter()
                .find(|c| c.kind() == "block_parameters")
        });
    let body = block
        .child_by_field_name("body")
        .or_else(|| {
            block
                .named_children()
                .into_iter()
                .find(|c| matches!(c.kind(), "block_body" | "body_statement"))
        });
    lw.lower_anonymous_function(block, "__block", params.as_ref(), body.as_ref())
}

fn lower_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lower_block_argument(lw, node)
}

/// `a[i]` reads through `LOAD_INDEX`; extra indices are ignored.
fn lower_element_reference<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let Some(object) = node
        .child_by_field_name("object")
        .or_else(|| lw.useful_children(node).into_iter().next())
    else {
        return lw.symbolic_at(node, "unknown_subscript");
    };
    let obj = lw.lower_expr(&object);
    let index = lw.useful_children(node).into_iter().nth(1);
    let idx = match index {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_index"),
    };
    let dest = lw.fresh_reg();
    lw.push_at(
        node,
        crate::ir::InstKind::LoadIndex {
            dest,
            object: obj,
            index: idx,
        },
    );
    dest
}

fn lower_pair_value<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match node.child_by_field_name("value") {
        Some(v) => lw.lower_expr(&v),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

fn lower_yield<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let args = lw.lower_arg_children(node);
    lw.emit_call_function(node, "yield", args)
}
