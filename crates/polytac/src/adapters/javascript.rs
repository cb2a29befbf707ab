//! JavaScript frontend over the tree-sitter-javascript grammar.
//!
//! Supplies the base tables TypeScript extends. Language-unique handlers
//! cover object/array destructuring, arrow functions, template strings,
//! `new`, the two for-in/of shapes, strict-equality switch, and
//! spread/await/yield as named calls.

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

pub(crate) fn profile<N: TreeNode, T: LowerTracer>() -> Profile<N, T> {
    Profile {
        attr_object_field: "object",
        attr_attribute_field: "property",
        attribute_node_type: "member_expression",
        method_call_node_types: &["member_expression"],
        subscript_node_types: &["subscript_expression"],
        subscript_value_field: "object",
        subscript_index_field: "index",
        block_node_types: &["program", "statement_block", "class_body", "switch_body"],
        elif_node_types: &[],
        else_node_types: &["else_clause"],
        store_target: Some(store_target),
        ..Profile::default()
    }
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("program", Lowerer::lower_block),
        ("statement_block", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("lexical_declaration", lower_declaration),
        ("variable_declaration", lower_declaration),
        ("if_statement", Lowerer::lower_if),
        ("while_statement", Lowerer::lower_while),
        ("do_statement", lower_do),
        ("for_statement", lower_for),
        ("for_in_statement", lower_for_in),
        ("function_declaration", Lowerer::lower_function_def),
        ("generator_function_declaration", Lowerer::lower_function_def),
        ("class_declaration", Lowerer::lower_class_def),
        ("method_definition", Lowerer::lower_function_def),
        ("field_definition", lower_field_definition),
        ("return_statement", Lowerer::lower_return),
        ("break_statement", Lowerer::lower_break),
        ("continue_statement", Lowerer::lower_continue),
        ("throw_statement", Lowerer::lower_throw),
        ("try_statement", lower_try),
        ("switch_statement", lower_switch),
        ("labeled_statement", lower_labeled),
        ("empty_statement", lower_empty),
        ("debugger_statement", lower_empty),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("property_identifier", Lowerer::lower_identifier),
        ("shorthand_property_identifier", Lowerer::lower_identifier),
        ("number", Lowerer::lower_const_literal),
        ("string", Lowerer::lower_const_literal),
        ("regex", Lowerer::lower_const_literal),
        ("true", Lowerer::lower_true),
        ("false", Lowerer::lower_false),
        ("null", Lowerer::lower_none),
        ("undefined", Lowerer::lower_none),
        ("this", Lowerer::lower_identifier),
        ("super", Lowerer::lower_identifier),
        ("binary_expression", Lowerer::lower_binop),
        ("unary_expression", Lowerer::lower_unop),
        ("update_expression", Lowerer::lower_update_expr),
        ("ternary_expression", Lowerer::lower_ternary),
        ("assignment_expression", Lowerer::lower_assignment),
        ("augmented_assignment_expression", Lowerer::lower_aug_assignment),
        ("call_expression", Lowerer::lower_call),
        ("member_expression", Lowerer::lower_attribute),
        ("subscript_expression", Lowerer::lower_subscript),
        ("arrow_function", lower_arrow),
        ("function_expression", lower_function_expression),
        ("function", lower_function_expression),
        ("array", Lowerer::lower_list),
        ("object", lower_object),
        ("new_expression", lower_new),
        ("template_string", lower_template_string),
        ("template_substitution", lower_substitution),
        ("spread_element", lower_spread),
        ("await_expression", lower_await),
        ("yield_expression", lower_yield),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("sequence_expression", lower_sequence),
    ]);
}

fn lower_empty<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// Store-target override adding object/array pattern destructuring on top
/// of the engine's variable/field/index classification.
fn store_target<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, target: &N, value: Reg) {
    match target.kind() {
        "object_pattern" => {
            for entry in lw.useful_children(target) {
                match entry.kind() {
                    "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
                        let name = lw.text(&entry);
                        let field = lw.emit_load_field(&entry, value, &name);
                        lw.store_var_at(&entry, name, field);
                    }
                    "pair_pattern" => {
                        let key = entry
                            .child_by_field_name("key")
                            .map_or_else(String::new, |k| lw.text(&k));
                        let inner = entry.child_by_field_name("value");
                        let field = lw.emit_load_field(&entry, value, &key);
                        if let Some(inner) = inner {
                            lw.lower_store_target(&inner, field);
                        }
                    }
                    "rest_pattern" => {
                        let rest = lw.emit_call_function1(&entry, "rest", value);
                        if let Some(inner) = lw.useful_children(&entry).into_iter().next() {
                            lw.lower_store_target(&inner, rest);
                        }
                    }
                    _ => {
                        let element = lw.lower_expr(&entry);
                        let _ = element;
                    }
                }
            }
        }
        "array_pattern" => {
            let elements = lw.useful_children(target);
            lw.lower_pattern_elements(&elements, value);
        }
        _ => lw.default_store_target(target, value),
    }
}

/// `let`/`const`/`var`: one store per declarator; bare declarations bind
/// the canonical null.
fn lower_declaration<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for declarator in lw.useful_children(node) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let name = declarator.child_by_field_name("name");
        let value = match declarator.child_by_field_name("value") {
            Some(v) => lw.lower_expr(&v),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(&declarator, none)
            }
        };
        if let Some(name) = name {
            lw.lower_store_target(&name, value);
        }
    }
}

fn lower_do<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let cond = node.child_by_field_name("condition");
    lw.lower_post_test_loop(node, body.as_ref(), cond.as_ref(), true);
}

fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let init = node.child_by_field_name("initializer");
    let cond = node.child_by_field_name("condition");
    let update = node.child_by_field_name("increment");
    let body = node.child_by_field_name("body");
    lw.lower_c_style_for(node, init.as_ref(), cond.as_ref(), update.as_ref(), body.as_ref());
}

/// `for..in` iterates keys (through the `keys()` helper); `for..of`
/// iterates values. Both desugar to the indexed loop.
fn lower_for_in<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let left = node.child_by_field_name("left");
    let right = node.child_by_field_name("right");
    let body = node.child_by_field_name("body");
    let is_in = node
        .children()
        .iter()
        .any(|c| !c.is_named() && c.kind() == "in");
    let mut iter = match right {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_iterable"),
    };
    if is_in {
        iter = lw.emit_call_function1(node, "keys", iter);
    }
    lw.lower_foreach_indexed(node, iter, left.as_ref(), body.as_ref());
}

/// Class fields assign within the class body scope.
fn lower_field_definition<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let property = node.child_by_field_name("property");
    let value = match node.child_by_field_name("value") {
        Some(v) => lw.lower_expr(&v),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    if let Some(property) = property {
        let name = lw.text(&property);
        lw.store_var_at(&property, name, value);
    }
}

fn lower_try<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let mut clauses = Vec::new();
    if let Some(handler) = node.child_by_field_name("handler") {
        let parameter = handler.child_by_field_name("parameter").map(|p| lw.text(&p));
        clauses.push(CatchClause {
            body: handler.child_by_field_name("body"),
            variable: parameter,
            type_name: None,
        });
    }
    let finalizer = node
        .child_by_field_name("finalizer")
        .and_then(|f| f.child_by_field_name("body").or_else(|| lw.useful_children(&f).into_iter().next()));
    lw.lower_try_catch(node, body.as_ref(), &clauses, None, finalizer.as_ref());
}

/// Switch lowers to a `===` chain; the end label doubles as the `break`
/// target and no fall-through path exists in the IR.
fn lower_switch<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject = match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_switch_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let arms = collect_switch_arms(lw, &body, "switch_case", "switch_default");
    lw.lower_switch_chain(node, subject, &arms, "===", "||");
}

/// Extracts case/default arms from a switch body, splitting each case's
/// value expression from its statements.
pub(crate) fn collect_switch_arms<N: TreeNode, T: LowerTracer>(
    lw: &Lowerer<N, T>,
    body: &N,
    case_kind: &str,
    default_kind: &str,
) -> Vec<SwitchArm<N>> {
    let mut arms = Vec::new();
    for case in lw.useful_children(body) {
        let kind = case.kind();
        if kind == case_kind {
            let value = case.child_by_field_name("value");
            let value_start = value.as_ref().map(TreeNode::start_byte);
            let stmts: Vec<N> = lw
                .useful_children(&case)
                .into_iter()
                .filter(|c| Some(c.start_byte()) != value_start)
                .collect();
            arms.push(SwitchArm {
                values: value.into_iter().collect(),
                body: stmts,
                is_default: false,
            });
        } else if kind == default_kind {
            arms.push(SwitchArm {
                values: Vec::new(),
                body: lw.useful_children(&case),
                is_default: true,
            });
        }
    }
    arms
}

fn lower_labeled<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    if let Some(label) = node.child_by_field_name("label") {
        let name = lw.text(&label);
        lw.emit_user_label(node, &name);
    }
    if let Some(body) = node.child_by_field_name("body") {
        lw.lower_stmt(&body);
    }
}

fn lower_arrow<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node
        .child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"));
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__arrow", params.as_ref(), body.as_ref())
}

/// Function expressions bind their own name when present, otherwise they
/// scaffold under a synthetic one.
fn lower_function_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    match node.child_by_field_name("name") {
        Some(name) => {
            let name = lw.text(&name);
            lw.lower_function_parts(node, &name, params.as_ref(), body.as_ref())
        }
        None => lw.lower_anonymous_function(node, "__anon", params.as_ref(), body.as_ref()),
    }
}

/// Object literal: pairs store under their key; shorthand properties read
/// the same-named variable; spreads degrade to the `spread` helper.
fn lower_object<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let obj = lw.emit_new_object(node, "dict");
    for entry in lw.useful_children(node) {
        match entry.kind() {
            "pair" => lw.lower_pair_into(&entry, obj),
            "shorthand_property_identifier" => {
                let name = lw.text(&entry);
                let key = lw.const_at(&entry, name.clone());
                let value = lw.load_var_at(&entry, name);
                lw.emit_store_index(&entry, obj, key, value);
            }
            "spread_element" => {
                let _ = lower_spread(lw, &entry);
            }
            "method_definition" => {
                let name = entry
                    .child_by_field_name("name")
                    .map_or_else(|| "method".to_owned(), |n| lw.text(&n));
                let params = entry.child_by_field_name("parameters");
                let body = entry.child_by_field_name("body");
                let reference = lw.lower_function_parts(&entry, &name, params.as_ref(), body.as_ref());
                let key = lw.const_at(&entry, name);
                lw.emit_store_index(&entry, obj, key, reference);
            }
            _ => {
                let _ = lw.lower_expr(&entry);
            }
        }
    }
    obj
}

/// `new Foo(args)` allocates a tagged object and invokes its constructor.
fn lower_new<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let constructor = node.child_by_field_name("constructor");
    let tag = constructor.as_ref().map_or_else(|| "object".to_owned(), |c| lw.text(c));
    let obj = lw.emit_new_object(node, &tag);
    let args = match node.child_by_field_name("arguments") {
        Some(args_node) => lw.lower_arg_children(&args_node),
        None => ArgRegs::new(),
    };
    let _ = lw.emit_call_method(node, obj, "constructor", args);
    obj
}

/// Template strings fold fragments and substitutions into a `+` chain.
fn lower_template_string<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    if parts.is_empty() {
        let text = lw.text(node);
        return lw.const_at(node, text);
    }
    let mut acc: Option<Reg> = None;
    for part in &parts {
        let piece = if part.kind() == "template_substitution" {
            lower_substitution(lw, part)
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

fn lower_substitution<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match lw.useful_children(node).into_iter().next() {
        Some(inner) => lw.lower_expr(&inner),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

fn lower_spread<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let inner = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_call_function1(node, "spread", inner)
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

fn lower_yield<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let args = lw.lower_arg_children(node);
    lw.emit_call_function(node, "yield", args)
}

fn lower_sequence<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
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
