//! Python frontend over the tree-sitter-python grammar.
//!
//! The engine's profile defaults are already Python-shaped, so this adapter
//! mostly fills dispatch tables. Language-unique handlers cover
//! comprehensions, `with`, decorators, `match`, destructuring, the walrus
//! operator, slicing, and import binding.

use crate::{
    engine::{Lowerer, Profile, SwitchArm},
    ir::Reg,
    tracer::LowerTracer,
    tree::TreeNode,
};

pub(crate) fn lowerer<N: TreeNode, T: LowerTracer>(tracer: T) -> Lowerer<N, T> {
    let mut lw = Lowerer::with_tracer(Profile::default(), tracer);
    install(&mut lw);
    lw
}

pub(crate) fn install<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>) {
    lw.stmts(&[
        ("module", Lowerer::lower_block),
        ("block", Lowerer::lower_block),
        ("expression_statement", Lowerer::lower_expression_statement),
        ("if_statement", Lowerer::lower_if),
        ("while_statement", Lowerer::lower_while),
        ("for_statement", lower_for),
        ("function_definition", Lowerer::lower_function_def),
        ("decorated_definition", lower_decorated),
        ("class_definition", Lowerer::lower_class_def),
        ("return_statement", Lowerer::lower_return),
        ("break_statement", Lowerer::lower_break),
        ("continue_statement", Lowerer::lower_continue),
        ("pass_statement", lower_pass),
        ("global_statement", lower_pass),
        ("nonlocal_statement", lower_pass),
        ("raise_statement", Lowerer::lower_throw),
        ("try_statement", lower_try),
        ("with_statement", lower_with),
        ("match_statement", lower_match),
        ("import_statement", lower_import),
        ("import_from_statement", lower_import_from),
        ("assert_statement", lower_assert),
        ("delete_statement", lower_delete),
    ]);
    lw.exprs(&[
        ("identifier", Lowerer::lower_identifier),
        ("integer", Lowerer::lower_const_literal),
        ("float", Lowerer::lower_const_literal),
        ("string", Lowerer::lower_const_literal),
        ("concatenated_string", Lowerer::lower_const_literal),
        ("ellipsis", Lowerer::lower_const_literal),
        ("true", Lowerer::lower_true),
        ("false", Lowerer::lower_false),
        ("none", Lowerer::lower_none),
        ("binary_operator", Lowerer::lower_binop),
        ("boolean_operator", Lowerer::lower_binop),
        ("comparison_operator", Lowerer::lower_binop),
        ("not_operator", Lowerer::lower_unop),
        ("unary_operator", Lowerer::lower_unop),
        ("attribute", Lowerer::lower_attribute),
        ("subscript", Lowerer::lower_subscript),
        ("call", Lowerer::lower_call),
        ("assignment", lower_assignment),
        ("augmented_assignment", Lowerer::lower_aug_assignment),
        ("named_expression", lower_walrus),
        ("conditional_expression", lower_conditional),
        ("lambda", lower_lambda),
        ("list", Lowerer::lower_list),
        ("tuple", Lowerer::lower_tuple),
        ("set", Lowerer::lower_set),
        ("dictionary", Lowerer::lower_dict),
        ("parenthesized_expression", Lowerer::lower_paren),
        ("list_comprehension", lower_list_comprehension),
        ("set_comprehension", lower_set_comprehension),
        ("dictionary_comprehension", lower_dict_comprehension),
        ("generator_expression", lower_generator_expression),
        ("await", lower_await),
        ("yield", lower_yield),
        ("slice", lower_slice),
        ("keyword_argument", lower_keyword_argument),
        ("interpolation", lower_interpolation),
    ]);
}

fn lower_pass<N: TreeNode, T: LowerTracer>(_lw: &mut Lowerer<N, T>, _node: &N) {}

/// `for x in iter:` desugars to the indexed loop; `for a, b in iter:`
/// destructures through the pattern store.
fn lower_for<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let left = node.child_by_field_name("left");
    let right = node.child_by_field_name("right");
    let body = node.child_by_field_name("body");
    let iter = match right {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_iterable"),
    };
    lw.lower_foreach_indexed(node, iter, left.as_ref(), body.as_ref());
}

/// Assignment with tuple/list unpacking and annotation-only declarations.
fn lower_assignment<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let left = node.child_by_field_name("left");
    let right = node.child_by_field_name("right");
    let Some(right) = right else {
        // Annotation-only (`x: int`): nothing is bound.
        let none = lw.profile.none_literal;
        return lw.const_at(node, none);
    };
    let value = lw.lower_expr(&right);
    if let Some(target) = left {
        store_python_target(lw, &target, value);
    }
    value
}

fn store_python_target<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, target: &N, value: Reg) {
    match target.kind() {
        "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list" => {
            let elements = lw.useful_children(target);
            lw.lower_pattern_elements(&elements, value);
        }
        _ => lw.lower_store_target(target, value),
    }
}

/// Walrus `x := v`: stores and yields the value.
fn lower_walrus<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let name = node.child_by_field_name("name");
    let value_node = lw.field_or_nth(node, "value", 1);
    let value = match value_node {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    if let Some(name) = name {
        let text = lw.text(&name);
        lw.store_var_at(node, text, value);
    }
    value
}

/// `a if cond else b`; the value comes first in the grammar.
fn lower_conditional<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let cond = match parts.get(1) {
        Some(n) => lw.lower_expr(n),
        None => {
            let t = lw.profile.true_literal;
            lw.const_at(node, t)
        }
    };
    let then_node = parts.first().cloned();
    let else_node = parts.get(2).cloned();
    lw.lower_phi_branch(
        node,
        "__ternary",
        cond,
        |lw| match &then_node {
            Some(n) => lw.lower_expr(n),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(node, none)
            }
        },
        |lw| match &else_node {
            Some(n) => lw.lower_expr(n),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(node, none)
            }
        },
    )
}

fn lower_lambda<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let params = node.child_by_field_name("parameters");
    let body = node.child_by_field_name("body");
    lw.lower_anonymous_function(node, "__lambda", params.as_ref(), body.as_ref())
}

/// Decorators apply bottom-up over the stored definition name.
fn lower_decorated<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let Some(definition) = node.child_by_field_name("definition") else {
        for child in lw.useful_children(node) {
            lw.lower_stmt(&child);
        }
        return;
    };
    lw.lower_stmt(&definition);
    let name = definition
        .child_by_field_name("name")
        .map(|n| lw.text(&n))
        .unwrap_or_default();
    if name.is_empty() {
        return;
    }
    let decorators: Vec<N> = lw
        .useful_children(node)
        .into_iter()
        .filter(|c| c.kind() == "decorator")
        .collect();
    for decorator in decorators.iter().rev() {
        let callee = match lw.useful_children(decorator).into_iter().next() {
            Some(inner) => lw.lower_expr(&inner),
            None => lw.symbolic_at(decorator, "unknown_decorator"),
        };
        let current = lw.load_var_at(decorator, &name);
        let mut args = crate::ir::ArgRegs::new();
        args.push(current);
        let decorated = {
            let dest = lw.fresh_reg();
            lw.push_at(
                decorator,
                crate::ir::InstKind::CallUnknown {
                    dest,
                    target: callee,
                    args,
                },
            );
            dest
        };
        lw.store_var_at(decorator, &name, decorated);
    }
}

/// try/except/else/finally in the uniform clause shape.
fn lower_try<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let mut clauses = Vec::new();
    let mut else_block = None;
    let mut finally_block = None;
    for child in lw.useful_children(node) {
        match child.kind() {
            "except_clause" | "except_group_clause" => {
                let named = lw.useful_children(&child);
                // Shape: [filter?, block]; the filter is a bare type
                // expression or `Type as name` (an as_pattern).
                let body = named.iter().rev().find(|n| n.kind() == "block").cloned();
                let mut type_name = None;
                let mut variable = None;
                if let Some(filter) = named.first().filter(|n| n.kind() != "block") {
                    if filter.kind() == "as_pattern" {
                        let parts = lw.useful_children(filter);
                        type_name = parts.first().map(|n| lw.text(n));
                        variable = parts.get(1).map(|n| lw.text(n));
                    } else {
                        type_name = Some(lw.text(filter));
                    }
                }
                clauses.push(crate::engine::CatchClause {
                    body,
                    variable,
                    type_name,
                });
            }
            "else_clause" => {
                else_block = child.child_by_field_name("body").or(Some(child));
            }
            "finally_clause" => {
                finally_block = lw.useful_children(&child).into_iter().next_back().or(Some(child));
            }
            _ => {}
        }
    }
    lw.lower_try_catch(node, body.as_ref(), &clauses, else_block.as_ref(), finally_block.as_ref());
}

/// `with` lowers to `__enter__` calls up front and `__exit__` calls in
/// LIFO order after the body.
fn lower_with<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let body = node.child_by_field_name("body");
    let mut contexts: Vec<Reg> = Vec::new();
    for item in collect_with_items(lw, node) {
        let value = item.child_by_field_name("value").or_else(|| {
            lw.useful_children(&item).into_iter().next()
        });
        let Some(value) = value else { continue };
        let (ctx_node, alias) = if value.kind() == "as_pattern" {
            let named = lw.useful_children(&value);
            let ctx = named.first().cloned();
            let alias = named.get(1).map(|n| lw.text(n));
            (ctx, alias)
        } else {
            (Some(value), None)
        };
        let Some(ctx_node) = ctx_node else { continue };
        let ctx = lw.lower_expr(&ctx_node);
        let entered = lw.emit_call_method(&ctx_node, ctx, "__enter__", crate::ir::ArgRegs::new());
        if let Some(alias) = alias {
            lw.store_var_at(&ctx_node, alias, entered);
        }
        contexts.push(ctx);
    }
    if let Some(body) = body {
        lw.lower_block(&body);
    }
    for ctx in contexts.into_iter().rev() {
        let _ = lw.emit_call_method(node, ctx, "__exit__", crate::ir::ArgRegs::new());
    }
}

fn collect_with_items<N: TreeNode, T: LowerTracer>(lw: &Lowerer<N, T>, node: &N) -> Vec<N> {
    let mut items = Vec::new();
    for child in lw.useful_children(node) {
        match child.kind() {
            "with_clause" => {
                items.extend(lw.useful_children(&child).into_iter().filter(|c| c.kind() == "with_item"));
            }
            "with_item" => items.push(child),
            _ => {}
        }
    }
    items
}

/// `match`/`case` as an equality chain; `_` is the wildcard arm.
fn lower_match<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let subject = match node.child_by_field_name("subject") {
        Some(n) => lw.lower_expr(&n),
        None => lw.symbolic_at(node, "unknown_match_subject"),
    };
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut arms = Vec::new();
    for case in lw.useful_children(&body) {
        if case.kind() != "case_clause" {
            continue;
        }
        let consequence = case.child_by_field_name("consequence");
        let patterns: Vec<N> = lw
            .useful_children(&case)
            .into_iter()
            .filter(|c| c.kind() == "case_pattern")
            .collect();
        let is_default = patterns.iter().any(|p| lw.text(p) == "_");
        let values = if is_default {
            Vec::new()
        } else {
            patterns
                .iter()
                .filter_map(|p| lw.useful_children(p).into_iter().next().or_else(|| Some(p.clone())))
                .collect()
        };
        arms.push(SwitchArm {
            values,
            body: consequence.into_iter().collect(),
            is_default,
        });
    }
    lw.lower_switch_chain(node, subject, &arms, "==", "or");
}

/// `import a.b` binds the top-level module name.
fn lower_import<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    for name in lw.useful_children(node) {
        let (module_node, binding) = match name.kind() {
            "aliased_import" => {
                let inner = name.child_by_field_name("name");
                let alias = name.child_by_field_name("alias").map(|a| lw.text(&a));
                (inner, alias)
            }
            _ => (Some(name.clone()), None),
        };
        let Some(module_node) = module_node else { continue };
        let module = lw.text(&module_node);
        let binding = binding.unwrap_or_else(|| module.split('.').next().unwrap_or(&module).to_owned());
        let module_const = lw.const_at(&module_node, module);
        let imported = lw.emit_call_function1(&module_node, "import", module_const);
        lw.store_var_at(&module_node, binding, imported);
    }
}

/// `from m import a, b as c` binds each imported name.
fn lower_import_from<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let module_node = node.child_by_field_name("module_name");
    let module = module_node.as_ref().map_or_else(String::new, |n| lw.text(n));
    for name in lw.useful_children(node) {
        if module_node.as_ref().is_some_and(|m| m.start_byte() == name.start_byte()) {
            continue;
        }
        let (imported_name, binding) = match name.kind() {
            "dotted_name" | "identifier" => {
                let text = lw.text(&name);
                (text.clone(), text)
            }
            "aliased_import" => {
                let inner = name.child_by_field_name("name").map_or_else(String::new, |n| lw.text(&n));
                let alias = name.child_by_field_name("alias").map_or_else(|| inner.clone(), |a| lw.text(&a));
                (inner, alias)
            }
            _ => continue,
        };
        if imported_name.is_empty() {
            continue;
        }
        let qualified = if module.is_empty() {
            imported_name
        } else {
            format!("{module}.{imported_name}")
        };
        let module_const = lw.const_at(&name, qualified);
        let imported = lw.emit_call_function1(&name, "import", module_const);
        lw.store_var_at(&name, binding, imported);
    }
}

fn lower_assert<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let args = lw.lower_arg_children(node);
    let _ = lw.emit_call_function(node, "assert", args);
}

fn lower_delete<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) {
    let args = lw.lower_arg_children(node);
    let _ = lw.emit_call_function(node, "del", args);
}

fn lower_await<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let value = match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    };
    lw.emit_call_function1(node, "await", value)
}

fn lower_yield<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let args = lw.lower_arg_children(node);
    lw.emit_call_function(node, "yield", args)
}

/// `a[start:stop:step]` → `CALL_FUNCTION "slice"` with missing pieces
/// filled by the canonical null.
fn lower_slice<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let parts = lw.useful_children(node);
    let mut args = crate::ir::ArgRegs::new();
    for i in 0..3 {
        let reg = match parts.get(i) {
            Some(n) => lw.lower_expr(n),
            None => {
                let none = lw.profile.none_literal;
                lw.const_at(node, none)
            }
        };
        args.push(reg);
    }
    lw.emit_call_function(node, "slice", args)
}

fn lower_keyword_argument<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match node.child_by_field_name("value") {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

fn lower_interpolation<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    match lw.useful_children(node).into_iter().next() {
        Some(n) => lw.lower_expr(&n),
        None => {
            let none = lw.profile.none_literal;
            lw.const_at(node, none)
        }
    }
}

// ----------------------------------------------------------------------
// Comprehensions
// ----------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
enum CompKind {
    List,
    Set,
    Dict,
}

fn lower_list_comprehension<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lower_comprehension(lw, node, CompKind::List)
}

fn lower_set_comprehension<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lower_comprehension(lw, node, CompKind::Set)
}

fn lower_dict_comprehension<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    lower_comprehension(lw, node, CompKind::Dict)
}

/// Generators lower eagerly as a list wrapped in `CALL_FUNCTION
/// "generator"`; true suspension is out of scope.
fn lower_generator_expression<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N) -> Reg {
    let eager = lower_comprehension(lw, node, CompKind::List);
    lw.emit_call_function1(node, "generator", eager)
}

/// Builds the accumulator, then recursively lowers the generator clauses:
/// each `for_in_clause` becomes an indexed loop, each `if_clause` a filter
/// branch, and the innermost level appends/stores the element.
fn lower_comprehension<N: TreeNode, T: LowerTracer>(lw: &mut Lowerer<N, T>, node: &N, kind: CompKind) -> Reg {
    let result = match kind {
        CompKind::List => {
            let size = lw.const_at(node, "0");
            lw.emit_new_array(node, "list", size)
        }
        CompKind::Set => {
            let size = lw.const_at(node, "0");
            lw.emit_new_array(node, "set", size)
        }
        CompKind::Dict => lw.emit_new_object(node, "dict"),
    };
    let body = node.child_by_field_name("body");
    let clauses: Vec<N> = lw
        .useful_children(node)
        .into_iter()
        .filter(|c| matches!(c.kind(), "for_in_clause" | "if_clause"))
        .collect();
    lower_comp_clauses(lw, node, &clauses, body.as_ref(), result, kind);
    result
}

fn lower_comp_clauses<N: TreeNode, T: LowerTracer>(
    lw: &mut Lowerer<N, T>,
    node: &N,
    clauses: &[N],
    body: Option<&N>,
    result: Reg,
    kind: CompKind,
) {
    let Some((first, rest)) = clauses.split_first() else {
        match (kind, body) {
            (CompKind::Dict, Some(pair)) => {
                lw.lower_pair_into(pair, result);
            }
            (_, Some(elem)) => {
                let value = lw.lower_expr(elem);
                let method = if kind == CompKind::Set { "add" } else { "append" };
                let mut args = crate::ir::ArgRegs::new();
                args.push(value);
                let _ = lw.emit_call_method(elem, result, method, args);
            }
            (_, None) => {}
        }
        return;
    };
    if first.kind() == "for_in_clause" {
        let left = first.child_by_field_name("left");
        let right = first.child_by_field_name("right");
        let iter = match right {
            Some(n) => lw.lower_expr(&n),
            None => lw.symbolic_at(first, "unknown_iterable"),
        };
        lw.lower_foreach_with(first, iter, left.as_ref(), |lw| {
            lower_comp_clauses(lw, node, rest, body, result, kind);
        });
    } else {
        let cond = match lw.useful_children(first).into_iter().next() {
            Some(n) => lw.lower_expr(&n),
            None => {
                let t = lw.profile.true_literal;
                lw.const_at(first, t)
            }
        };
        let keep_label = lw.fresh_label("comp_keep");
        let skip_label = lw.fresh_label("comp_skip");
        lw.branch_if_at(first, cond, &keep_label, &skip_label);
        lw.label_at(first, &keep_label);
        lower_comp_clauses(lw, node, rest, body, result, kind);
        lw.branch_at(first, &skip_label);
        lw.label_at(first, &skip_label);
    }
}
