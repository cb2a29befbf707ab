//! Rust behavior: match phi merging, `?`/`.await`/`as` as named calls,
//! struct expressions, impl containers, and pattern destructuring.

mod common;

use common::{leaf, lower, node};
use polytac::{Language, Opcode};
use pretty_assertions::assert_eq;

#[test]
fn match_expression_merges_through_phi() {
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("expression_statement").child(
                node("match_expression")
                    .field("value", leaf("identifier", "x"))
                    .field(
                        "body",
                        node("match_block")
                            .child(
                                node("match_arm")
                                    .field("pattern", node("match_pattern").child(leaf("integer_literal", "1")))
                                    .field("value", leaf("integer_literal", "10")),
                            )
                            .child(
                                node("match_arm")
                                    .field("pattern", node("match_pattern").child(leaf("identifier", "_")))
                                    .field("value", leaf("integer_literal", "0")),
                            ),
                    ),
            ),
        ),
    );
    let rendered = polytac::render(&insts);
    let phi_stores = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::StoreVar && i.operands()[0].starts_with("__match_result"))
        .count();
    // Initial binding plus one store per arm.
    assert_eq!(phi_stores, 3, "{rendered}");
    assert_eq!(
        insts.iter().filter(|i| i.opcode() == Opcode::BranchIf).count(),
        1,
        "wildcard arm must not compare:\n{rendered}"
    );
}

#[test]
fn question_mark_await_and_as_are_named_calls() {
    let insts = lower(
        Language::Rust,
        node("source_file")
            .child(
                node("expression_statement")
                    .child(node("try_expression").child(leaf("identifier", "res"))),
            )
            .child(
                node("expression_statement")
                    .child(node("await_expression").child(leaf("identifier", "fut"))),
            )
            .child(
                node("expression_statement").child(
                    node("type_cast_expression")
                        .field("value", leaf("identifier", "n"))
                        .field("type", leaf("primitive_type", "u64")),
                ),
            ),
    );
    let names: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::CallFunction)
        .map(|i| i.operands()[0].clone())
        .collect();
    assert_eq!(names, ["try_unwrap", "await", "as"]);
    common::assert_has(&insts, Opcode::Const, &["u64"]);
}

#[test]
fn struct_expression_with_shorthand_fields() {
    // Point { x: 1, y }
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("expression_statement").child(
                node("struct_expression")
                    .field("name", leaf("type_identifier", "Point"))
                    .field(
                        "body",
                        node("field_initializer_list")
                            .child(
                                node("field_initializer")
                                    .field("field", leaf("field_identifier", "x"))
                                    .field("value", leaf("integer_literal", "1")),
                            )
                            .child(leaf("shorthand_field_initializer", "y")),
                    ),
            ),
        ),
    );
    common::assert_has(&insts, Opcode::NewObject, &["Point"]);
    let fields: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::StoreField)
        .map(|i| i.operands()[1].clone())
        .collect();
    assert_eq!(fields, ["x", "y"]);
    // Shorthand reads the same-named variable.
    common::assert_has(&insts, Opcode::LoadVar, &["y"]);
}

#[test]
fn impl_block_is_class_shaped() {
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("impl_item")
                .field("type", leaf("type_identifier", "Point"))
                .field(
                    "body",
                    node("declaration_list").child(
                        node("function_item")
                            .field("name", leaf("identifier", "norm"))
                            .field("parameters", node("parameters").child(leaf("self", "self")))
                            .field("body", node("block")),
                    ),
                ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(rendered.contains("class_Point_"), "{rendered}");
    assert!(rendered.contains("func_norm_"), "{rendered}");
    common::assert_has(&insts, Opcode::Symbolic, &["param:self"]);
    common::assert_has(&insts, Opcode::Const, &["<class:Point@class_Point_1>"]);
}

#[test]
fn tuple_pattern_let_destructures() {
    // let (a, b) = pair;
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("let_declaration")
                .field(
                    "pattern",
                    node("tuple_pattern")
                        .child(leaf("identifier", "a"))
                        .child(leaf("identifier", "b")),
                )
                .field("value", leaf("identifier", "pair")),
        ),
    );
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::LoadIndex).count(), 2);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "a"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "b"));
}

#[test]
fn mut_pattern_unwraps_to_name() {
    // let mut count = 0;
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("let_declaration")
                .field("pattern", node("mut_pattern").child(leaf("identifier", "count")))
                .field("value", leaf("integer_literal", "0")),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "count"));
}

#[test]
fn macros_call_with_bang_suffix() {
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("expression_statement").child(
                node("macro_invocation")
                    .field("macro", leaf("identifier", "println"))
                    .child(node("token_tree")),
            ),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "println!"));
}

#[test]
fn ranges_stay_symbolic() {
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("expression_statement").child(
                node("range_expression")
                    .child(leaf("integer_literal", "0"))
                    .child(leaf("integer_literal", "10")),
            ),
        ),
    );
    common::assert_has(&insts, Opcode::Symbolic, &["range"]);
}

#[test]
fn references_and_dereferences_are_unops() {
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("expression_statement").child(
                node("reference_expression").field("value", leaf("identifier", "x")),
            ),
        ),
    );
    let unop = common::find_op(&insts, Opcode::Unop).expect("reference");
    assert_eq!(unop.operands()[0], "&");
}

#[test]
fn implicit_return_is_unit() {
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("function_item")
                .field("name", leaf("identifier", "noop"))
                .field("parameters", node("parameters"))
                .field("body", node("block")),
        ),
    );
    common::assert_has(&insts, Opcode::Const, &["()"]);
}
