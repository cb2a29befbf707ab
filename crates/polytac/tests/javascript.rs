//! JavaScript and TypeScript behavior: arrows, template strings, `new`,
//! for-in/of, strict-equality switch, spread, and the TypeScript
//! type-surface stripping and reification.

mod common;

use common::{leaf, lower, node, token};
use polytac::{Language, Opcode};
use pretty_assertions::assert_eq;

#[test]
fn arrow_function_scaffolds_with_synthetic_name() {
    // const f = (x) => x + 1;
    let insts = lower(
        Language::JavaScript,
        node("program").child(
            node("lexical_declaration").child(
                node("variable_declarator")
                    .field("name", leaf("identifier", "f"))
                    .field(
                        "value",
                        node("arrow_function")
                            .field("parameters", node("formal_parameters").child(leaf("identifier", "x")))
                            .field(
                                "body",
                                node("binary_expression")
                                    .field("left", leaf("identifier", "x"))
                                    .field("operator", token("+"))
                                    .field("right", leaf("number", "1")),
                            ),
                    ),
            ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(rendered.contains("func___arrow_0"), "{rendered}");
    common::assert_has(&insts, Opcode::Symbolic, &["param:x"]);
    // The expression body returns its value ahead of the implicit return.
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::Return).count(), 2);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "f"));
}

#[test]
fn template_string_folds_into_concat_chain() {
    // `a${x}b`
    let insts = lower(
        Language::JavaScript,
        node("program").child(
            node("expression_statement").child(
                node("template_string")
                    .child(leaf("string_fragment", "a"))
                    .child(node("template_substitution").child(leaf("identifier", "x")))
                    .child(leaf("string_fragment", "b")),
            ),
        ),
    );
    let pluses = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::Binop && i.operands()[0] == "+")
        .count();
    assert_eq!(pluses, 2);
    common::assert_has(&insts, Opcode::LoadVar, &["x"]);
}

#[test]
fn new_expression_allocates_and_calls_constructor() {
    let insts = lower(
        Language::JavaScript,
        node("program").child(
            node("expression_statement").child(
                node("new_expression")
                    .field("constructor", leaf("identifier", "Foo"))
                    .field("arguments", node("arguments").child(leaf("number", "1"))),
            ),
        ),
    );
    common::assert_has(&insts, Opcode::NewObject, &["Foo"]);
    let ctor = common::find_op(&insts, Opcode::CallMethod).expect("constructor call");
    assert_eq!(ctor.operands()[1], "constructor");
}

#[test]
fn for_in_iterates_keys_for_of_iterates_values() {
    let loop_of = |keyword: &str| {
        node("program").child(
            node("for_in_statement")
                .field("left", leaf("identifier", "v"))
                .child(token(keyword))
                .field("right", leaf("identifier", "obj"))
                .field("body", node("statement_block")),
        )
    };
    let for_in = lower(Language::JavaScript, loop_of("in"));
    assert!(
        for_in
            .iter()
            .any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "keys")
    );
    let for_of = lower(Language::JavaScript, loop_of("of"));
    assert!(
        !for_of
            .iter()
            .any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "keys")
    );
    // Both desugar to the indexed loop.
    assert!(common::labels(&for_of).iter().any(|l| l.starts_with("foreach_cond")));
}

#[test]
fn switch_compares_strictly() {
    let insts = lower(
        Language::JavaScript,
        node("program").child(
            node("switch_statement")
                .field("value", leaf("identifier", "x"))
                .field(
                    "body",
                    node("switch_body")
                        .child(
                            node("switch_case")
                                .field("value", leaf("number", "1"))
                                .child(node("expression_statement").child(leaf("identifier", "a"))),
                        )
                        .child(node("switch_default").child(node("expression_statement").child(leaf("identifier", "b")))),
                ),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::Binop && i.operands()[0] == "==="));
}

#[test]
fn spread_degrades_to_helper_call() {
    let insts = lower(
        Language::JavaScript,
        node("program").child(
            node("expression_statement").child(
                node("call_expression")
                    .field("function", leaf("identifier", "f"))
                    .field(
                        "arguments",
                        node("arguments").child(node("spread_element").child(leaf("identifier", "xs"))),
                    ),
            ),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "spread"));
}

#[test]
fn typescript_type_surface_is_transparent() {
    // (x as Foo)!
    let insts = lower(
        Language::TypeScript,
        node("program").child(
            node("expression_statement").child(
                node("non_null_expression").child(
                    node("as_expression")
                        .child(leaf("identifier", "x"))
                        .child(leaf("type_identifier", "Foo")),
                ),
            ),
        ),
    );
    let loads: Vec<_> = insts.iter().filter(|i| i.opcode() == Opcode::LoadVar).collect();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].operands(), ["x"]);
    assert!(!insts.iter().any(|i| i.opcode() == Opcode::Symbolic));
}

#[test]
fn typescript_interface_reifies_with_indexed_members() {
    let insts = lower(
        Language::TypeScript,
        node("program").child(
            node("interface_declaration")
                .field("name", leaf("type_identifier", "Shape"))
                .field(
                    "body",
                    node("interface_body")
                        .child(node("property_signature").field("name", leaf("property_identifier", "area")))
                        .child(node("property_signature").field("name", leaf("property_identifier", "name"))),
                ),
        ),
    );
    common::assert_has(&insts, Opcode::NewObject, &["interface:Shape"]);
    common::assert_has(&insts, Opcode::Const, &["0"]);
    common::assert_has(&insts, Opcode::Const, &["area"]);
    common::assert_has(&insts, Opcode::Const, &["1"]);
    common::assert_has(&insts, Opcode::Const, &["name"]);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "Shape"));
}

#[test]
fn typescript_enum_reifies_with_ordinals() {
    let insts = lower(
        Language::TypeScript,
        node("program").child(
            node("enum_declaration")
                .field("name", leaf("identifier", "Color"))
                .field(
                    "body",
                    node("enum_body")
                        .child(leaf("property_identifier", "Red"))
                        .child(leaf("property_identifier", "Green")),
                ),
        ),
    );
    common::assert_has(&insts, Opcode::NewObject, &["enum:Color"]);
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::StoreIndex).count(), 2);
    common::assert_has(&insts, Opcode::Const, &["Red"]);
    common::assert_has(&insts, Opcode::Const, &["Green"]);
}

#[test]
fn typescript_export_lowers_inner_declaration() {
    let insts = lower(
        Language::TypeScript,
        node("program").child(
            node("export_statement").child(
                node("lexical_declaration").child(
                    node("variable_declarator")
                        .field("name", leaf("identifier", "x"))
                        .field("value", leaf("number", "1")),
                ),
            ),
        ),
    );
    common::assert_has(&insts, Opcode::Const, &["1"]);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "x"));
}
