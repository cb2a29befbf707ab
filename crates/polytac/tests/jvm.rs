//! Java, Kotlin, and Scala behavior: receiver-in-field method calls,
//! enhanced for, method-first class bodies, `when`/elvis/`!!`, expression
//! blocks, and for-comprehension cursors.

mod common;

use common::{leaf, lower, node, token};
use polytac::{Language, Opcode};
use pretty_assertions::assert_eq;

#[test]
fn java_method_invocation_dispatches_on_receiver() {
    let insts = lower(
        Language::Java,
        node("program")
            .child(
                node("expression_statement").child(
                    node("method_invocation")
                        .field("object", leaf("identifier", "list"))
                        .field("name", leaf("identifier", "add"))
                        .field("arguments", node("argument_list").child(leaf("decimal_integer_literal", "1"))),
                ),
            )
            .child(
                node("expression_statement").child(
                    node("method_invocation")
                        .field("name", leaf("identifier", "helper"))
                        .field("arguments", node("argument_list")),
                ),
            ),
    );
    let method = common::find_op(&insts, Opcode::CallMethod).expect("method call");
    assert_eq!(method.operands()[1], "add");
    let function = common::find_op(&insts, Opcode::CallFunction).expect("static call");
    assert_eq!(function.operands()[0], "helper");
}

#[test]
fn java_enhanced_for_desugars_to_index_loop() {
    let insts = lower(
        Language::Java,
        node("program").child(
            node("enhanced_for_statement")
                .field("name", leaf("identifier", "item"))
                .field("value", leaf("identifier", "items"))
                .field("body", node("block")),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "len"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "item"));
    assert!(common::labels(&insts).iter().any(|l| l.starts_with("foreach_cond")));
}

#[test]
fn java_class_lowers_methods_before_fields() {
    let insts = lower(
        Language::Java,
        node("program").child(
            node("class_declaration")
                .field("name", leaf("identifier", "Box"))
                .field(
                    "body",
                    node("class_body")
                        .child(
                            node("field_declaration").child(
                                node("variable_declarator")
                                    .field("name", leaf("identifier", "size"))
                                    .field("value", leaf("decimal_integer_literal", "0")),
                            ),
                        )
                        .child(
                            node("method_declaration")
                                .field("name", leaf("identifier", "get"))
                                .field("parameters", node("formal_parameters"))
                                .field("body", node("block")),
                        ),
                ),
        ),
    );
    let get_pos = insts
        .iter()
        .position(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "get")
        .expect("method store");
    let size_pos = insts
        .iter()
        .position(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "size")
        .expect("field store");
    assert!(get_pos < size_pos, "{}", polytac::render(&insts));
    assert!(polytac::render(&insts).contains("class_Box_"));
}

#[test]
fn java_instanceof_and_cast() {
    let insts = lower(
        Language::Java,
        node("program").child(
            node("expression_statement").child(
                node("instanceof_expression")
                    .field("left", leaf("identifier", "x"))
                    .field("right", leaf("type_identifier", "String")),
            ),
        ),
    );
    let call = common::find_op(&insts, Opcode::CallFunction).expect("instanceof");
    assert_eq!(call.operands()[0], "instanceof");
    common::assert_has(&insts, Opcode::Const, &["String"]);
}

#[test]
fn kotlin_when_merges_through_phi() {
    let insts = lower(
        Language::Kotlin,
        node("source_file").child(
            node("property_declaration")
                .child(node("variable_declaration").child(leaf("simple_identifier", "label")))
                .child(
                    node("when_expression")
                        .child(node("when_subject").child(leaf("simple_identifier", "x")))
                        .child(
                            node("when_entry")
                                .child(node("when_condition").child(leaf("integer_literal", "1")))
                                .child(node("control_structure_body").child(leaf("string_literal", "\"one\""))),
                        )
                        .child(
                            node("when_entry")
                                .child(node("control_structure_body").child(leaf("string_literal", "\"other\""))),
                        ),
                ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(
        insts
            .iter()
            .any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0].starts_with("__when_result")),
        "{rendered}"
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "label"), "{rendered}");
    assert!(insts.iter().any(|i| i.opcode() == Opcode::Binop && i.operands()[0] == "=="), "{rendered}");
}

#[test]
fn kotlin_elvis_and_not_null_assertion() {
    let insts = lower(
        Language::Kotlin,
        node("source_file")
            .child(
                node("elvis_expression")
                    .child(leaf("simple_identifier", "a"))
                    .child(leaf("simple_identifier", "b")),
            )
            .child(node("postfix_expression").child(leaf("simple_identifier", "c")).child(token("!!"))),
    );
    let elvis = common::find_op(&insts, Opcode::Binop).expect("elvis");
    assert_eq!(elvis.operands()[0], "?:");
    let bang = common::find_op(&insts, Opcode::Unop).expect("not-null assertion");
    assert_eq!(bang.operands()[0], "!!");
}

#[test]
fn kotlin_expression_function_body_returns_value() {
    // fun twice(x: Int) = x + x
    let insts = lower(
        Language::Kotlin,
        node("source_file").child(
            node("function_declaration")
                .child(leaf("simple_identifier", "twice"))
                .child(
                    node("function_value_parameters")
                        .child(node("parameter").field("name", leaf("simple_identifier", "x"))),
                )
                .child(
                    node("function_body").child(
                        node("additive_expression")
                            .field("left", leaf("simple_identifier", "x"))
                            .field("operator", token("+"))
                            .field("right", leaf("simple_identifier", "x")),
                    ),
                ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(rendered.contains("func_twice_"), "{rendered}");
    common::assert_has(&insts, Opcode::Symbolic, &["param:x"]);
    // Explicit return of the expression body plus the implicit one.
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::Return).count(), 2);
}

#[test]
fn scala_block_yields_last_expression() {
    // val r = { f(); x }
    let insts = lower(
        Language::Scala,
        node("compilation_unit").child(
            node("val_definition")
                .field("pattern", leaf("identifier", "r"))
                .field(
                    "value",
                    node("block")
                        .child(
                            node("call_expression")
                                .field("function", leaf("identifier", "f"))
                                .field("arguments", node("arguments")),
                        )
                        .child(leaf("identifier", "x")),
                ),
        ),
    );
    let store = insts
        .iter()
        .find(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "r")
        .expect("store r");
    let last_load = insts
        .iter()
        .find(|i| i.opcode() == Opcode::LoadVar && i.operands()[0] == "x")
        .expect("load x");
    assert_eq!(store.operands()[1], last_load.result_reg().unwrap().to_string());
}

#[test]
fn scala_for_comprehension_uses_cursor_calls() {
    // for (x <- xs if x) body
    let insts = lower(
        Language::Scala,
        node("compilation_unit").child(
            node("for_expression")
                .field(
                    "enumerators",
                    node("enumerators")
                        .child(
                            node("generator")
                                .child(leaf("identifier", "x"))
                                .child(leaf("identifier", "xs")),
                        )
                        .child(node("guard").child(leaf("identifier", "x"))),
                )
                .field(
                    "body",
                    node("block").child(
                        node("call_expression")
                            .field("function", leaf("identifier", "body"))
                            .field("arguments", node("arguments")),
                    ),
                ),
        ),
    );
    let calls: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::CallFunction)
        .map(|i| i.operands()[0].clone())
        .collect();
    assert!(calls.contains(&"iter".to_owned()), "{calls:?}");
    assert!(calls.contains(&"has_next".to_owned()), "{calls:?}");
    assert!(calls.contains(&"next".to_owned()), "{calls:?}");
    assert!(common::labels(&insts).iter().any(|l| l.starts_with("guard_keep")));
}

#[test]
fn scala_match_with_wildcard() {
    let insts = lower(
        Language::Scala,
        node("compilation_unit").child(
            node("match_expression")
                .field("value", leaf("identifier", "x"))
                .field(
                    "body",
                    node("case_block")
                        .child(
                            node("case_clause")
                                .field("pattern", leaf("integer_literal", "1"))
                                .field("body", leaf("string", "\"one\"")),
                        )
                        .child(
                            node("case_clause")
                                .field("pattern", leaf("wildcard", "_"))
                                .field("body", leaf("string", "\"other\"")),
                        ),
                ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(
        insts
            .iter()
            .any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0].starts_with("__match_result")),
        "{rendered}"
    );
    assert_eq!(
        insts.iter().filter(|i| i.opcode() == Opcode::BranchIf).count(),
        1,
        "wildcard arm must branch unconditionally:\n{rendered}"
    );
}

#[test]
fn scala_implicit_return_is_unit() {
    let insts = lower(
        Language::Scala,
        node("compilation_unit").child(
            node("function_definition")
                .field("name", leaf("identifier", "run"))
                .field("parameters", node("parameters"))
                .field("body", node("block")),
        ),
    );
    common::assert_has(&insts, Opcode::Const, &["()"]);
}
