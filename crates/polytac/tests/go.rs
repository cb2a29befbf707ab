//! Go behavior beyond the hoisting scenario: multi-value returns, the
//! range loop, goroutine/defer wrappers, channel sends, select, and
//! composite literals.

mod common;

use common::{leaf, lower, node, token};
use polytac::{Instruction, Language, Opcode};
use pretty_assertions::assert_eq;

fn func(name: &str, body: common::Builder) -> common::Builder {
    node("function_declaration")
        .field("name", leaf("identifier", name))
        .field("parameters", node("parameter_list"))
        .field("body", body)
}

#[test]
fn multi_value_return_emits_sequential_returns() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "pair",
            node("block").child(
                node("return_statement").child(
                    node("expression_list")
                        .child(leaf("int_literal", "1"))
                        .child(leaf("int_literal", "2")),
                ),
            ),
        )),
    );
    // Two explicit returns plus the implicit one.
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::Return).count(), 3);
    common::assert_has(&insts, Opcode::Const, &["1"]);
    common::assert_has(&insts, Opcode::Const, &["2"]);
}

#[test]
fn range_with_two_targets_binds_index_and_value() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(
                node("for_statement")
                    .child(
                        node("range_clause")
                            .field(
                                "left",
                                node("expression_list")
                                    .child(leaf("identifier", "i"))
                                    .child(leaf("identifier", "v")),
                            )
                            .field("right", leaf("identifier", "xs")),
                    )
                    .field("body", node("block")),
            ),
        )),
    );
    let rendered = polytac::render(&insts);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "i"), "{rendered}");
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "v"), "{rendered}");
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "len"), "{rendered}");
    assert!(common::find_op(&insts, Opcode::LoadIndex).is_some(), "{rendered}");
}

#[test]
fn go_and_defer_wrap_their_call() {
    let call = |name: &str| {
        node("call_expression")
            .field("function", leaf("identifier", name))
            .field("arguments", node("argument_list"))
    };
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block")
                .child(node("go_statement").child(call("worker")))
                .child(node("defer_statement").child(call("cleanup"))),
        )),
    );
    let calls: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::CallFunction)
        .map(|i| i.operands()[0].clone())
        .collect();
    assert_eq!(calls, ["worker", "go", "cleanup", "defer"]);
}

#[test]
fn channel_send_is_named_call() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(
                node("send_statement")
                    .field("channel", leaf("identifier", "ch"))
                    .field("value", leaf("int_literal", "1")),
            ),
        )),
    );
    let send = insts
        .iter()
        .find(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "chan_send")
        .expect("chan_send");
    assert_eq!(send.operands().len(), 3);
}

#[test]
fn select_cases_branch_to_shared_end() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(
                node("select_statement")
                    .child(node("communication_case").child(node("expression_statement").child(leaf("identifier", "a"))))
                    .child(node("default_case").child(node("expression_statement").child(leaf("identifier", "b")))),
            ),
        )),
    );
    let end = common::labels(&insts)
        .into_iter()
        .find(|l| l.starts_with("select_end"))
        .expect("select end");
    let to_end = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::Branch && i.operands() == [end.clone()])
        .count();
    assert_eq!(to_end, 2);
}

#[test]
fn composite_literal_stores_fields_and_positions() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(
                node("short_var_declaration")
                    .field("left", node("expression_list").child(leaf("identifier", "p")))
                    .field(
                        "right",
                        node("expression_list").child(
                            node("composite_literal")
                                .field("type", leaf("type_identifier", "Point"))
                                .field(
                                    "body",
                                    node("literal_value")
                                        .child(
                                            node("keyed_element")
                                                .child(leaf("field_identifier", "X"))
                                                .child(node("literal_element").child(leaf("int_literal", "1"))),
                                        )
                                        .child(node("literal_element").child(leaf("int_literal", "2"))),
                                ),
                        ),
                    ),
            ),
        )),
    );
    common::assert_has(&insts, Opcode::NewObject, &["Point"]);
    let field_store = common::find_op(&insts, Opcode::StoreField).expect("keyed element");
    assert_eq!(field_store.operands()[1], "X");
    assert!(common::find_op(&insts, Opcode::StoreIndex).is_some());
}

#[test]
fn type_assertion_is_named_call() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(
                node("expression_statement").child(
                    node("type_assertion_expression")
                        .field("operand", leaf("identifier", "x"))
                        .field("type", leaf("type_identifier", "string")),
                ),
            ),
        )),
    );
    let assert_call = insts
        .iter()
        .find(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "type_assert")
        .expect("type_assert");
    assert_eq!(assert_call.operands().len(), 3);
    common::assert_has(&insts, Opcode::Const, &["string"]);
}

#[test]
fn bare_for_is_infinite_while() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(node("for_statement").field("body", node("block").child(node("break_statement")))),
        )),
    );
    let rendered = polytac::render(&insts);
    common::assert_has(&insts, Opcode::Const, &["True"]);
    let end = common::labels(&insts)
        .into_iter()
        .find(|l| l.starts_with("while_end"))
        .expect("loop end");
    assert!(
        insts.iter().any(|i| i.opcode() == Opcode::Branch && i.operands() == [end.clone()]),
        "break must target the loop end:\n{rendered}"
    );
}

#[test]
fn keyed_element_with_expression_key_stores_by_index() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(
                node("expression_statement").child(
                    node("composite_literal")
                        .field("type", leaf("type_identifier", "map[string]int"))
                        .field(
                            "body",
                            node("literal_value").child(
                                node("keyed_element")
                                    .child(node("literal_element").child(leaf("interpreted_string_literal", "\"k\"")))
                                    .child(node("literal_element").child(leaf("int_literal", "3"))),
                            ),
                        ),
                ),
            ),
        )),
    );
    let store: Vec<&Instruction> = insts.iter().filter(|i| i.opcode() == Opcode::StoreIndex).collect();
    assert_eq!(store.len(), 1);
    common::assert_has(&insts, Opcode::Const, &["\"k\""]);
}

#[test]
fn inc_statement_updates_in_place() {
    let insts = lower(
        Language::Go,
        node("source_file").child(func(
            "main",
            node("block").child(node("inc_statement").child(leaf("identifier", "n")).child(token("++"))),
        )),
    );
    common::assert_has(&insts, Opcode::Const, &["1"]);
    let update = common::find_op(&insts, Opcode::Binop).expect("increment");
    assert_eq!(update.operands()[0], "+");
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "n"));
}
