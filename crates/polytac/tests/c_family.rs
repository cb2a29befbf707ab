//! C, C++, and C# behavior: pointer traffic through the `"*"` sentinel
//! field, goto labels, enum objects, C++ operators and constructor
//! initializers, and the C# class conventions.

mod common;

use common::{leaf, lower, node, token};
use polytac::{Language, Opcode};
use pretty_assertions::assert_eq;

#[test]
fn c_pointer_dereference_reads_and_writes_sentinel_field() {
    // *p = *q;
    let insts = lower(
        Language::C,
        node("translation_unit").child(
            node("expression_statement").child(
                node("assignment_expression")
                    .field(
                        "left",
                        node("pointer_expression")
                            .field("operator", token("*"))
                            .field("argument", leaf("identifier", "p")),
                    )
                    .field("operator", token("="))
                    .field(
                        "right",
                        node("pointer_expression")
                            .field("operator", token("*"))
                            .field("argument", leaf("identifier", "q")),
                    ),
            ),
        ),
    );
    let load = common::find_op(&insts, Opcode::LoadField).expect("deref load");
    assert_eq!(load.operands()[1], "*");
    let store = common::find_op(&insts, Opcode::StoreField).expect("deref store");
    assert_eq!(store.operands()[1], "*");
}

#[test]
fn c_address_of_is_unary_borrow() {
    let insts = lower(
        Language::C,
        node("translation_unit").child(
            node("expression_statement").child(
                node("pointer_expression")
                    .field("operator", token("&"))
                    .field("argument", leaf("identifier", "x")),
            ),
        ),
    );
    let unop = common::find_op(&insts, Opcode::Unop).expect("address-of");
    assert_eq!(unop.operands()[0], "&");
}

#[test]
fn c_goto_and_label_use_user_prefix() {
    let insts = lower(
        Language::C,
        node("translation_unit")
            .child(
                node("labeled_statement")
                    .field("label", leaf("statement_identifier", "retry"))
                    .child(node("expression_statement").child(leaf("identifier", "x"))),
            )
            .child(node("goto_statement").field("label", leaf("statement_identifier", "retry"))),
    );
    assert!(common::labels(&insts).contains(&"user_retry".to_owned()));
    common::assert_has(&insts, Opcode::Branch, &["user_retry"]);
}

#[test]
fn c_enum_members_store_on_enum_object() {
    let insts = lower(
        Language::C,
        node("translation_unit").child(
            node("enum_specifier")
                .field("name", leaf("type_identifier", "Color"))
                .field(
                    "body",
                    node("enumerator_list")
                        .child(node("enumerator").field("name", leaf("identifier", "RED")))
                        .child(
                            node("enumerator")
                                .field("name", leaf("identifier", "BLUE"))
                                .field("value", leaf("number_literal", "5")),
                        ),
                ),
        ),
    );
    common::assert_has(&insts, Opcode::NewObject, &["enum:Color"]);
    let fields: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::StoreField)
        .map(|i| i.operands()[1].clone())
        .collect();
    assert_eq!(fields, ["RED", "BLUE"]);
    common::assert_has(&insts, Opcode::Const, &["5"]);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "Color"));
}

#[test]
fn c_sizeof_is_named_call() {
    let insts = lower(
        Language::C,
        node("translation_unit").child(
            node("expression_statement")
                .child(node("sizeof_expression").field("value", leaf("identifier", "buf"))),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "sizeof"));
}

#[test]
fn c_function_name_digs_through_declarators() {
    // int *f(int a) { return a; }
    let insts = lower(
        Language::C,
        node("translation_unit").child(
            node("function_definition")
                .field(
                    "declarator",
                    node("pointer_declarator").field(
                        "declarator",
                        node("function_declarator")
                            .field("declarator", leaf("identifier", "f"))
                            .field(
                                "parameters",
                                node("parameter_list").child(
                                    node("parameter_declaration")
                                        .child(leaf("primitive_type", "int"))
                                        .field("declarator", leaf("identifier", "a")),
                                ),
                            ),
                    ),
                )
                .field(
                    "body",
                    node("compound_statement").child(node("return_statement").child(leaf("identifier", "a"))),
                ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(rendered.contains("func_f_"), "{rendered}");
    common::assert_has(&insts, Opcode::Symbolic, &["param:a"]);
    // C implicit return is 0.
    common::assert_has(&insts, Opcode::Const, &["0"]);
}

#[test]
fn cpp_condition_clause_unwraps() {
    let insts = lower(
        Language::Cpp,
        node("translation_unit").child(
            node("if_statement")
                .field("condition", node("condition_clause").field("value", leaf("identifier", "ok")))
                .field("consequence", node("compound_statement")),
        ),
    );
    common::assert_has(&insts, Opcode::LoadVar, &["ok"]);
    assert!(common::find_op(&insts, Opcode::BranchIf).is_some());
}

#[test]
fn cpp_new_and_delete_are_named_calls() {
    let insts = lower(
        Language::Cpp,
        node("translation_unit")
            .child(
                node("expression_statement").child(
                    node("new_expression")
                        .field("type", leaf("type_identifier", "Widget"))
                        .field("arguments", node("argument_list").child(leaf("number_literal", "1"))),
                ),
            )
            .child(
                node("expression_statement")
                    .child(node("delete_expression").child(leaf("identifier", "p"))),
            ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "Widget"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "delete"));
}

#[test]
fn cpp_qualified_name_is_single_load() {
    let insts = lower(
        Language::Cpp,
        node("translation_unit").child(
            node("expression_statement").child(leaf("qualified_identifier", "std::vector::size")),
        ),
    );
    common::assert_has(&insts, Opcode::LoadVar, &["std::vector::size"]);
}

#[test]
fn cpp_constructor_field_initializers_store_on_this() {
    // Point(int x) : x_(x) {}
    let insts = lower(
        Language::Cpp,
        node("translation_unit").child(
            node("function_definition")
                .field(
                    "declarator",
                    node("function_declarator")
                        .field("declarator", leaf("identifier", "Point"))
                        .field(
                            "parameters",
                            node("parameter_list").child(
                                node("parameter_declaration")
                                    .child(leaf("primitive_type", "int"))
                                    .field("declarator", leaf("identifier", "x")),
                            ),
                        ),
                )
                .child(
                    node("field_initializer_list").child(
                        node("field_initializer")
                            .child(leaf("field_identifier", "x_"))
                            .child(node("argument_list").child(leaf("identifier", "x"))),
                    ),
                )
                .field("body", node("compound_statement")),
        ),
    );
    let rendered = polytac::render(&insts);
    common::assert_has(&insts, Opcode::LoadVar, &["this"]);
    let store = common::find_op(&insts, Opcode::StoreField).expect("member init");
    assert_eq!(store.operands()[1], "x_", "{rendered}");
    // Initializers land between the parameters and the body.
    let param_pos = insts
        .iter()
        .position(|i| i.opcode() == Opcode::Symbolic && i.operands() == ["param:x"])
        .unwrap();
    let store_pos = insts.iter().position(|i| i.opcode() == Opcode::StoreField).unwrap();
    assert!(param_pos < store_pos, "{rendered}");
}

#[test]
fn csharp_property_stores_on_this() {
    let insts = lower(
        Language::CSharp,
        node("compilation_unit").child(
            node("class_declaration")
                .field("name", leaf("identifier", "Point"))
                .field(
                    "body",
                    node("declaration_list").child(
                        node("property_declaration")
                            .field("name", leaf("identifier", "X"))
                            .field("value", leaf("integer_literal", "3")),
                    ),
                ),
        ),
    );
    common::assert_has(&insts, Opcode::LoadVar, &["this"]);
    let store = common::find_op(&insts, Opcode::StoreField).expect("property store");
    assert_eq!(store.operands()[1], "X");
}

#[test]
fn csharp_constructor_lowers_as_init() {
    let insts = lower(
        Language::CSharp,
        node("compilation_unit").child(
            node("class_declaration")
                .field("name", leaf("identifier", "Point"))
                .field(
                    "body",
                    node("declaration_list").child(
                        node("constructor_declaration")
                            .field("name", leaf("identifier", "Point"))
                            .field("parameters", node("parameter_list"))
                            .field("body", node("block")),
                    ),
                ),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "__init__"));
    assert!(polytac::render(&insts).contains("func___init___"));
}

#[test]
fn csharp_switch_expression_merges_through_phi() {
    let insts = lower(
        Language::CSharp,
        node("compilation_unit").child(
            node("expression_statement").child(
                node("switch_expression")
                    .child(leaf("identifier", "x"))
                    .child(
                        node("switch_expression_arm")
                            .child(leaf("integer_literal", "1"))
                            .child(leaf("string_literal", "\"one\"")),
                    )
                    .child(
                        node("switch_expression_arm")
                            .child(leaf("identifier", "_"))
                            .child(leaf("string_literal", "\"other\"")),
                    ),
            ),
        ),
    );
    let rendered = polytac::render(&insts);
    let stores = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::StoreVar && i.operands()[0].starts_with("__switch_result"))
        .count();
    // Initial null binding plus one store per arm.
    assert_eq!(stores, 3, "{rendered}");
    assert_eq!(insts.last().unwrap().opcode(), Opcode::LoadVar, "{rendered}");
}

#[test]
fn csharp_conditional_access_reads_field() {
    let insts = lower(
        Language::CSharp,
        node("compilation_unit").child(
            node("expression_statement").child(
                node("conditional_access_expression")
                    .child(leaf("identifier", "obj"))
                    .child(node("member_binding_expression").child(leaf("identifier", "Name"))),
            ),
        ),
    );
    let load = common::find_op(&insts, Opcode::LoadField).expect("field read");
    assert_eq!(load.operands()[1], "Name");
}
