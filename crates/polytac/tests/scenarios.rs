//! End-to-end lowering scenarios, one per language family quirk: function
//! scaffolds, 1-based table constructors, Go main hoisting, C switch
//! chains, Rust expression-if phi merging, and JS object destructuring.

mod common;

use common::{find_op, leaf, lower, node, token};
use polytac::{Instruction, Language, Opcode};
use pretty_assertions::assert_eq;

/// Python `def add(a, b): return a + b`.
#[test]
fn python_function_definition_scaffold() {
    let insts = lower(
        Language::Python,
        node("module").child(
            node("function_definition")
                .field("name", leaf("identifier", "add"))
                .field(
                    "parameters",
                    node("parameters")
                        .child(leaf("identifier", "a"))
                        .child(leaf("identifier", "b")),
                )
                .field(
                    "body",
                    node("block").child(
                        node("return_statement").child(
                            node("binary_operator")
                                .field("left", leaf("identifier", "a"))
                                .field("operator", token("+"))
                                .field("right", leaf("identifier", "b")),
                        ),
                    ),
                ),
        ),
    );

    let rendered = polytac::render(&insts);
    assert_eq!(insts[0].label(), Some("entry"));
    assert!(rendered.contains("BRANCH end_add_0"), "{rendered}");
    assert!(rendered.contains("LABEL func_add_1"), "{rendered}");
    common::assert_has(&insts, Opcode::Symbolic, &["param:a"]);
    common::assert_has(&insts, Opcode::Symbolic, &["param:b"]);
    common::assert_has(&insts, Opcode::LoadVar, &["a"]);
    common::assert_has(&insts, Opcode::LoadVar, &["b"]);

    let binop = find_op(&insts, Opcode::Binop).expect("binop");
    assert_eq!(binop.operands()[0], "+");

    // Explicit return of the sum, then the implicit `None` return.
    let returns: Vec<&Instruction> = insts.iter().filter(|i| i.opcode() == Opcode::Return).collect();
    assert_eq!(returns.len(), 2);
    common::assert_has(&insts, Opcode::Const, &["None"]);
    assert!(rendered.contains("LABEL end_add_0"), "{rendered}");
    common::assert_has(&insts, Opcode::Const, &["<function:add@func_add_1>"]);
    let last = insts.last().unwrap();
    assert_eq!(last.opcode(), Opcode::StoreVar);
    assert_eq!(last.operands()[0], "add");
}

/// Lua `t = {x=10, y=20, "hello"}`: positional entries index from 1.
#[test]
fn lua_table_constructor_is_one_based() {
    let insts = lower(
        Language::Lua,
        node("chunk").child(
            node("assignment_statement")
                .field(
                    "left",
                    node("variable_list").child(leaf("identifier", "t")),
                )
                .field(
                    "right",
                    node("expression_list").child(
                        node("table_constructor")
                            .child(
                                node("field")
                                    .field("name", leaf("identifier", "x"))
                                    .field("value", leaf("number", "10")),
                            )
                            .child(
                                node("field")
                                    .field("name", leaf("identifier", "y"))
                                    .field("value", leaf("number", "20")),
                            )
                            .child(node("field").field("value", leaf("string", "\"hello\""))),
                    ),
                ),
        ),
    );

    common::assert_has(&insts, Opcode::NewObject, &["table"]);
    common::assert_has(&insts, Opcode::Const, &["x"]);
    common::assert_has(&insts, Opcode::Const, &["10"]);
    common::assert_has(&insts, Opcode::Const, &["y"]);
    common::assert_has(&insts, Opcode::Const, &["20"]);
    // The positional entry gets index 1, not 0.
    common::assert_has(&insts, Opcode::Const, &["1"]);
    common::assert_has(&insts, Opcode::Const, &["\"hello\""]);
    assert!(!insts.iter().any(|i| i.opcode() == Opcode::Const && i.operands() == ["0"]));
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::StoreIndex).count(), 3);

    let store = insts.iter().rfind(|i| i.opcode() == Opcode::StoreVar).expect("store");
    assert_eq!(store.operands()[0], "t");
}

/// Go `func main() { x := add(1, 2) }`: the body hoists to top level.
#[test]
fn go_main_body_is_hoisted() {
    let insts = lower(
        Language::Go,
        node("source_file").child(
            node("function_declaration")
                .field("name", leaf("identifier", "main"))
                .field("parameters", node("parameter_list"))
                .field(
                    "body",
                    node("block").child(
                        node("short_var_declaration")
                            .field("left", node("expression_list").child(leaf("identifier", "x")))
                            .field(
                                "right",
                                node("expression_list").child(
                                    node("call_expression")
                                        .field("function", leaf("identifier", "add"))
                                        .field(
                                            "arguments",
                                            node("argument_list")
                                                .child(leaf("int_literal", "1"))
                                                .child(leaf("int_literal", "2")),
                                        ),
                                ),
                            ),
                    ),
                ),
        ),
    );

    common::assert_has(&insts, Opcode::Const, &["1"]);
    common::assert_has(&insts, Opcode::Const, &["2"]);
    let call = find_op(&insts, Opcode::CallFunction).expect("call");
    assert_eq!(call.operands()[0], "add");
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "x"));
    // No scaffold for main: its locals live in frame zero.
    assert!(
        !common::labels(&insts).iter().any(|l| l.starts_with("func_main")),
        "{}",
        polytac::render(&insts)
    );
}

/// C `switch(x){case 1: a(); break; case 2: b(); break;}`: an `==`
/// chain with no fall-through path.
#[test]
fn c_switch_lowers_to_equality_chain() {
    let case = |value: &str, callee: &str| {
        node("case_statement")
            .field("value", leaf("number_literal", value))
            .child(
                node("expression_statement").child(
                    node("call_expression")
                        .field("function", leaf("identifier", callee))
                        .field("arguments", node("argument_list")),
                ),
            )
            .child(node("break_statement"))
    };
    let insts = lower(
        Language::C,
        node("translation_unit").child(
            node("switch_statement")
                .field(
                    "condition",
                    node("parenthesized_expression").child(leaf("identifier", "x")),
                )
                .field(
                    "body",
                    node("compound_statement").child(case("1", "a")).child(case("2", "b")),
                ),
        ),
    );

    let rendered = polytac::render(&insts);
    let eq_count = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::Binop && i.operands()[0] == "==")
        .count();
    assert_eq!(eq_count, 2, "{rendered}");
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "a"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "b"));

    // Every arm branches to the shared end label; `break` resolves to the
    // same label, so no fall-through path exists.
    let end_label = common::labels(&insts)
        .into_iter()
        .find(|l| l.starts_with("switch_end"))
        .expect("switch end label");
    let branches_to_end = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::Branch && i.operands() == [end_label.clone()])
        .count();
    assert!(branches_to_end >= 4, "{rendered}");
}

/// Rust `let y = if c { 1 } else { 2 };`: both arms store the phi
/// variable, the merge loads it.
#[test]
fn rust_expression_if_merges_through_phi() {
    let insts = lower(
        Language::Rust,
        node("source_file").child(
            node("let_declaration")
                .field("pattern", leaf("identifier", "y"))
                .field(
                    "value",
                    node("if_expression")
                        .field("condition", leaf("identifier", "c"))
                        .field("consequence", node("block").child(leaf("integer_literal", "1")))
                        .field(
                            "alternative",
                            node("else_clause").child(node("block").child(leaf("integer_literal", "2"))),
                        ),
                ),
        ),
    );

    let rendered = polytac::render(&insts);
    let phi_stores: Vec<&Instruction> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::StoreVar && i.operands()[0].starts_with("__if_result"))
        .collect();
    assert_eq!(phi_stores.len(), 2, "{rendered}");
    let phi = phi_stores[0].operands()[0].clone();

    let load = insts
        .iter()
        .find(|i| i.opcode() == Opcode::LoadVar && i.operands()[0] == phi)
        .expect("phi load");
    let load_pos = insts.iter().position(|i| std::ptr::eq(i, load)).unwrap();
    let store_y = insts
        .iter()
        .position(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "y")
        .expect("store y");
    assert!(load_pos < store_y, "{rendered}");
    common::assert_has(&insts, Opcode::Const, &["1"]);
    common::assert_has(&insts, Opcode::Const, &["2"]);
}

/// JavaScript `const { a, b: localB } = obj;`.
#[test]
fn javascript_object_destructuring() {
    let insts = lower(
        Language::JavaScript,
        node("program").child(
            node("lexical_declaration").child(
                node("variable_declarator")
                    .field(
                        "name",
                        node("object_pattern")
                            .child(leaf("shorthand_property_identifier", "a"))
                            .child(
                                node("pair_pattern")
                                    .field("key", leaf("property_identifier", "b"))
                                    .field("value", leaf("identifier", "localB")),
                            ),
                    )
                    .field("value", leaf("identifier", "obj")),
            ),
        ),
    );

    common::assert_has(&insts, Opcode::LoadVar, &["obj"]);
    let field_loads: Vec<Vec<String>> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::LoadField)
        .map(Instruction::operands)
        .collect();
    assert_eq!(field_loads.len(), 2);
    assert_eq!(field_loads[0][1], "a");
    assert_eq!(field_loads[1][1], "b");
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "a"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "localB"));
}

/// A tree with no traversable root is the one hard failure.
#[test]
fn corrupt_tree_is_a_typed_error() {
    struct Empty;
    impl polytac::SourceTree for Empty {
        type Node = common::TestNode;
        fn root_node(&self) -> Option<common::TestNode> {
            None
        }
    }
    let mut lowerer = Language::Python.lowerer::<common::TestNode>();
    let err = lowerer.lower(&Empty, b"").unwrap_err();
    assert_eq!(err.to_string(), "syntax tree has no traversable root node");
}

/// The textual rendering matches the documented line form.
#[test]
fn render_line_format() {
    let insts = lower(
        Language::Python,
        node("module").child(
            node("expression_statement").child(
                node("assignment")
                    .field("left", leaf("identifier", "x"))
                    .field("right", leaf("integer", "42")),
            ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(rendered.starts_with("LABEL entry\n"), "{rendered}");
    assert!(rendered.contains("CONST %0 = 42"), "{rendered}");
    assert!(rendered.contains("STORE_VAR x %0"), "{rendered}");
}
