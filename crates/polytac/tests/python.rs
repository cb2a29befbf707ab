//! Python-specific lowering behavior: comprehensions, `with`, decorators,
//! `match`, unpacking, the walrus operator, slicing, and imports.

mod common;

use common::{leaf, lower, node, token};
use polytac::{Instruction, Language, Opcode};
use pretty_assertions::assert_eq;

#[test]
fn list_comprehension_desugars_to_append_loop() {
    // [x * 2 for x in xs if x]
    let insts = lower(
        Language::Python,
        node("module").child(
            node("expression_statement").child(
                node("list_comprehension")
                    .field(
                        "body",
                        node("binary_operator")
                            .field("left", leaf("identifier", "x"))
                            .field("operator", token("*"))
                            .field("right", leaf("integer", "2")),
                    )
                    .child(
                        node("for_in_clause")
                            .field("left", leaf("identifier", "x"))
                            .field("right", leaf("identifier", "xs")),
                    )
                    .child(node("if_clause").child(leaf("identifier", "x"))),
            ),
        ),
    );
    let rendered = polytac::render(&insts);
    common::assert_has(&insts, Opcode::NewArray, &["list", "%0"]);
    assert!(
        insts.iter().any(|i| i.opcode() == Opcode::CallMethod && i.operands()[1] == "append"),
        "{rendered}"
    );
    // The filter branches around the append.
    assert!(common::labels(&insts).iter().any(|l| l.starts_with("comp_keep")), "{rendered}");
    assert!(common::labels(&insts).iter().any(|l| l.starts_with("foreach_cond")), "{rendered}");
}

#[test]
fn generator_expression_wraps_eager_list() {
    let insts = lower(
        Language::Python,
        node("module").child(
            node("expression_statement").child(
                node("generator_expression")
                    .field("body", leaf("identifier", "x"))
                    .child(
                        node("for_in_clause")
                            .field("left", leaf("identifier", "x"))
                            .field("right", leaf("identifier", "xs")),
                    ),
            ),
        ),
    );
    assert!(
        insts
            .iter()
            .any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "generator")
    );
}

#[test]
fn with_statement_enters_and_exits_in_lifo_order() {
    // with open(p) as f, lock: ...
    let insts = lower(
        Language::Python,
        node("module").child(
            node("with_statement")
                .child(
                    node("with_clause")
                        .child(
                            node("with_item").field(
                                "value",
                                node("as_pattern")
                                    .child(
                                        node("call")
                                            .field("function", leaf("identifier", "open"))
                                            .field("arguments", node("argument_list").child(leaf("identifier", "p"))),
                                    )
                                    .child(leaf("as_pattern_target", "f")),
                            ),
                        )
                        .child(node("with_item").field("value", leaf("identifier", "lock"))),
                )
                .field("body", node("block").child(node("pass_statement"))),
        ),
    );
    let methods: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::CallMethod)
        .map(|i| i.operands()[1].clone())
        .collect();
    assert_eq!(methods, ["__enter__", "__enter__", "__exit__", "__exit__"]);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "f"));

    // LIFO: the last-entered context exits first.
    let enter_objs: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::CallMethod && i.operands()[1] == "__enter__")
        .map(|i| i.operands()[0].clone())
        .collect();
    let exit_objs: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::CallMethod && i.operands()[1] == "__exit__")
        .map(|i| i.operands()[0].clone())
        .collect();
    assert_eq!(exit_objs, enter_objs.iter().rev().cloned().collect::<Vec<_>>());
}

#[test]
fn decorators_apply_bottom_up() {
    // @outer @inner def f(): pass
    let insts = lower(
        Language::Python,
        node("module").child(
            node("decorated_definition")
                .child(node("decorator").child(leaf("identifier", "outer")))
                .child(node("decorator").child(leaf("identifier", "inner")))
                .field(
                    "definition",
                    node("function_definition")
                        .field("name", leaf("identifier", "f"))
                        .field("parameters", node("parameters"))
                        .field("body", node("block").child(node("pass_statement"))),
                ),
        ),
    );
    let decorator_loads: Vec<String> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::LoadVar && (i.operands()[0] == "outer" || i.operands()[0] == "inner"))
        .map(|i| i.operands()[0].clone())
        .collect();
    assert_eq!(decorator_loads, ["inner", "outer"]);
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::CallUnknown).count(), 2);
    // Each application re-binds f.
    assert!(insts.iter().filter(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "f").count() >= 3);
}

#[test]
fn match_statement_with_wildcard_default() {
    let insts = lower(
        Language::Python,
        node("module").child(
            node("match_statement")
                .field("subject", leaf("identifier", "x"))
                .field(
                    "body",
                    node("case_block")
                        .child(
                            node("case_clause")
                                .child(node("case_pattern").child(leaf("integer", "1")))
                                .field("consequence", node("block").child(node("pass_statement"))),
                        )
                        .child(
                            node("case_clause")
                                .child(node("case_pattern").child(leaf("identifier", "_")))
                                .field("consequence", node("block").child(node("pass_statement"))),
                        ),
                ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(
        insts.iter().any(|i| i.opcode() == Opcode::Binop && i.operands()[0] == "=="),
        "{rendered}"
    );
    // The wildcard arm branches unconditionally.
    assert_eq!(
        insts.iter().filter(|i| i.opcode() == Opcode::BranchIf).count(),
        1,
        "{rendered}"
    );
}

#[test]
fn tuple_unpacking_destructures_by_index() {
    // a, b = pair
    let insts = lower(
        Language::Python,
        node("module").child(
            node("expression_statement").child(
                node("assignment")
                    .field(
                        "left",
                        node("pattern_list")
                            .child(leaf("identifier", "a"))
                            .child(leaf("identifier", "b")),
                    )
                    .field("right", leaf("identifier", "pair")),
            ),
        ),
    );
    common::assert_has(&insts, Opcode::Const, &["0"]);
    common::assert_has(&insts, Opcode::Const, &["1"]);
    assert_eq!(insts.iter().filter(|i| i.opcode() == Opcode::LoadIndex).count(), 2);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "a"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "b"));
}

#[test]
fn walrus_stores_and_yields_value() {
    let insts = lower(
        Language::Python,
        node("module").child(
            node("expression_statement").child(
                node("named_expression")
                    .field("name", leaf("identifier", "n"))
                    .field("value", leaf("integer", "7")),
            ),
        ),
    );
    let store = common::find_op(&insts, Opcode::StoreVar).expect("store");
    assert_eq!(store.operands()[0], "n");
    let const_reg = common::find_op(&insts, Opcode::Const).unwrap().result_reg().unwrap();
    assert_eq!(store.operands()[1], const_reg.to_string());
}

#[test]
fn slice_subscript_uses_slice_helper() {
    // xs[1:n]
    let insts = lower(
        Language::Python,
        node("module").child(
            node("expression_statement").child(
                node("subscript")
                    .field("value", leaf("identifier", "xs"))
                    .field(
                        "subscript",
                        node("slice").child(leaf("integer", "1")).child(leaf("identifier", "n")),
                    ),
            ),
        ),
    );
    let slice = insts
        .iter()
        .find(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "slice")
        .expect("slice call");
    // start, stop, and an implicit None step.
    assert_eq!(slice.operands().len(), 4);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::LoadIndex));
}

#[test]
fn imports_bind_through_the_import_helper() {
    let insts = lower(
        Language::Python,
        node("module")
            .child(node("import_statement").child(leaf("dotted_name", "os.path")))
            .child(
                node("import_from_statement")
                    .field("module_name", leaf("dotted_name", "collections"))
                    .child(leaf("dotted_name", "deque")),
            ),
    );
    common::assert_has(&insts, Opcode::Const, &["os.path"]);
    common::assert_has(&insts, Opcode::Const, &["collections.deque"]);
    let import_calls: Vec<&Instruction> = insts
        .iter()
        .filter(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "import")
        .collect();
    assert_eq!(import_calls.len(), 2);
    // `import os.path` binds the top-level name.
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "os"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "deque"));
}
