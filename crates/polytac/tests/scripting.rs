//! Ruby, Lua, and PHP behavior: modifier forms and negated conditions,
//! begin/rescue, blocks as trailing arguments, repeat-until target swap,
//! direct goto labels, sigil preservation, and strict-equality match.

mod common;

use common::{leaf, lower, node};
use polytac::{Language, Opcode};
use pretty_assertions::assert_eq;

#[test]
fn ruby_unless_modifier_negates_condition() {
    // x unless ready
    let insts = lower(
        Language::Ruby,
        node("program").child(
            node("unless_modifier")
                .field("body", node("call").field("method", leaf("identifier", "x")))
                .field("condition", leaf("identifier", "ready")),
        ),
    );
    let negation = common::find_op(&insts, Opcode::Unop).expect("negation");
    assert_eq!(negation.operands()[0], "!");
    assert!(common::find_op(&insts, Opcode::BranchIf).is_some());
}

#[test]
fn ruby_until_loops_while_condition_is_false() {
    let insts = lower(
        Language::Ruby,
        node("program").child(
            node("until")
                .field("condition", leaf("identifier", "done"))
                .field("body", node("do").child(node("call").field("method", leaf("identifier", "step")))),
        ),
    );
    let negation = common::find_op(&insts, Opcode::Unop).expect("negated condition");
    assert_eq!(negation.operands()[0], "!");
    assert!(common::labels(&insts).iter().any(|l| l.starts_with("while_cond")));
}

#[test]
fn ruby_begin_rescue_ensure_lowers_uniformly() {
    let insts = lower(
        Language::Ruby,
        node("program").child(
            node("begin")
                .child(node("call").field("method", leaf("identifier", "work")))
                .child(
                    node("rescue")
                        .field("exceptions", node("exceptions").child(leaf("constant", "IOError")))
                        .field("variable", node("exception_variable").child(leaf("identifier", "e")))
                        .field("body", node("then").child(node("call").field("method", leaf("identifier", "recover")))),
                )
                .child(node("ensure").child(node("call").field("method", leaf("identifier", "cleanup")))),
        ),
    );
    common::assert_has(&insts, Opcode::Symbolic, &["caught_exception:IOError"]);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "e"));
    let labels = common::labels(&insts);
    assert!(labels.iter().any(|l| l.starts_with("try_body")));
    assert!(labels.iter().any(|l| l.starts_with("try_finally")));
    assert!(labels.iter().any(|l| l.starts_with("try_end")));
}

#[test]
fn ruby_block_lowers_as_trailing_anonymous_function() {
    // list.each { |x| use(x) }
    let insts = lower(
        Language::Ruby,
        node("program").child(
            node("call")
                .field("receiver", leaf("identifier", "list"))
                .field("method", leaf("identifier", "each"))
                .field(
                    "block",
                    node("block")
                        .field("parameters", node("block_parameters").child(leaf("identifier", "x")))
                        .field(
                            "body",
                            node("block_body").child(
                                node("call")
                                    .field("method", leaf("identifier", "use"))
                                    .field("arguments", node("argument_list").child(leaf("identifier", "x"))),
                            ),
                        ),
                ),
        ),
    );
    let rendered = polytac::render(&insts);
    assert!(rendered.contains("func___block_0"), "{rendered}");
    let call = common::find_op(&insts, Opcode::CallMethod).expect("each call");
    assert_eq!(call.operands()[1], "each");
    // The block reference is the call's only argument.
    assert_eq!(call.operands().len(), 3, "{rendered}");
}

#[test]
fn ruby_sigils_survive_in_names() {
    let insts = lower(
        Language::Ruby,
        node("program").child(
            node("assignment")
                .field("left", leaf("instance_variable", "@count"))
                .field("right", leaf("global_variable", "$seed")),
        ),
    );
    common::assert_has(&insts, Opcode::LoadVar, &["$seed"]);
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "@count"));
}

#[test]
fn lua_repeat_until_swaps_branch_targets() {
    let insts = lower(
        Language::Lua,
        node("chunk").child(
            node("repeat_statement")
                .field(
                    "body",
                    node("block").child(
                        node("function_call")
                            .field("name", leaf("identifier", "step"))
                            .field("arguments", node("arguments")),
                    ),
                )
                .field("condition", leaf("identifier", "done")),
        ),
    );
    let branch_if = common::find_op(&insts, Opcode::BranchIf).expect("until branch");
    let targets = branch_if.operands()[1].clone();
    let (true_target, false_target) = targets.split_once(',').unwrap();
    // Condition true exits; condition false re-enters the body.
    assert!(true_target.starts_with("loop_end"), "{targets}");
    assert!(false_target.starts_with("loop_body"), "{targets}");
}

#[test]
fn lua_method_call_carries_receiver() {
    // obj:render(x)
    let insts = lower(
        Language::Lua,
        node("chunk").child(
            node("function_call")
                .field(
                    "name",
                    node("method_index_expression")
                        .field("table", leaf("identifier", "obj"))
                        .field("method", leaf("identifier", "render")),
                )
                .field("arguments", node("arguments").child(leaf("identifier", "x"))),
        ),
    );
    let call = common::find_op(&insts, Opcode::CallMethod).expect("method call");
    assert_eq!(call.operands()[1], "render");
}

#[test]
fn lua_goto_maps_directly_to_labels() {
    let insts = lower(
        Language::Lua,
        node("chunk")
            .child(node("label_statement").child(leaf("identifier", "top")))
            .child(node("goto_statement").child(leaf("identifier", "top"))),
    );
    assert!(common::labels(&insts).contains(&"top".to_owned()));
    common::assert_has(&insts, Opcode::Branch, &["top"]);
}

#[test]
fn lua_numeric_for_counts_inclusively() {
    let insts = lower(
        Language::Lua,
        node("chunk").child(
            node("for_statement")
                .field(
                    "clause",
                    node("for_numeric_clause")
                        .field("name", leaf("identifier", "i"))
                        .field("start", leaf("number", "1"))
                        .field("end", leaf("number", "5")),
                )
                .field("body", node("block")),
        ),
    );
    let cmp = insts
        .iter()
        .find(|i| i.opcode() == Opcode::Binop && i.operands()[0] == "<=")
        .expect("inclusive bound");
    let _ = cmp;
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "i"));
}

#[test]
fn php_variables_keep_dollar_sigil() {
    let insts = lower(
        Language::Php,
        node("program").child(
            node("expression_statement").child(
                node("assignment_expression")
                    .field("left", leaf("variable_name", "$total"))
                    .field("right", leaf("integer", "9")),
            ),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "$total"));
}

#[test]
fn php_match_compares_strictly_and_merges() {
    let insts = lower(
        Language::Php,
        node("program").child(
            node("expression_statement").child(
                node("match_expression")
                    .field("condition", leaf("variable_name", "$x"))
                    .field(
                        "body",
                        node("match_block")
                            .child(
                                node("match_conditional_expression")
                                    .field(
                                        "conditional_expressions",
                                        node("match_condition_list").child(leaf("integer", "1")),
                                    )
                                    .field("return_expression", leaf("string", "'one'")),
                            )
                            .child(
                                node("match_default_expression")
                                    .field("return_expression", leaf("string", "'other'")),
                            ),
                    ),
            ),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::Binop && i.operands()[0] == "==="));
    assert!(
        insts
            .iter()
            .any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0].starts_with("__match_result"))
    );
}

#[test]
fn php_foreach_pair_walks_keys() {
    // foreach ($m as $k => $v) {}
    let insts = lower(
        Language::Php,
        node("program").child(
            node("foreach_statement")
                .child(leaf("variable_name", "$m"))
                .child(
                    node("pair")
                        .child(leaf("variable_name", "$k"))
                        .child(leaf("variable_name", "$v")),
                )
                .field("body", node("compound_statement")),
        ),
    );
    assert!(insts.iter().any(|i| i.opcode() == Opcode::CallFunction && i.operands()[0] == "keys"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "$k"));
    assert!(insts.iter().any(|i| i.opcode() == Opcode::StoreVar && i.operands()[0] == "$v"));
}

#[test]
fn php_associative_array_detects_shape() {
    let assoc = lower(
        Language::Php,
        node("program").child(
            node("expression_statement").child(
                node("array_creation_expression").child(
                    node("array_element_initializer")
                        .child(leaf("string", "'k'"))
                        .child(leaf("integer", "1")),
                ),
            ),
        ),
    );
    common::assert_has(&assoc, Opcode::NewObject, &["dict"]);

    let indexed = lower(
        Language::Php,
        node("program").child(
            node("expression_statement").child(
                node("array_creation_expression")
                    .child(node("array_element_initializer").child(leaf("integer", "1")))
                    .child(node("array_element_initializer").child(leaf("integer", "2"))),
            ),
        ),
    );
    assert!(indexed.iter().any(|i| i.opcode() == Opcode::NewArray && i.operands()[0] == "list"));
}

#[test]
fn php_enum_cases_store_on_self() {
    let insts = lower(
        Language::Php,
        node("program").child(
            node("enum_declaration")
                .field("name", leaf("name", "Suit"))
                .field(
                    "body",
                    node("enum_declaration_list")
                        .child(node("enum_case").field("name", leaf("name", "Hearts"))),
                ),
        ),
    );
    common::assert_has(&insts, Opcode::LoadVar, &["self"]);
    let store = common::find_op(&insts, Opcode::StoreField).expect("case store");
    assert_eq!(store.operands()[1], "Hearts");
}
