//! Loops, conditionals and short-circuit boolean lowering.

mod common;

use common::*;
use uhllc::{
    ast::TokenKind,
    ir::{Opcode, OperandKind},
};

fn label_name(entry: &uhllc::ir::Entry) -> &str {
    match &entry.op1.kind {
        OperandKind::Label { name } => name,
        other => panic!("expected a label operand, found {other:?}"),
    }
}

#[test]
fn while_loop_compares_branches_and_jumps_back() {
    let ast = main_program(vec![
        var_node("i", type_name("int"), Some(int_term(0))),
        while_node_at(
            5,
            bin_expr(var_term("i"), TokenKind::LessThan, int_term(10)),
            vec![assign_node(var_term("i"), TokenKind::PlusEqual, int_term(1))],
        ),
    ]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            Opcode::CreateLabel,
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::Add,
            Opcode::Equal,
            Opcode::Goto,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );

    assert_eq!(label_name(&main.entries[1]), "_while_true_l5_c0");
    assert_eq!(label_name(&main.entries[3]), "_while_false_l5_c0");
    assert_eq!(label_name(&main.entries[6]), "_while_true_l5_c0");
    assert_eq!(label_name(&main.entries[7]), "_while_false_l5_c0");

    // The comparison's literal adopts the variable's width
    assert_eq!(
        main.entries[2].op2.kind,
        OperandKind::IntLiteral { value: 10 }
    );
}

#[test]
fn if_elseif_else_chains_share_one_end_label() {
    let ast = main_program(vec![
        var_node("x", type_name("int"), Some(int_term(0))),
        if_node(
            bin_expr(var_term("x"), TokenKind::LessThan, int_term(1)),
            vec![assign_node(var_term("x"), TokenKind::Equal, int_term(1))],
            vec![
                elseif_node(
                    bin_expr(var_term("x"), TokenKind::LessThan, int_term(2)),
                    vec![assign_node(var_term("x"), TokenKind::Equal, int_term(2))],
                ),
                else_node(vec![assign_node(
                    var_term("x"),
                    TokenKind::Equal,
                    int_term(3),
                )]),
            ],
        ),
    ]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            // if branch
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::Equal,
            Opcode::Goto,
            Opcode::CreateLabel,
            // elseif branch
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::Equal,
            Opcode::Goto,
            Opcode::CreateLabel,
            // else body
            Opcode::Equal,
            // shared end label
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );
}

#[test]
fn logical_and_falls_through_between_comparisons() {
    let condition = bin_expr(
        bin_expr(var_term("a"), TokenKind::LessThan, var_term("b")),
        TokenKind::LogicalAnd,
        bin_expr(var_term("c"), TokenKind::LessThan, var_term("d")),
    );

    let ast = main_program(vec![
        var_node("a", type_name("int"), Some(int_term(1))),
        var_node("b", type_name("int"), Some(int_term(2))),
        var_node("c", type_name("int"), Some(int_term(3))),
        var_node("d", type_name("int"), Some(int_term(4))),
        while_node(condition, vec![]),
    ]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            Opcode::Equal,
            Opcode::Equal,
            Opcode::Equal,
            Opcode::CreateLabel,
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::Goto,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );
}

#[test]
fn logical_or_branches_to_the_body_on_first_success() {
    let condition = bin_expr(
        bin_expr(var_term("a"), TokenKind::LessThan, var_term("b")),
        TokenKind::LogicalOr,
        bin_expr(var_term("c"), TokenKind::LessThan, var_term("d")),
    );

    let ast = main_program(vec![
        var_node("a", type_name("int"), Some(int_term(1))),
        var_node("b", type_name("int"), Some(int_term(2))),
        var_node("c", type_name("int"), Some(int_term(3))),
        var_node("d", type_name("int"), Some(int_term(4))),
        while_node(condition, vec![]),
    ]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            Opcode::Equal,
            Opcode::Equal,
            Opcode::Equal,
            Opcode::CreateLabel,
            Opcode::LessThan,
            Opcode::GotoIfTrue,
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::CreateLabel,
            Opcode::Goto,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );
}

#[test]
fn logical_not_swaps_the_branch_targets() {
    let condition = node_with(
        uhllc::ast::NodeKind::Term,
        uhllc::ast::Token::none(),
        vec![node_with(
            uhllc::ast::NodeKind::UnaryOperator,
            op_tok(TokenKind::LogicalNot),
            vec![node_with(
                uhllc::ast::NodeKind::Term,
                uhllc::ast::Token::none(),
                vec![bin_expr(var_term("a"), TokenKind::LessThan, var_term("b"))],
            )],
        )],
    );

    let ast = main_program(vec![
        var_node("a", type_name("int"), Some(int_term(1))),
        var_node("b", type_name("int"), Some(int_term(2))),
        while_node(condition, vec![]),
    ]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            Opcode::Equal,
            Opcode::CreateLabel,
            Opcode::LessThan,
            Opcode::GotoIfTrue,
            Opcode::Goto,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );
}

#[test]
fn for_loop_places_the_step_behind_the_continue_label() {
    let ast = main_program(vec![for_node(
        var_node("i", type_name("int"), Some(int_term(0))),
        bin_expr(var_term("i"), TokenKind::LessThan, int_term(3)),
        assign_node(var_term("i"), TokenKind::PlusEqual, int_term(1)),
        vec![],
    )]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            Opcode::CreateLabel,
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::CreateLabel,
            Opcode::Add,
            Opcode::Equal,
            Opcode::Goto,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );
}

#[test]
fn do_while_places_the_condition_at_the_bottom() {
    let ast = main_program(vec![
        var_node("i", type_name("int"), Some(int_term(0))),
        node_with(
            uhllc::ast::NodeKind::DoWhile,
            uhllc::ast::Token::none(),
            vec![
                block_node(vec![assign_node(
                    var_term("i"),
                    TokenKind::PlusEqual,
                    int_term(1),
                )]),
                bin_expr(var_term("i"), TokenKind::LessThan, int_term(3)),
            ],
        ),
    ]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            Opcode::CreateLabel,
            Opcode::Add,
            Opcode::Equal,
            Opcode::LessThan,
            Opcode::GotoIfTrue,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );
}

#[test]
fn bare_loop_has_an_unconditional_back_edge() {
    let ast = main_program(vec![node_with(
        uhllc::ast::NodeKind::Loop,
        uhllc::ast::Token::none(),
        vec![block_node(vec![node(
            uhllc::ast::NodeKind::Break,
            uhllc::ast::Token::none(),
        )])],
    )]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::CreateLabel,
            Opcode::Goto,
            Opcode::Goto,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );
}

#[test]
fn break_and_continue_target_the_loop_labels() {
    let ast = main_program(vec![
        var_node("i", type_name("int"), Some(int_term(0))),
        while_node_at(
            3,
            bin_expr(var_term("i"), TokenKind::LessThan, int_term(10)),
            vec![
                node(uhllc::ast::NodeKind::Continue, uhllc::ast::Token::none()),
                node(uhllc::ast::NodeKind::Break, uhllc::ast::Token::none()),
            ],
        ),
    ]);

    let modules = compile_main(ast).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![
            Opcode::Equal,
            Opcode::CreateLabel,
            Opcode::LessThan,
            Opcode::GotoIfFalse,
            Opcode::Goto,
            Opcode::Goto,
            Opcode::Goto,
            Opcode::CreateLabel,
            Opcode::Return
        ]
    );

    // continue jumps to the entry label, break to the exit label
    assert_eq!(label_name(&main.entries[4]), "_while_true_l3_c0");
    assert_eq!(label_name(&main.entries[5]), "_while_false_l3_c0");
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let ast = main_program(vec![node(
        uhllc::ast::NodeKind::Break,
        uhllc::ast::Token::none(),
    )]);

    let error = compile_main(ast).unwrap_err();
    assert_eq!(error.message, "BREAK outside loop");
}

#[test]
fn continue_outside_a_loop_is_rejected() {
    let ast = main_program(vec![node(
        uhllc::ast::NodeKind::Continue,
        uhllc::ast::Token::none(),
    )]);

    let error = compile_main(ast).unwrap_err();
    assert_eq!(error.message, "CONTINUE outside loop");
}

#[test]
fn comparing_structs_is_rejected() {
    let ast = program_node(vec![
        struct_node("Pair", vec![field_node("a", type_name("int"))]),
        fn_node(
            "main",
            vec![],
            vec![],
            vec![
                var_node("p", type_name("Pair"), None),
                var_node("q", type_name("Pair"), None),
                while_node(
                    bin_expr(var_term("p"), TokenKind::EqualEqual, var_term("q")),
                    vec![],
                ),
            ],
        ),
    ]);

    let error = compile_main(ast).unwrap_err();
    assert_eq!(error.message, "Cannot compare STRUCT or ARRAYS");
}

#[test]
fn arithmetic_in_condition_position_is_rejected() {
    let ast = main_program(vec![
        var_node("x", type_name("int"), Some(int_term(0))),
        while_node(
            bin_expr(var_term("x"), TokenKind::Plus, int_term(1)),
            vec![],
        ),
    ]);

    let error = compile_main(ast).unwrap_err();
    assert_eq!(error.message, "Invalid conditional expression");
}
