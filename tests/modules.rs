//! Imports, cross-module resolution, globals, enums and defines.

mod common;

use common::*;
use uhllc::{
    ast::{NodeKind, Token, TokenKind},
    ir::{Opcode, OperandKind},
};

fn util_module() -> uhllc::ast::Node {
    program_node(vec![fn_node(
        "double",
        vec![param_node("x", type_name("int"), false)],
        type_name("int"),
        vec![return_node(Some(bin_expr(
            var_term("x"),
            TokenKind::Plus,
            var_term("x"),
        )))],
    )])
}

#[test]
fn use_compiles_the_imported_module_first() {
    let main = program_node(vec![
        use_node(&["util"]),
        fn_node(
            "main",
            vec![],
            vec![],
            vec![node_with(
                NodeKind::Term,
                Token::none(),
                vec![
                    node(NodeKind::Module, id("util")),
                    call_node("double", vec![int_term(2)]),
                ],
            )],
        ),
    ]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util_module());

    let modules = uhllc::compile_program("main", &mut provider).unwrap();

    // Both modules are in the output map, the callee fully compiled
    assert!(modules.contains_key("util"));
    assert!(modules["util"].functions.contains_key("_util_double"));

    let main = main_function(&modules);
    assert_eq!(opcodes(main), vec![Opcode::Pass, Opcode::Call, Opcode::Return]);
    assert_eq!(
        main.entries[1].op2.kind,
        OperandKind::Var {
            name: "_util_double".into()
        }
    );
    assert_eq!(
        main.entries[1].op3.kind,
        OperandKind::Module {
            name: "util".into()
        }
    );
}

#[test]
fn from_imports_structs_with_their_defining_module() {
    let util = program_node(vec![struct_node(
        "Point",
        vec![
            field_node("x", type_name("int")),
            field_node("y", type_name("int")),
        ],
    )]);

    let main = program_node(vec![
        use_node(&["util"]),
        from_node("util", &["Point"]),
        fn_node(
            "main",
            vec![],
            vec![],
            vec![
                var_node("p", type_name("Point"), None),
                assign_node(field_term("p", &["y"]), TokenKind::Equal, int_term(3)),
            ],
        ),
    ]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util);

    let modules = uhllc::compile_program("main", &mut provider).unwrap();

    // The copied struct still names util as its defining module
    assert_eq!(modules["main"].structures["Point"].module_name, "util");

    let main = main_function(&modules);
    assert_eq!(
        opcodes(main),
        vec![
            Opcode::CreatePointer,
            Opcode::AddressAdd,
            Opcode::Write,
            Opcode::Return
        ]
    );
}

#[test]
fn defines_and_enumerators_resolve_to_literals() {
    let util = program_node(vec![
        def_node("LIMIT", node(NodeKind::Literal, int_tok(10))),
        enum_node("Color", &["RED", "GREEN", "BLUE"]),
    ]);

    let main = program_node(vec![
        use_node(&["util"]),
        from_node("util", &["LIMIT", "GREEN"]),
        fn_node(
            "main",
            vec![],
            vec![],
            vec![
                var_node("x", type_name("int"), Some(var_term("LIMIT"))),
                var_node("y", type_name("int"), Some(var_term("GREEN"))),
            ],
        ),
    ]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util);

    let modules = uhllc::compile_program("main", &mut provider).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        opcodes(main),
        vec![Opcode::Equal, Opcode::Equal, Opcode::Return]
    );
    assert_eq!(
        main.entries[0].op2.kind,
        OperandKind::IntLiteral { value: 10 }
    );
    assert_eq!(main.entries[1].op2.kind, OperandKind::IntLiteral { value: 1 });
}

#[test]
fn globals_are_stored_and_resolved_under_mangled_names() {
    let ast = program_node(vec![
        var_node("counter", type_name("int"), None),
        fn_node(
            "main",
            vec![],
            vec![],
            vec![assign_node(
                var_term("counter"),
                TokenKind::Equal,
                int_term(5),
            )],
        ),
    ]);

    let modules = compile_main(ast).unwrap();

    assert!(modules["main"].globals.contains_key("_main_counter"));

    let main = main_function(&modules);
    assert_eq!(opcodes(main), vec![Opcode::Equal, Opcode::Return]);
    assert_eq!(
        main.entries[0].op1.kind,
        OperandKind::GlobalVar {
            name: "_main_counter".into()
        }
    );
}

#[test]
fn import_aliases_name_the_module_in_access_chains() {
    let main = program_node(vec![
        node_with(
            NodeKind::Use,
            Token::none(),
            vec![node_with(
                NodeKind::Module,
                id("util"),
                vec![ident_node("u")],
            )],
        ),
        fn_node(
            "main",
            vec![],
            vec![],
            vec![node_with(
                NodeKind::Term,
                Token::none(),
                vec![
                    node(NodeKind::Module, id("u")),
                    call_node("double", vec![int_term(1)]),
                ],
            )],
        ),
    ]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util_module());

    let modules = uhllc::compile_program("main", &mut provider).unwrap();
    let main = main_function(&modules);

    assert_eq!(
        main.entries[1].op3.kind,
        OperandKind::Module {
            name: "util".into()
        }
    );
}

#[test]
fn self_import_is_rejected() {
    let ast = program_node(vec![use_node(&["main"])]);

    let mut provider = MapProvider::new().with_module("main", ast);
    let error = uhllc::compile_program("main", &mut provider).unwrap_err();

    assert_eq!(error.message, "Self import not allowed");
}

#[test]
fn duplicate_import_is_rejected() {
    let main = program_node(vec![use_node(&["util", "util"])]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util_module());

    let error = uhllc::compile_program("main", &mut provider).unwrap_err();
    assert_eq!(error.message, "Multiple imports detected");
}

#[test]
fn missing_module_is_rejected() {
    let main = program_node(vec![use_node(&["nothere"])]);

    let mut provider = MapProvider::new().with_module("main", main);
    let error = uhllc::compile_program("main", &mut provider).unwrap_err();

    assert_eq!(error.message, "Module or Package does not exist");
}

#[test]
fn module_and_package_with_the_same_name_is_rejected() {
    let main = program_node(vec![use_node(&["util"])]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util_module())
        .with_package("util");

    let error = uhllc::compile_program("main", &mut provider).unwrap_err();
    assert_eq!(error.message, "Module and Package exists with same name");
}

#[test]
fn import_cycles_are_reported() {
    let a = program_node(vec![use_node(&["b"])]);
    let b = program_node(vec![use_node(&["a"])]);

    let mut provider = MapProvider::new()
        .with_module("a", a)
        .with_module("b", b);

    let error = uhllc::compile_program("a", &mut provider).unwrap_err();
    assert_eq!(error.message, "Cyclic import detected");
}

#[test]
fn importing_a_function_with_from_is_rejected() {
    let main = program_node(vec![
        use_node(&["util"]),
        from_node("util", &["double"]),
    ]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util_module());

    let error = uhllc::compile_program("main", &mut provider).unwrap_err();
    assert_eq!(error.message, "Cannot import functions");
}

#[test]
fn from_with_an_unknown_symbol_is_rejected() {
    let main = program_node(vec![
        use_node(&["util"]),
        from_node("util", &["nothere"]),
    ]);

    let mut provider = MapProvider::new()
        .with_module("main", main)
        .with_module("util", util_module());

    let error = uhllc::compile_program("main", &mut provider).unwrap_err();
    assert_eq!(error.message, "Symbol does not exist");
}

#[test]
fn duplicate_top_level_symbols_are_rejected() {
    let ast = program_node(vec![
        struct_node("Thing", vec![field_node("a", type_name("int"))]),
        struct_node("Thing", vec![field_node("b", type_name("int"))]),
    ]);

    let error = compile_main(ast).unwrap_err();
    assert_eq!(error.message, "Symbol already defined");
}
