//! Shared helpers for the lowering tests: an in-memory module provider and
//! builders for the AST shapes the external parser would produce.

#![allow(dead_code)]

use std::collections::HashMap;

use uhllc::{
    ast::{Node, NodeKind, Token, TokenKind},
    ir::{FunctionDescription, ModulesMap, Opcode},
    AstProvider, CompileError,
};

/// An `AstProvider` backed by a map of pre-built ASTs
#[derive(Default)]
pub struct MapProvider {
    sources: HashMap<String, Node>,
    packages: Vec<String>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, ast: Node) -> Self {
        self.sources.insert(name.to_owned(), ast);
        self
    }

    pub fn with_package(mut self, name: &str) -> Self {
        self.packages.push(name.to_owned());
        self
    }
}

impl AstProvider for MapProvider {
    fn module_exists(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    fn package_exists(&self, name: &str) -> bool {
        self.packages.iter().any(|p| p == name)
    }

    fn ast(&mut self, name: &str) -> Result<Node, CompileError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::on_token(name, "Module does not exist", &Token::none()))
    }
}

/* Tokens */

pub fn id(name: &str) -> Token {
    Token::identifier(name, 0, 0)
}

pub fn id_at(name: &str, line: usize, column: usize) -> Token {
    Token::identifier(name, line, column)
}

pub fn int_tok(value: i64) -> Token {
    Token::new(TokenKind::IntLiteral, value.to_string(), 0, 0)
}

pub fn float_tok(value: f64) -> Token {
    Token::new(TokenKind::FloatLiteral, value.to_string(), 0, 0)
}

pub fn char_tok(c: char) -> Token {
    Token::with_unescaped(TokenKind::CharLiteral, format!("'{c}'"), c.to_string(), 0, 0)
}

pub fn str_tok(contents: &str) -> Token {
    Token::with_unescaped(
        TokenKind::StringLiteral,
        format!("\"{contents}\""),
        contents,
        0,
        0,
    )
}

pub fn str_tok_at(contents: &str, line: usize, column: usize) -> Token {
    Token::with_unescaped(
        TokenKind::StringLiteral,
        format!("\"{contents}\""),
        contents,
        line,
        column,
    )
}

pub fn op_tok(kind: TokenKind) -> Token {
    let text = match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Multiply => "*",
        TokenKind::Divide => "/",
        TokenKind::Modulo => "%",
        TokenKind::LeftShift => "<<",
        TokenKind::RightShift => ">>",
        TokenKind::BitwiseAnd => "&",
        TokenKind::BitwiseXor => "^",
        TokenKind::BitwiseOr => "|",
        TokenKind::BitwiseNot => "~",
        TokenKind::LogicalAnd => "and",
        TokenKind::LogicalOr => "or",
        TokenKind::LogicalNot => "not",
        TokenKind::LessThan => "<",
        TokenKind::LessThanOrEqual => "<=",
        TokenKind::GreaterThan => ">",
        TokenKind::GreaterThanOrEqual => ">=",
        TokenKind::EqualEqual => "==",
        TokenKind::NotEqual => "!=",
        TokenKind::Equal => "=",
        TokenKind::PlusEqual => "+=",
        TokenKind::MinusEqual => "-=",
        TokenKind::MultiplyEqual => "*=",
        TokenKind::DivideEqual => "/=",
        TokenKind::ModuloEqual => "%=",
        TokenKind::OrEqual => "|=",
        TokenKind::AndEqual => "&=",
        TokenKind::XorEqual => "^=",
        _ => "",
    };

    Token::new(kind, text, 0, 0)
}

pub fn op_tok_at(kind: TokenKind, line: usize, column: usize) -> Token {
    let mut token = op_tok(kind);
    token.line = line;
    token.column = column;
    token
}

/* Nodes */

pub fn node(kind: NodeKind, token: Token) -> Node {
    Node::new(kind, token)
}

pub fn node_with(kind: NodeKind, token: Token, children: Vec<Node>) -> Node {
    Node::with_children(kind, token, children)
}

pub fn ident_node(name: &str) -> Node {
    node(NodeKind::Identifier, id(name))
}

pub fn program_node(children: Vec<Node>) -> Node {
    node_with(NodeKind::Program, Token::none(), children)
}

pub fn block_node(statements: Vec<Node>) -> Node {
    node_with(NodeKind::Block, Token::none(), statements)
}

/// `fn <name>(<params>) -> <return type> { <body> }`; pass an empty return
/// type for void functions
pub fn fn_node(name: &str, params: Vec<Node>, return_type: Vec<Node>, body: Vec<Node>) -> Node {
    let mut children = vec![ident_node(name)];
    children.extend(params);
    children.extend(return_type);
    children.push(block_node(body));

    node_with(NodeKind::Function, id(name), children)
}

pub fn extern_fn_node(name: &str, params: Vec<Node>, return_type: Vec<Node>) -> Node {
    let mut children = vec![ident_node(name)];
    children.extend(params);
    children.extend(return_type);

    node_with(NodeKind::ExternFunction, id(name), children)
}

pub fn param_node(name: &str, type_nodes: Vec<Node>, mutable: bool) -> Node {
    let kind = if mutable {
        NodeKind::MutParam
    } else {
        NodeKind::Param
    };

    let mut children = vec![ident_node(name)];
    children.extend(type_nodes);

    node_with(kind, id(name), children)
}

/* Type specs */

pub fn type_name(name: &str) -> Vec<Node> {
    vec![ident_node(name)]
}

pub fn array_type(name: &str, dimensions: &[usize]) -> Vec<Node> {
    let mut nodes = vec![ident_node(name)];

    for dim in dimensions {
        nodes.push(node_with(
            NodeKind::Subscript,
            Token::none(),
            vec![node(NodeKind::Literal, int_tok(*dim as i64))],
        ));
    }

    nodes
}

pub fn generic_type(module: Option<&str>, name: &str, params: Vec<Vec<Node>>) -> Vec<Node> {
    let mut nodes = Vec::new();

    if let Some(module) = module {
        nodes.push(node(NodeKind::Module, id(module)));
    }

    nodes.push(ident_node(name));

    for param in params {
        nodes.push(node_with(NodeKind::GenericTypeParam, Token::none(), param));
    }

    nodes
}

/* Declarations */

pub fn var_node(name: &str, type_nodes: Vec<Node>, init: Option<Node>) -> Node {
    let mut children = vec![ident_node(name)];
    children.extend(type_nodes);
    children.extend(init);

    node_with(NodeKind::Var, id(name), children)
}

pub fn const_node(name: &str, type_nodes: Vec<Node>, init: Option<Node>) -> Node {
    let mut children = vec![ident_node(name)];
    children.extend(type_nodes);
    children.extend(init);

    node_with(NodeKind::Const, id(name), children)
}

pub fn struct_node(name: &str, fields: Vec<Node>) -> Node {
    let mut children = vec![ident_node(name)];
    children.extend(fields);

    node_with(NodeKind::Struct, id(name), children)
}

/// A struct field has the same shape as a var declaration without init
pub fn field_node(name: &str, type_nodes: Vec<Node>) -> Node {
    var_node(name, type_nodes, None)
}

pub fn enum_node(name: &str, enumerators: &[&str]) -> Node {
    let mut children = vec![ident_node(name)];
    children.extend(enumerators.iter().map(|e| ident_node(e)));

    node_with(NodeKind::Enum, id(name), children)
}

pub fn def_node(name: &str, value: Node) -> Node {
    node_with(NodeKind::Def, id(name), vec![ident_node(name), value])
}

pub fn use_node(modules: &[&str]) -> Node {
    node_with(
        NodeKind::Use,
        Token::none(),
        modules
            .iter()
            .map(|m| node(NodeKind::Module, id(m)))
            .collect(),
    )
}

pub fn from_node(module: &str, symbols: &[&str]) -> Node {
    let mut children = vec![node(NodeKind::Module, id(module))];
    children.extend(symbols.iter().map(|s| ident_node(s)));

    node_with(NodeKind::From, Token::none(), children)
}

pub fn generic_node(params: &[&str]) -> Node {
    node_with(
        NodeKind::Generic,
        Token::none(),
        params.iter().map(|p| ident_node(p)).collect(),
    )
}

/* Terms and expressions */

pub fn int_term(value: i64) -> Node {
    node_with(
        NodeKind::Term,
        Token::none(),
        vec![node(NodeKind::Literal, int_tok(value))],
    )
}

pub fn float_term(value: f64) -> Node {
    node_with(
        NodeKind::Term,
        Token::none(),
        vec![node(NodeKind::Literal, float_tok(value))],
    )
}

pub fn char_term(c: char) -> Node {
    node_with(
        NodeKind::Term,
        Token::none(),
        vec![node(NodeKind::Literal, char_tok(c))],
    )
}

pub fn var_term(name: &str) -> Node {
    node_with(NodeKind::Term, Token::none(), vec![ident_node(name)])
}

/// `name.field1.field2...`
pub fn field_term(name: &str, fields: &[&str]) -> Node {
    let mut children = vec![ident_node(name)];
    children.extend(fields.iter().map(|f| node(NodeKind::StructField, id(f))));

    node_with(NodeKind::Term, Token::none(), children)
}

/// `name[index]...`
pub fn index_term(name: &str, indices: Vec<Node>) -> Node {
    let mut children = vec![ident_node(name)];

    for index in indices {
        children.push(node_with(NodeKind::Subscript, Token::none(), vec![index]));
    }

    node_with(NodeKind::Term, Token::none(), children)
}

pub fn str_literal_node(contents: &str) -> Node {
    node(NodeKind::StringLiteral, str_tok(contents))
}

pub fn init_list(items: Vec<Node>) -> Node {
    node_with(NodeKind::InitializerList, Token::none(), items)
}

pub fn bin_expr(lhs: Node, operator: TokenKind, rhs: Node) -> Node {
    node_with(
        NodeKind::Expression,
        Token::none(),
        vec![lhs, node(NodeKind::Operator, op_tok(operator)), rhs],
    )
}

pub fn bin_expr_at(lhs: Node, operator: TokenKind, line: usize, rhs: Node) -> Node {
    node_with(
        NodeKind::Expression,
        Token::none(),
        vec![
            lhs,
            node(NodeKind::Operator, op_tok_at(operator, line, 0)),
            rhs,
        ],
    )
}

pub fn unary_term(operator: TokenKind, operand: Node) -> Node {
    node_with(
        NodeKind::Term,
        Token::none(),
        vec![node_with(
            NodeKind::UnaryOperator,
            op_tok(operator),
            vec![operand],
        )],
    )
}

pub fn call_node(name: &str, args: Vec<Node>) -> Node {
    node_with(NodeKind::FunctionCall, id(name), args)
}

pub fn call_term(name: &str, args: Vec<Node>) -> Node {
    node_with(NodeKind::Term, Token::none(), vec![call_node(name, args)])
}

pub fn method_call_node(target: Node, name: &str, args: Vec<Node>) -> Node {
    let mut children = vec![target];
    children.extend(args);

    node_with(NodeKind::MethodCall, id(name), children)
}

/* Statements */

pub fn assign_node(lhs: Node, operator: TokenKind, rhs: Node) -> Node {
    node_with(
        NodeKind::Assignment,
        Token::none(),
        vec![lhs, node(NodeKind::AssignOperator, op_tok(operator)), rhs],
    )
}

pub fn return_node(value: Option<Node>) -> Node {
    node_with(
        NodeKind::Return,
        Token::none(),
        value.into_iter().collect(),
    )
}

pub fn if_node(condition: Node, then_block: Vec<Node>, rest: Vec<Node>) -> Node {
    let mut children = vec![condition, block_node(then_block)];
    children.extend(rest);

    node_with(NodeKind::If, Token::none(), children)
}

pub fn elseif_node(condition: Node, body: Vec<Node>) -> Node {
    node_with(
        NodeKind::ElseIf,
        Token::none(),
        vec![condition, block_node(body)],
    )
}

pub fn else_node(body: Vec<Node>) -> Node {
    node_with(NodeKind::Else, Token::none(), vec![block_node(body)])
}

pub fn while_node(condition: Node, body: Vec<Node>) -> Node {
    node_with(
        NodeKind::While,
        Token::none(),
        vec![condition, block_node(body)],
    )
}

pub fn while_node_at(line: usize, condition: Node, body: Vec<Node>) -> Node {
    node_with(
        NodeKind::While,
        id_at("while", line, 0),
        vec![condition, block_node(body)],
    )
}

pub fn for_node(init: Node, condition: Node, step: Node, body: Vec<Node>) -> Node {
    node_with(
        NodeKind::For,
        Token::none(),
        vec![init, condition, step, block_node(body)],
    )
}

pub fn print_node(items: Vec<Node>) -> Node {
    node_with(NodeKind::Print, Token::none(), items)
}

pub fn println_node(items: Vec<Node>) -> Node {
    node_with(NodeKind::PrintLine, Token::none(), items)
}

pub fn input_node(target: Node) -> Node {
    node_with(NodeKind::Input, Token::none(), vec![target])
}

/* Compilation helpers */

/// Compiles a single module named `main`
pub fn compile_main(ast: Node) -> Result<ModulesMap, CompileError> {
    let mut provider = MapProvider::new().with_module("main", ast);
    uhllc::compile_program("main", &mut provider)
}

/// The entries of `main`'s `main` function
pub fn main_function(modules: &ModulesMap) -> &FunctionDescription {
    &modules["main"].functions["_main_main"]
}

pub fn opcodes(function: &FunctionDescription) -> Vec<Opcode> {
    function.entries.iter().map(|entry| entry.opcode).collect()
}

/// Wraps statements into `fn main() -> void { ... }` inside a program
pub fn main_program(statements: Vec<Node>) -> Node {
    program_node(vec![fn_node("main", vec![], vec![], statements)])
}
