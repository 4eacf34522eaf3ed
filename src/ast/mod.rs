//! The AST surface handed over by the external parser.
//!
//! The parser is a separate collaborator; this module only defines the node
//! and token shapes the lowering passes consume. Shapes worth knowing when
//! constructing trees by hand (tests do this a lot):
//!
//!   - Declarations (locals, globals, struct fields, parameters, function
//!     return types) all share one layout: an `Identifier` child carrying the
//!     declared name, then zero or more `Module` qualifiers, the type
//!     `Identifier` (optionally followed by `GenericTypeParam` arguments,
//!     `PointerStar`, `EmptySubscript` or fixed `Subscript`s), and for locals
//!     an optional trailing initializer expression.
//!   - Access chains are `Term` nodes: an `Identifier` followed by any mix of
//!     `StructField` and `Subscript` children. Module qualified terms prefix
//!     `Module` children.
//!   - `Function` nodes are `[Identifier(name), Param*, return type nodes...,
//!     Block]`; `ExternFunction` is the same without the block.

use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenKind {
    None,
    Identifier,

    /* Literals */
    IntLiteral,
    HexLiteral,
    BinLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,

    /* Binary operators */
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    LeftShift,
    RightShift,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,

    /* Conditional operators */
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    EqualEqual,
    NotEqual,

    /* Unary */
    BitwiseNot,

    /* Assignment operators */
    Equal,
    PlusEqual,
    MinusEqual,
    MultiplyEqual,
    DivideEqual,
    ModuloEqual,
    OrEqual,
    AndEqual,
    XorEqual,
}

impl TokenKind {
    pub fn is_bitwise_operator(self) -> bool {
        matches!(
            self,
            TokenKind::LeftShift
                | TokenKind::RightShift
                | TokenKind::BitwiseAnd
                | TokenKind::BitwiseXor
                | TokenKind::BitwiseOr
                | TokenKind::BitwiseNot
                | TokenKind::OrEqual
                | TokenKind::AndEqual
                | TokenKind::XorEqual
        )
    }

    pub fn is_conditional_operator(self) -> bool {
        matches!(
            self,
            TokenKind::LogicalAnd
                | TokenKind::LogicalOr
                | TokenKind::LogicalNot
                | TokenKind::LessThan
                | TokenKind::LessThanOrEqual
                | TokenKind::GreaterThan
                | TokenKind::GreaterThanOrEqual
                | TokenKind::EqualEqual
                | TokenKind::NotEqual
        )
    }
}

/// A source token as produced by the external lexer. `text` is the exact
/// source spelling; `unescaped` differs from it only for string and char
/// literals, where escape sequences have been processed.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub unescaped: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        let text = text.into();

        Token {
            kind,
            unescaped: text.clone(),
            text,
            line,
            column,
        }
    }

    pub fn with_unescaped(
        kind: TokenKind,
        text: impl Into<String>,
        unescaped: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Token {
            kind,
            text: text.into(),
            unescaped: unescaped.into(),
            line,
            column,
        }
    }

    pub fn identifier(text: impl Into<String>, line: usize, column: usize) -> Self {
        Token::new(TokenKind::Identifier, text, line, column)
    }

    /// A fabricated token for nodes that have no source anchor of their own
    pub fn none() -> Self {
        Token::new(TokenKind::None, "", 0, 0)
    }

    /// Suffix used to derive unique label and string-data names from source
    /// positions
    pub fn line_col_suffix(&self) -> String {
        format!("_l{}_c{}", self.line, self.column)
    }

    /// The function name a user defined operator overload must carry for this
    /// operator token
    pub fn operator_function_name(&self) -> Option<&'static str> {
        match self.kind {
            TokenKind::Plus | TokenKind::PlusEqual => Some("add"),
            TokenKind::Minus | TokenKind::MinusEqual => Some("subtract"),
            TokenKind::Multiply | TokenKind::MultiplyEqual => Some("multiply"),
            TokenKind::Divide | TokenKind::DivideEqual => Some("divide"),
            TokenKind::Modulo | TokenKind::ModuloEqual => Some("remainder"),
            TokenKind::RightShift => Some("rightShift"),
            TokenKind::LeftShift => Some("leftShift"),
            TokenKind::BitwiseAnd | TokenKind::AndEqual => Some("bitwiseAnd"),
            TokenKind::BitwiseXor | TokenKind::XorEqual => Some("bitwiseXor"),
            TokenKind::BitwiseOr | TokenKind::OrEqual => Some("bitwiseOr"),
            _ => None,
        }
    }

    /// Parses the integer value of an int/hex/bin/char literal token
    pub fn int_value(&self) -> Option<i64> {
        match self.kind {
            TokenKind::IntLiteral => self.text.parse().ok(),
            TokenKind::HexLiteral => {
                i64::from_str_radix(self.text.trim_start_matches("0x"), 16).ok()
            }
            TokenKind::BinLiteral => {
                i64::from_str_radix(self.text.trim_start_matches("0b"), 2).ok()
            }
            TokenKind::CharLiteral => self.unescaped.bytes().next().map(|b| b as i64),
            _ => None,
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self.kind {
            TokenKind::FloatLiteral => self.text.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NodeKind {
    Program,
    Use,
    Generic,
    From,
    Block,
    Module,
    Function,
    ExternFunction,
    Struct,
    Enum,
    Def,
    Var,
    Const,
    If,
    ElseIf,
    Else,
    While,
    DoWhile,
    For,
    Loop,
    Cast,
    PointerCast,
    PointerArrayCast,
    Break,
    Continue,
    Assignment,
    Return,
    FunctionCall,
    MethodCall,
    Param,
    MutParam,
    Expression,
    StringLiteral,
    MultilineStringLiteral,
    Literal,
    Identifier,
    AssignOperator,
    Operator,
    UnaryOperator,
    Subscript,
    PointerStar,
    EmptySubscript,
    StructField,
    InitializerList,
    Term,
    SizeOf,
    TypeOf,
    Print,
    PrintLine,
    Space,
    Input,
    GenericTypeParam,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub token: Token,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, token: Token) -> Self {
        Node {
            kind,
            token,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, token: Token, children: Vec<Node>) -> Self {
        Node {
            kind,
            token,
            children,
        }
    }

    pub fn nth_child_is(&self, kind: NodeKind, index: usize) -> bool {
        self.children.get(index).is_some_and(|c| c.kind == kind)
    }

    pub fn nth_child_token(&self, index: usize) -> &Token {
        &self.children[index].token
    }

    /// Whether any type argument list appears among the children (the marker
    /// that this type reference requires monomorphization)
    pub fn has_generic_type_param(&self) -> bool {
        self.children
            .iter()
            .any(|c| c.kind == NodeKind::GenericTypeParam)
    }

    /// Whether this subtree mentions the given identifier anywhere
    pub fn mentions_identifier(&self, name: &str) -> bool {
        (self.kind == NodeKind::Identifier && self.token.text == name)
            || self.children.iter().any(|c| c.mentions_identifier(name))
    }
}
