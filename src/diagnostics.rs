//! Compile error construction and console reporting.
//!
//! Every user-facing diagnostic is pinned to a token's (module, line, column)
//! triple. Lowering functions return `Result<_, CompileError>` and bubble the
//! first error straight out of the pipeline; there is no recovery within a
//! compilation. Callers (a CLI driver, tests) decide what to do with the
//! error; [`report`] renders it the way humans expect to read it.

use colored::Colorize;

use crate::{ast::Token, ir::TypeDescription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A problem with the user's program
    Error,
    /// An unexpected AST shape or broken invariant. If one of these surfaces,
    /// the bug is in the compiler (or the parser handed us garbage), not in
    /// the user's program.
    InternalBug,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub severity: Severity,
    pub message: String,
    pub module: String,
    pub line: usize,
    pub column: usize,
}

impl CompileError {
    pub fn on_token(module: &str, message: impl Into<String>, token: &Token) -> Self {
        CompileError {
            severity: Severity::Error,
            message: message.into(),
            module: module.to_owned(),
            line: token.line,
            column: token.column,
        }
    }

    pub fn type_mismatch(
        module: &str,
        token: &Token,
        expected: &TypeDescription,
        found: &TypeDescription,
    ) -> Self {
        CompileError::on_token(
            module,
            format!("Type mismatch, expected {expected}, found {found}"),
            token,
        )
    }

    pub fn internal(module: &str, token: &Token) -> Self {
        CompileError {
            severity: Severity::InternalBug,
            message: "Unexpected AST shape".to_owned(),
            module: module.to_owned(),
            line: token.line,
            column: token.column,
        }
    }
}

impl core::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (at {}:{}:{})",
            self.message, self.module, self.line, self.column
        )
    }
}

impl std::error::Error for CompileError {}

/// Prints an error to stderr in the standard format. The CLI converts any
/// reported error into a non-zero exit status.
pub fn report(error: &CompileError) {
    let severity = match error.severity {
        Severity::Error => "error".red(),
        Severity::InternalBug => "internal error".red(),
    };

    eprintln!(
        "{}: {} {}",
        severity,
        error.message,
        format!("(at {}:{}:{})", error.module, error.line, error.column).white()
    );
}
