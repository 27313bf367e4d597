//! The single cross-cutting error type for the compiler front end.
//!
//! Every stage (lexer, preprocessor, parser, code generator) reports failure
//! through [`CompileError`]. There is no local recovery: a `CompileError` is
//! always fatal to the current compilation.

use thiserror::Error;

/// One of the twelve tagged error kinds the front end can raise.
///
/// Each variant carries the source line the error occurred on and a short
/// rendering of the token/context that triggered it, matching the
/// `(kind, message)` classifier every stage uses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Missing Token at line {line} (near `{context}`): {message}")]
    MissingToken {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Syntax Error at line {line} (near `{context}`): {message}")]
    SyntaxError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Invalid Token at line {line} (near `{context}`): {message}")]
    InvalidToken {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Redefinition Error at line {line} (near `{context}`): {message}")]
    RedefinitionError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Logic Error at line {line} (near `{context}`): {message}")]
    LogicError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Type Error at line {line} (near `{context}`): {message}")]
    TypeError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Size Error at line {line} (near `{context}`): {message}")]
    SizeError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Initial Definition Error at line {line} (near `{context}`): {message}")]
    InitialDefinitionError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("File Error at line {line} (near `{context}`): {message}")]
    FileError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Directive Error at line {line} (near `{context}`): {message}")]
    DirectiveError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Internal Error at line {line} (near `{context}`): {message}")]
    InternalError {
        line: u32,
        context: String,
        message: String,
    },

    #[error("Illegal State at line {line} (near `{context}`): {message}")]
    IllegalState {
        line: u32,
        context: String,
        message: String,
    },
}

impl CompileError {
    /// The source line this error was raised on.
    pub fn line(&self) -> u32 {
        match self {
            CompileError::MissingToken { line, .. }
            | CompileError::SyntaxError { line, .. }
            | CompileError::InvalidToken { line, .. }
            | CompileError::RedefinitionError { line, .. }
            | CompileError::LogicError { line, .. }
            | CompileError::TypeError { line, .. }
            | CompileError::SizeError { line, .. }
            | CompileError::InitialDefinitionError { line, .. }
            | CompileError::FileError { line, .. }
            | CompileError::DirectiveError { line, .. }
            | CompileError::InternalError { line, .. }
            | CompileError::IllegalState { line, .. } => *line,
        }
    }
}

/// Result type alias used throughout the front end.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_accessor_matches_every_variant() {
        let err = CompileError::TypeError {
            line: 7,
            context: "x".into(),
            message: "mismatch".into(),
        };
        assert_eq!(err.line(), 7);
    }

    #[test]
    fn display_includes_context_and_message() {
        let err = CompileError::MissingToken {
            line: 3,
            context: ";".into(),
            message: "Expected ';'".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("line 3"));
        assert!(rendered.contains("Expected ';'"));
    }
}
