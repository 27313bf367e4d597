//! Error types for the assembly code generator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeGenError {
    /// §4.4 `sizeof`: `void`, an unresolved forward declaration, or an
    /// otherwise incomplete/unknown type has no size.
    #[error("Cannot get size of type: {0}")]
    SizeError(String),

    #[error("Undefined symbol '{0}'")]
    UndefinedSymbol(String),

    /// A register conversion index outside `0..BLOCK_WIDTH` rows — would
    /// indicate a bug in register arithmetic, never reachable from
    /// well-formed input.
    #[error("Invalid register index: {0}")]
    IllegalState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CodeGenError>;
