//! Shared primitives for the Slate compiler front end.
//!
//! Every stage (lexer, preprocessor, parser, code generator) is built on the
//! same small set of foundations: a generic cursor ([`processor`]), a single
//! tagged error type ([`error`]), a non-fatal diagnostic channel
//! ([`diagnostic`]), a string interner ([`symbol`]), and a typed-index arena
//! vector ([`index_vec`]).

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod processor;
pub mod symbol;

pub use error::{CompileError, CompileResult};
pub use processor::{ErrorKind, Processor};
pub use symbol::{Interner, Symbol};
