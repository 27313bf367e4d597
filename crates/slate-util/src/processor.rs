//! The generic cursor abstraction shared by every stage of the front end.
//!
//! The lexer walks characters, the preprocessor and parser walk tokens, and
//! the code generator walks statement nodes — all four are a cursor over an
//! indexed sequence with the same handful of operations. This trait
//! reproduces that abstraction once; each stage implements the small set of
//! required hooks and gets `peek`/`consume`/`try_consume`/`do_until_find` for
//! free.

use crate::error::{CompileError, CompileResult};

/// One of the twelve `(kind, message)` error classifiers, without the line
/// and context that only a live [`Processor`] can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingToken,
    SyntaxError,
    InvalidToken,
    RedefinitionError,
    LogicError,
    TypeError,
    SizeError,
    InitialDefinitionError,
    FileError,
    DirectiveError,
    InternalError,
    IllegalState,
}

impl ErrorKind {
    /// Build the full, line/context-tagged [`CompileError`].
    pub fn at(self, line: u32, context: impl Into<String>, message: impl Into<String>) -> CompileError {
        let context = context.into();
        let message = message.into();
        match self {
            ErrorKind::MissingToken => CompileError::MissingToken { line, context, message },
            ErrorKind::SyntaxError => CompileError::SyntaxError { line, context, message },
            ErrorKind::InvalidToken => CompileError::InvalidToken { line, context, message },
            ErrorKind::RedefinitionError => CompileError::RedefinitionError { line, context, message },
            ErrorKind::LogicError => CompileError::LogicError { line, context, message },
            ErrorKind::TypeError => CompileError::TypeError { line, context, message },
            ErrorKind::SizeError => CompileError::SizeError { line, context, message },
            ErrorKind::InitialDefinitionError => {
                CompileError::InitialDefinitionError { line, context, message }
            }
            ErrorKind::FileError => CompileError::FileError { line, context, message },
            ErrorKind::DirectiveError => CompileError::DirectiveError { line, context, message },
            ErrorKind::InternalError => CompileError::InternalError { line, context, message },
            ErrorKind::IllegalState => CompileError::IllegalState { line, context, message },
        }
    }
}

/// A cursor over an indexed sequence of `Item`s.
///
/// Implementers supply the storage (`items`, `cursor`/`set_cursor`), the
/// sentinel returned past the end (`null_item`), and enough context to tag
/// errors (`current_line`, `render_current`). Everything else — peeking,
/// consuming, the `tryconsume` family, and `do_until_find` — is derived.
pub trait Processor {
    type Item: Clone;

    fn items(&self) -> &[Self::Item];
    fn cursor(&self) -> usize;
    fn set_cursor(&mut self, pos: usize);

    /// The value returned by `peek`/`consume` once the cursor runs past the
    /// end of `items`.
    fn null_item(&self) -> Self::Item;

    /// The source line the cursor is currently positioned at, for error
    /// tagging.
    fn current_line(&self) -> u32;

    /// A short rendering of the current item, used as error context.
    fn render_current(&self) -> String;

    /// Equality used by `try_consume` to match the peeked item against an
    /// expected one. Defaults to item equality where `Item: PartialEq`;
    /// override when a stage only cares about part of the item (e.g. a
    /// token's kind, ignoring its line/value).
    fn items_equal(&self, a: &Self::Item, b: &Self::Item) -> bool;

    fn has_peek_at(&self, offset: isize) -> bool {
        let pos = self.cursor() as isize + offset;
        pos >= 0 && (pos as usize) < self.items().len()
    }

    fn has_peek(&self) -> bool {
        self.has_peek_at(0)
    }

    fn peek_at(&self, offset: isize) -> Self::Item {
        if self.has_peek_at(offset) {
            self.items()[(self.cursor() as isize + offset) as usize].clone()
        } else {
            self.null_item()
        }
    }

    fn peek(&self) -> Self::Item {
        self.peek_at(0)
    }

    fn consume(&mut self) -> Self::Item {
        if self.has_peek() {
            let item = self.items()[self.cursor()].clone();
            self.set_cursor(self.cursor() + 1);
            item
        } else {
            self.null_item()
        }
    }

    fn consume_n(&mut self, amount: usize) {
        for _ in 0..amount {
            self.consume();
        }
    }

    fn try_consume(&mut self, expected: &Self::Item) -> bool {
        let current = self.peek();
        if self.items_equal(&current, expected) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn try_consume_or(
        &mut self,
        expected: &Self::Item,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> CompileResult<Self::Item> {
        let current = self.peek();
        if self.items_equal(&current, expected) {
            Ok(self.consume())
        } else {
            Err(self.fail(kind, message))
        }
    }

    /// Build a tagged [`CompileError`] at the cursor's current position.
    fn fail(&self, kind: ErrorKind, message: impl Into<String>) -> CompileError {
        kind.at(self.current_line(), self.render_current(), message)
    }

    /// Consume items via `body` until `terminator` is seen (and consumed),
    /// or the input runs out. Returns whether `terminator` was found.
    fn do_until_find(
        &mut self,
        terminator: &Self::Item,
        mut body: impl FnMut(&mut Self) -> CompileResult<()>,
    ) -> CompileResult<bool>
    where
        Self: Sized,
    {
        let mut found = false;
        while self.has_peek() {
            if self.try_consume(terminator) {
                found = true;
                break;
            }
            body(self)?;
        }
        Ok(found)
    }

    /// As [`Processor::do_until_find`], but a missing terminator is itself a
    /// `CompileError`.
    fn do_until_find_or(
        &mut self,
        terminator: &Self::Item,
        body: impl FnMut(&mut Self) -> CompileResult<()>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> CompileResult<()>
    where
        Self: Sized,
    {
        if self.do_until_find(terminator, body)? {
            Ok(())
        } else {
            Err(self.fail(kind, message))
        }
    }

    /// As [`Processor::do_until_find`], but each element produced by `body`
    /// must be followed by `separator` unless the terminator comes next.
    fn do_until_find_sep(
        &mut self,
        terminator: &Self::Item,
        mut body: impl FnMut(&mut Self) -> CompileResult<()>,
        separator: &Self::Item,
        sep_kind: ErrorKind,
        sep_message: impl Into<String> + Clone,
    ) -> CompileResult<bool>
    where
        Self: Sized,
    {
        let mut found = false;
        while self.has_peek() {
            if self.try_consume(terminator) {
                found = true;
                break;
            }
            body(self)?;
            if self.try_consume(terminator) {
                found = true;
                break;
            }
            self.try_consume_or(separator, sep_kind, sep_message.clone())?;
        }
        Ok(found)
    }

    /// As [`Processor::do_until_find_sep`], but a missing terminator is
    /// itself a `CompileError`.
    #[allow(clippy::too_many_arguments)]
    fn do_until_find_sep_or(
        &mut self,
        terminator: &Self::Item,
        body: impl FnMut(&mut Self) -> CompileResult<()>,
        separator: &Self::Item,
        sep_kind: ErrorKind,
        sep_message: impl Into<String> + Clone,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> CompileResult<()>
    where
        Self: Sized,
    {
        if self.do_until_find_sep(terminator, body, separator, sep_kind, sep_message)? {
            Ok(())
        } else {
            Err(self.fail(kind, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Digits {
        items: Vec<i32>,
        pos: usize,
    }

    impl Processor for Digits {
        type Item = i32;

        fn items(&self) -> &[i32] {
            &self.items
        }
        fn cursor(&self) -> usize {
            self.pos
        }
        fn set_cursor(&mut self, pos: usize) {
            self.pos = pos;
        }
        fn null_item(&self) -> i32 {
            -1
        }
        fn current_line(&self) -> u32 {
            1
        }
        fn render_current(&self) -> String {
            self.peek().to_string()
        }
        fn items_equal(&self, a: &i32, b: &i32) -> bool {
            a == b
        }
    }

    #[test]
    fn peek_past_end_returns_null() {
        let d = Digits { items: vec![1, 2], pos: 2 };
        assert_eq!(d.peek(), -1);
    }

    #[test]
    fn consume_advances_cursor() {
        let mut d = Digits { items: vec![1, 2, 3], pos: 0 };
        assert_eq!(d.consume(), 1);
        assert_eq!(d.consume(), 2);
        assert_eq!(d.cursor(), 2);
    }

    #[test]
    fn try_consume_or_fails_with_tagged_error() {
        let mut d = Digits { items: vec![1], pos: 0 };
        let err = d.try_consume_or(&9, ErrorKind::MissingToken, "Expected 9").unwrap_err();
        assert!(matches!(err, CompileError::MissingToken { .. }));
    }

    #[test]
    fn do_until_find_collects_until_terminator() {
        let mut d = Digits { items: vec![1, 2, 0, 3], pos: 0 };
        let mut seen = Vec::new();
        let found = d
            .do_until_find(&0, |p| {
                seen.push(p.consume());
                Ok(())
            })
            .unwrap();
        assert!(found);
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(d.cursor(), 3);
    }

    #[test]
    fn do_until_find_sep_requires_separator_between_elements() {
        let mut d = Digits { items: vec![1, 100, 2, 0], pos: 0 };
        let mut seen = Vec::new();
        let found = d
            .do_until_find_sep(
                &0,
                |p| {
                    seen.push(p.consume());
                    Ok(())
                },
                &100,
                ErrorKind::MissingToken,
                "Expected separator",
            )
            .unwrap();
        assert!(found);
        assert_eq!(seen, vec![1, 2]);
    }
}
