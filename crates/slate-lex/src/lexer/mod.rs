//! The lexer: source text in, a flat [`Token`](crate::token::Token) stream out.

mod identifier;
mod number;
mod string;

use slate_util::processor::Processor;
use slate_util::CompileResult;

use crate::token::{Token, TokenKind};

/// Walks source text one character at a time, tracking the current line and
/// whether we're inside a comment.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer { chars: source.chars().collect(), pos: 0, line: 1 }
    }

    /// Consume one character via the generic cursor, bumping the line
    /// counter when it's a newline. The base [`Processor::consume`] knows
    /// nothing about lines, so every call site that must cross a newline
    /// goes through this instead.
    fn bump(&mut self) -> char {
        let c = self.consume();
        if c == '\n' {
            self.line += 1;
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' | '\n' => {
                    self.bump();
                }
                '/' if self.peek_at(1) == '/' => {
                    while self.has_peek() && self.peek() != '\n' {
                        self.bump();
                    }
                }
                '/' if self.peek_at(1) == '*' => {
                    self.bump();
                    self.bump();
                    while self.has_peek() && !(self.peek() == '*' && self.peek_at(1) == '/') {
                        self.bump();
                    }
                    if self.has_peek() {
                        self.bump();
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Run the full lexer to completion, producing a token stream terminated
    /// by a single sentinel [`TokenKind::Null`] token.
    pub fn tokenize(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if !self.has_peek() {
                break;
            }
            tokens.push(self.next_token()?);
        }
        tokens.push(Token::null());
        Ok(tokens)
    }

    fn next_token(&mut self) -> CompileResult<Token> {
        let line = self.line;
        let c = self.peek();

        macro_rules! punct {
            ($kind:expr) => {{
                self.bump();
                Ok(Token::punct($kind, line))
            }};
        }

        match c {
            '(' => punct!(TokenKind::OpenParen),
            ')' => punct!(TokenKind::CloseParen),
            '{' => punct!(TokenKind::OpenCurly),
            '}' => punct!(TokenKind::CloseCurly),
            '<' => punct!(TokenKind::OpenAngle),
            '>' => punct!(TokenKind::CloseAngle),
            '[' => punct!(TokenKind::OpenSquare),
            ']' => punct!(TokenKind::CloseSquare),
            ';' => punct!(TokenKind::Semicolon),
            '.' => punct!(TokenKind::Dot),
            ',' => punct!(TokenKind::Comma),
            '|' => punct!(TokenKind::Pipe),
            '@' => punct!(TokenKind::At),
            '$' => punct!(TokenKind::PublicClosure),
            '#' => punct!(TokenKind::Preprocessor),
            ':' => {
                self.bump();
                if self.peek() == ':' {
                    self.bump();
                    Ok(Token::punct(TokenKind::DColon, line))
                } else {
                    Ok(Token::punct(TokenKind::Colon, line))
                }
            }
            '-' if self.peek_at(1) == '>' => {
                self.bump();
                self.bump();
                Ok(Token::punct(TokenKind::Arrow, line))
            }
            '\'' => string::lex_char(self, line),
            '"' => string::lex_string(self, line),
            c if c.is_ascii_digit() => Ok(number::lex_number(self, line)),
            c if c.is_alphabetic() || c == '_' => identifier::lex_identifier(self, line),
            _ => Ok(self.lex_symbols(line)),
        }
    }

    /// Anything not whitespace, alphanumeric, or single-character
    /// punctuation is folded into a run of "symbols" (operators).
    fn lex_symbols(&mut self, line: u32) -> Token {
        let mut value = String::new();
        while self.has_peek() && is_symbol_char(self.peek()) {
            value.push(self.bump());
        }
        if value.is_empty() {
            // A genuinely unrecognised single character (e.g. a stray '`').
            value.push(self.bump());
        }
        Token::new(TokenKind::Symbols, line, value)
    }
}

fn is_single_punct(c: char) -> bool {
    matches!(c, '(' | ')' | '{' | '}' | '<' | '>' | '[' | ']' | ';' | ':' | '.' | ',' | '|' | '@' | '$' | '#')
}

fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && !(c.is_alphanumeric() || c == '_') && !is_single_punct(c)
}

impl Processor for Lexer {
    type Item = char;

    fn items(&self) -> &[char] {
        &self.chars
    }
    fn cursor(&self) -> usize {
        self.pos
    }
    fn set_cursor(&mut self, pos: usize) {
        self.pos = pos;
    }
    fn null_item(&self) -> char {
        '\0'
    }
    fn current_line(&self) -> u32 {
        self.line
    }
    fn render_current(&self) -> String {
        self.peek().to_string()
    }
    fn items_equal(&self, a: &char, b: &char) -> bool {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn punctuation_and_arrow() {
        assert_eq!(
            kinds("() {} -> :: :"),
            vec![
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::OpenCurly,
                TokenKind::CloseCurly,
                TokenKind::Arrow,
                TokenKind::DColon,
                TokenKind::Colon,
                TokenKind::Null,
            ]
        );
    }

    #[test]
    fn line_comment_is_skipped() {
        let tokens = Lexer::new("var // hello\nx").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Var);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn block_comment_tracks_newlines() {
        let tokens = Lexer::new("/* a\nb */ x").tokenize().unwrap();
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn symbols_run_is_one_token() {
        let tokens = Lexer::new("a == b").tokenize().unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Symbols);
        assert_eq!(tokens[1].value, "==");
    }

    #[test]
    fn reserved_words_win_over_identifier() {
        assert_eq!(kinds("var int return"), vec![TokenKind::Var, TokenKind::Int, TokenKind::Return, TokenKind::Null]);
    }

    #[test]
    fn true_false_lex_as_literal() {
        let tokens = Lexer::new("true false").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Literal);
        assert_eq!(tokens[0].value, "true");
        assert_eq!(tokens[1].kind, TokenKind::Literal);
        assert_eq!(tokens[1].value, "false");
    }

    // ------------------------------------------------------------------
    // Property-based tests over arbitrary inputs.
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn arbitrary_identifier_strings_lex_as_one_token(input in "[a-zA-Z_][a-zA-Z0-9_]{0,30}") {
            let tokens = Lexer::new(&input).tokenize().unwrap();
            prop_assert_eq!(tokens.len(), 2); // lexeme + Null sentinel
            let kind = tokens[0].kind;
            let is_reserved = TokenKind::reserved_word(&input).is_some();
            if is_reserved {
                prop_assert_ne!(kind, TokenKind::Identifier);
            } else {
                prop_assert_eq!(kind, TokenKind::Identifier);
                prop_assert_eq!(&tokens[0].value, &input);
            }
        }

        #[test]
        fn arbitrary_decimal_digit_runs_lex_as_one_literal(digits in "[0-9]{1,15}") {
            let tokens = Lexer::new(&digits).tokenize().unwrap();
            prop_assert_eq!(tokens.len(), 2);
            prop_assert_eq!(tokens[0].kind, TokenKind::Literal);
            prop_assert_eq!(&tokens[0].value, &digits);
        }
    }
}
