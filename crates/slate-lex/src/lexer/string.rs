//! Character and string literal lexing.
//!
//! The lexeme keeps its surrounding quote characters (`'x'`, `"abc"`) — the
//! later literal-construction step in `slate-par` tells char/string apart
//! by inspecting the first/last byte, exactly as `Literal::Literal(string)`
//! does in the original `Literals.cpp`.

use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use super::Lexer;
use crate::token::{Token, TokenKind};

fn decode_escape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

pub(super) fn lex_char(lexer: &mut Lexer, line: u32) -> CompileResult<Token> {
    lexer.bump(); // opening '
    let mut value = String::from('\'');
    let c = lexer.bump();
    if c == '\\' {
        value.push(decode_escape(lexer.bump()));
    } else {
        value.push(c);
    }
    if lexer.peek() != '\'' {
        return Err(lexer.fail(ErrorKind::InvalidToken, "Expected closing single quote"));
    }
    lexer.bump();
    value.push('\'');
    Ok(Token::new(TokenKind::Literal, line, value))
}

pub(super) fn lex_string(lexer: &mut Lexer, line: u32) -> CompileResult<Token> {
    lexer.bump(); // opening "
    let mut value = String::from('"');
    loop {
        if !lexer.has_peek() {
            return Err(lexer.fail(ErrorKind::InvalidToken, "Unterminated string literal"));
        }
        let c = lexer.bump();
        if c == '"' {
            break;
        }
        if c == '\\' {
            value.push(decode_escape(lexer.bump()));
        } else {
            value.push(c);
        }
    }
    value.push('"');
    Ok(Token::new(TokenKind::Literal, line, value))
}
