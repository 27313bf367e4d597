//! Identifier, reserved-word, and `asm` block lexing.

use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use super::Lexer;
use crate::token::{Token, TokenKind};

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub(super) fn lex_identifier(lexer: &mut Lexer, line: u32) -> CompileResult<Token> {
    let mut text = String::new();
    while lexer.has_peek() && is_ident_continue(lexer.peek()) {
        text.push(lexer.bump());
    }
    debug_assert!(!text.is_empty() && is_ident_start(text.chars().next().unwrap()));

    if text == "true" || text == "false" {
        return Ok(Token::new(TokenKind::Literal, line, text));
    }

    if text == "asm" {
        return lex_asm_block(lexer, line);
    }

    match TokenKind::reserved_word(&text) {
        Some(kind) => Ok(Token::new(kind, line, text)),
        None => Ok(Token::new(TokenKind::Identifier, line, text)),
    }
}

/// `asm` switches the lexer into verbatim mode: skip to the opening `{`,
/// then copy everything up to the matching `}` as the token's value,
/// tracking newlines along the way.
fn lex_asm_block(lexer: &mut Lexer, line: u32) -> CompileResult<Token> {
    lexer.skip_whitespace_and_comments();
    if lexer.peek() != '{' {
        return Err(lexer.fail(ErrorKind::MissingToken, "Expected '{' to open asm block"));
    }
    lexer.bump();

    let mut depth = 1;
    let mut body = String::new();
    loop {
        if !lexer.has_peek() {
            return Err(lexer.fail(ErrorKind::MissingToken, "Unterminated asm block"));
        }
        let c = lexer.bump();
        match c {
            '{' => {
                depth += 1;
                body.push(c);
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                body.push(c);
            }
            _ => body.push(c),
        }
    }
    Ok(Token::new(TokenKind::Asm, line, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifier() {
        let mut lexer = Lexer::new("foo_bar");
        let t = lex_identifier(&mut lexer, 1).unwrap();
        assert_eq!(t.kind, TokenKind::Identifier);
        assert_eq!(t.value, "foo_bar");
    }

    #[test]
    fn reserved_word_wins() {
        let mut lexer = Lexer::new("namespace");
        let t = lex_identifier(&mut lexer, 1).unwrap();
        assert_eq!(t.kind, TokenKind::Namespace);
    }

    #[test]
    fn asm_block_captures_body_verbatim() {
        let mut lexer = Lexer::new("asm { mov rax, 1\n ret }");
        let t = lex_identifier(&mut lexer, 1).unwrap();
        assert_eq!(t.kind, TokenKind::Asm);
        assert_eq!(t.value, " mov rax, 1\n ret ");
    }

    #[test]
    fn nested_braces_in_asm_block_are_kept() {
        let mut lexer = Lexer::new("asm { if (x) { y } }");
        let t = lex_identifier(&mut lexer, 1).unwrap();
        assert_eq!(t.value, " if (x) { y } ");
    }
}
