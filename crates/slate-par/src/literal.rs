//! Literal construction from a lexed token value.
//!
//! Grounded on `Literals.cpp`: the lexer keeps the raw lexeme, including the
//! surrounding quote characters for chars/strings, and this module is the
//! single place that turns a lexeme into a typed [`Literal`].

use slate_util::processor::ErrorKind;
use slate_util::CompileResult;

/// `Literal` from §3: a tagged variant over the literal kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Boolean(bool),
    Str(String),
    Null,
}

/// Parse a lexeme (the raw text of a `literal` token) into a [`Literal`].
///
/// `line`/`context` feed the error if the lexeme is malformed; they come
/// from whatever processor is driving the parse (so the error is tagged
/// with the caller's current line, not a fabricated one).
pub fn parse_literal(lexeme: &str, line: u32, context: &str) -> CompileResult<Literal> {
    if lexeme == "true" {
        return Ok(Literal::Boolean(true));
    }
    if lexeme == "false" {
        return Ok(Literal::Boolean(false));
    }

    // `Literal::Literal(string)` distinguishes char/string by checking
    // whether the lexeme is wrapped in matching quote characters.
    if lexeme.len() >= 2 && lexeme.starts_with('\'') && lexeme.ends_with('\'') {
        let inner = &lexeme[1..lexeme.len() - 1];
        let mut chars = inner.chars();
        let c = chars.next().ok_or_else(|| {
            ErrorKind::InvalidToken.at(line, context.to_string(), "Empty char literal".to_string())
        })?;
        return Ok(Literal::Char(c));
    }
    if lexeme.len() >= 2 && lexeme.starts_with('"') && lexeme.ends_with('"') {
        return Ok(Literal::Str(lexeme[1..lexeme.len() - 1].to_string()));
    }

    parse_numeric(lexeme, line, context)
}

fn parse_numeric(lexeme: &str, line: u32, context: &str) -> CompileResult<Literal> {
    let (body, suffix) = match lexeme.chars().last() {
        Some(c) if "LFDBOH".contains(c) && lexeme.len() > 1 => {
            (&lexeme[..lexeme.len() - 1], Some(c))
        }
        _ => (lexeme, None),
    };
    let has_dot = body.contains('.');

    let fail = |message: &str| -> slate_util::CompileError {
        ErrorKind::InvalidToken.at(line, context.to_string(), message.to_string())
    };

    match suffix {
        None => {
            if has_dot {
                body.parse::<f64>().map(Literal::Double).map_err(|_| fail("Invalid float literal"))
            } else {
                body.parse::<i32>().map(Literal::Int).map_err(|_| fail("Invalid int literal"))
            }
        }
        Some('F') => body.parse::<f32>().map(Literal::Float).map_err(|_| fail("Invalid float literal")),
        Some('D') => body.parse::<f64>().map(Literal::Double).map_err(|_| fail("Invalid double literal")),
        Some('L') => {
            if has_dot {
                return Err(fail("A dotted lexeme cannot carry an integer-only suffix"));
            }
            body.parse::<i64>().map(Literal::Long).map_err(|_| fail("Invalid long literal"))
        }
        Some('O') => {
            if has_dot {
                return Err(fail("A dotted lexeme cannot carry an integer-only suffix"));
            }
            i64::from_str_radix(body, 8).map(Literal::Long).map_err(|_| fail("Invalid octal literal"))
        }
        Some('H') => {
            if has_dot {
                return Err(fail("A dotted lexeme cannot carry an integer-only suffix"));
            }
            i64::from_str_radix(body, 16).map(Literal::Long).map_err(|_| fail("Invalid hex literal"))
        }
        // `B` on a dotted lexeme reinterprets the double's IEEE-754 bit
        // pattern as a 64-bit integer; on a plain lexeme it is binary.
        Some('B') => {
            if has_dot {
                body.parse::<f64>().map(|f| Literal::Long(f.to_bits() as i64)).map_err(|_| fail("Invalid float literal"))
            } else {
                i64::from_str_radix(body, 2).map(Literal::Long).map_err(|_| fail("Invalid binary literal"))
            }
        }
        Some(_) => unreachable!("suffix set is {{L,F,D,B,O,H}}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_int() {
        assert_eq!(parse_literal("42", 1, "").unwrap(), Literal::Int(42));
    }

    #[test]
    fn long_suffix() {
        assert_eq!(parse_literal("42L", 1, "").unwrap(), Literal::Long(42));
    }

    #[test]
    fn hex_suffix() {
        assert_eq!(parse_literal("2aH", 1, "").unwrap(), Literal::Long(42));
    }

    #[test]
    fn octal_suffix() {
        assert_eq!(parse_literal("52O", 1, "").unwrap(), Literal::Long(42));
    }

    #[test]
    fn dotted_float() {
        assert_eq!(parse_literal("1.5", 1, "").unwrap(), Literal::Double(1.5));
    }

    #[test]
    fn binary_reinterprets_double_bits() {
        match parse_literal("1.5B", 1, "").unwrap() {
            Literal::Long(bits) => assert_eq!(bits, 1.5f64.to_bits() as i64),
            other => panic!("expected Long, got {other:?}"),
        }
    }

    #[test]
    fn dotted_lexeme_with_integer_only_suffix_fails() {
        assert!(parse_literal("1.5L", 1, "").is_err());
    }

    #[test]
    fn char_literal_preserves_quotes_in_lexeme() {
        assert_eq!(parse_literal("'a'", 1, "").unwrap(), Literal::Char('a'));
    }

    #[test]
    fn string_literal_strips_quotes() {
        assert_eq!(parse_literal("\"hi\"", 1, "").unwrap(), Literal::Str("hi".into()));
    }

    #[test]
    fn true_false() {
        assert_eq!(parse_literal("true", 1, "").unwrap(), Literal::Boolean(true));
        assert_eq!(parse_literal("false", 1, "").unwrap(), Literal::Boolean(false));
    }
}
