//! Directive handling: `#define`, `#macro`, `#keyword`, `#template`,
//! `#undef`, `#ifdef`/`#ifndef`, and `#logi`/`#logw`/`#loge`.

use slate_lex::{Token, TokenKind};
use slate_util::diagnostic::Level;
use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use crate::{Preprocessor, Template};

fn tag(kind: TokenKind) -> Token {
    Token::new(kind, 0, "")
}

pub(crate) fn preprocess_directive(pp: &mut Preprocessor, out: &mut Vec<Token>) -> CompileResult<()> {
    if pp.try_consume(&tag(TokenKind::Define)) {
        define(pp)
    } else if pp.try_consume(&tag(TokenKind::Macro)) {
        macro_def(pp)
    } else if pp.try_consume(&tag(TokenKind::Keyword)) {
        keyword_def(pp)
    } else if pp.try_consume(&tag(TokenKind::Template)) {
        template_def(pp)
    } else if pp.try_consume(&tag(TokenKind::Undef)) {
        undef(pp)
    } else if pp.peek().kind == TokenKind::Ifdef || pp.peek().kind == TokenKind::Ifndef {
        conditional(pp, out)
    } else if matches!(pp.peek().kind, TokenKind::Logi | TokenKind::Logw | TokenKind::Loge) {
        log_directive(pp)
    } else {
        Err(pp.fail(ErrorKind::SyntaxError, "Unknown preprocessor directive"))
    }
}

fn body_until_hash(pp: &mut Preprocessor) -> CompileResult<Vec<Token>> {
    let mut body = Vec::new();
    pp.do_until_find_or(
        &tag(TokenKind::Preprocessor),
        |p| {
            body.push(p.consume());
            Ok(())
        },
        ErrorKind::MissingToken,
        "Expected '#'",
    )?;
    Ok(body)
}

fn define(pp: &mut Preprocessor) -> CompileResult<()> {
    let name = pp.get_identifier()?;
    pp.must_be_unique(&name)?;
    let body = body_until_hash(pp)?;
    pp.definitions.insert(name, body);
    Ok(())
}

fn macro_def(pp: &mut Preprocessor) -> CompileResult<()> {
    let name = pp.get_identifier()?;
    pp.must_be_unique(&name)?;
    pp.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    let mut params = Vec::new();
    pp.do_until_find_sep_or(
        &tag(TokenKind::CloseParen),
        |p| {
            params.push(p.get_identifier()?);
            Ok(())
        },
        &tag(TokenKind::Comma),
        ErrorKind::MissingToken,
        "Expected ','",
        ErrorKind::MissingToken,
        "Expected ')'",
    )?;
    let body = body_until_hash(pp)?;
    pp.macros.insert(name, (params, body));
    Ok(())
}

fn keyword_def(pp: &mut Preprocessor) -> CompileResult<()> {
    let name = pp.get_identifier()?;
    pp.must_be_unique(&name)?;
    pp.try_consume_or(&tag(TokenKind::OpenAngle), ErrorKind::MissingToken, "Expected '<'")?;
    let placeholder = pp.consume();
    pp.try_consume_or(&tag(TokenKind::CloseAngle), ErrorKind::MissingToken, "Expected '>'")?;
    let body = body_until_hash(pp)?;
    pp.keywords.insert(name, (placeholder, body));
    Ok(())
}

fn template_def(pp: &mut Preprocessor) -> CompileResult<()> {
    let name = pp.get_identifier()?;
    pp.must_be_unique(&name)?;

    pp.try_consume_or(&tag(TokenKind::OpenAngle), ErrorKind::MissingToken, "Expected '<'")?;
    let mut generics = Vec::new();
    pp.do_until_find_sep_or(
        &tag(TokenKind::CloseAngle),
        |p| {
            generics.push(p.get_identifier()?);
            Ok(())
        },
        &tag(TokenKind::Comma),
        ErrorKind::MissingToken,
        "Expected ','",
        ErrorKind::MissingToken,
        "Expected '>'",
    )?;

    pp.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    let mut params = Vec::new();
    pp.do_until_find_sep_or(
        &tag(TokenKind::CloseParen),
        |p| {
            params.push(p.get_identifier()?);
            Ok(())
        },
        &tag(TokenKind::Comma),
        ErrorKind::MissingToken,
        "Expected ','",
        ErrorKind::MissingToken,
        "Expected ')'",
    )?;

    pp.try_consume_or(&tag(TokenKind::OpenSquare), ErrorKind::MissingToken, "Expected '['")?;
    let body = pp.get_identifier()?;
    pp.try_consume_or(&tag(TokenKind::CloseSquare), ErrorKind::MissingToken, "Expected ']'")?;

    let content = body_until_hash(pp)?;
    pp.templates.insert(name, Template { generics, params, body, content });
    Ok(())
}

fn undef(pp: &mut Preprocessor) -> CompileResult<()> {
    let name = pp.get_identifier()?;
    if pp.definitions.remove(&name).is_some()
        || pp.macros.remove(&name).is_some()
        || pp.keywords.remove(&name).is_some()
        || pp.templates.remove(&name).is_some()
    {
        Ok(())
    } else {
        Err(pp.fail(ErrorKind::SyntaxError, "Definition does not exist"))
    }
}

// `#endif` is itself a directive token (`#` followed by `endif`), so the
// terminator here is the two-token sequence rather than a single tag —
// matching it one token at a time (as the generic `do_until_find` helper
// does) would hand the leading `#` to `preprocess_single` first and never
// recognise `endif` as a directive keyword in its own right.
fn conditional(pp: &mut Preprocessor, out: &mut Vec<Token>) -> CompileResult<()> {
    let negative = pp.consume().kind == TokenKind::Ifndef;
    let name = pp.get_identifier()?;
    let unique = pp.is_unique(&name);
    let ignore = (unique && !negative) || (!unique && negative);

    loop {
        if !pp.has_peek() {
            return Err(pp.fail(ErrorKind::MissingToken, "Expected '#endif'"));
        }
        if pp.peek().kind == TokenKind::Preprocessor && pp.peek_at(1).kind == TokenKind::Endif {
            pp.consume();
            pp.consume();
            break;
        }
        if ignore {
            pp.consume();
        } else {
            pp.preprocess_single(out)?;
        }
    }
    Ok(())
}

fn log_directive(pp: &mut Preprocessor) -> CompileResult<()> {
    let level = if pp.try_consume(&tag(TokenKind::Logi)) {
        Level::Info
    } else if pp.try_consume(&tag(TokenKind::Logw)) {
        Level::Warning
    } else {
        pp.consume();
        Level::Error
    };

    let mut message = String::new();
    pp.do_until_find_or(
        &tag(TokenKind::Preprocessor),
        |p| {
            message.push_str(&p.consume().value);
            message.push(' ');
            Ok(())
        },
        ErrorKind::MissingToken,
        "Expected '#'",
    )?;
    let message = message.trim_end().to_string();

    match level {
        Level::Info => {
            let line = pp.current_line();
            pp.handler.info(line, message);
        }
        Level::Warning => {
            let line = pp.current_line();
            pp.handler.warn(line, message);
        }
        Level::Error => return Err(pp.fail(ErrorKind::DirectiveError, message)),
    }
    Ok(())
}
