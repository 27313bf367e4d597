//! Identifier substitution: `@fragment` composition, then resolution in
//! `definitions → internal → keywords → macros → templates` order.

use slate_lex::{Token, TokenKind};
use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use crate::Preprocessor;

fn tag(kind: TokenKind) -> Token {
    Token::new(kind, 0, "")
}

pub(crate) fn preprocess_identifier(pp: &mut Preprocessor, out: &mut Vec<Token>) -> CompileResult<()> {
    let mut ident = pp.consume();

    // Single left-to-right pass: each `@fragment`'s expansion is appended
    // as plain text and is not itself re-scanned for further fragments.
    while pp.try_consume(&tag(TokenKind::At)) {
        let fragment = pp.get_identifier()?;
        if let Some(tokens) = pp.definitions.get(&fragment) {
            for t in tokens.clone() {
                ident.value.push_str(&t.value);
            }
        } else if let Some(tokens) = pp.internal.get(&fragment) {
            for t in tokens.clone() {
                ident.value.push_str(&t.value);
            }
        } else {
            ident.value.push_str(&fragment);
        }
    }

    let name = ident.value.clone();

    if let Some(body) = pp.definitions.get(&name).cloned() {
        return pp.with_tokens(body, 0, |p| p.preprocess_into(out));
    }
    if let Some(body) = pp.internal.get(&name).cloned() {
        return pp.with_tokens(body, 0, |p| p.preprocess_into(out));
    }
    if let Some((placeholder, body)) = pp.keywords.get(&name).cloned() {
        let param = pp.consume();
        return pp.with_internal(placeholder.value.clone(), vec![param], |p| {
            p.with_tokens(body, 0, |p2| p2.preprocess_into(out))
        });
    }
    if let Some((params, body)) = pp.macros.get(&name).cloned() {
        return call_macro(pp, out, params, body);
    }
    if let Some(templ) = pp.templates.get(&name).cloned() {
        return call_template(pp, out, templ);
    }

    out.push(ident);
    Ok(())
}

fn call_macro(
    pp: &mut Preprocessor,
    out: &mut Vec<Token>,
    params: Vec<String>,
    body: Vec<Token>,
) -> CompileResult<()> {
    pp.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    let args = if params.is_empty() {
        pp.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;
        Vec::new()
    } else {
        pp.gather_groups(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?
    };

    if args.len() != params.len() {
        return Err(pp.fail(ErrorKind::SyntaxError, "Macro parameters mismatch"));
    }

    for (name, value) in params.iter().zip(args) {
        pp.internal.insert(name.clone(), value);
    }
    let result = pp.with_tokens(body, 0, |p| p.preprocess_into(out));
    for name in &params {
        pp.internal.remove(name);
    }
    result
}

fn call_template(pp: &mut Preprocessor, out: &mut Vec<Token>, templ: crate::Template) -> CompileResult<()> {
    let generics_value = if !templ.generics.is_empty() {
        pp.try_consume_or(&tag(TokenKind::OpenAngle), ErrorKind::MissingToken, "Expected '<'")?;
        pp.gather_groups(&tag(TokenKind::CloseAngle), ErrorKind::MissingToken, "Expected '>'")?
    } else {
        Vec::new()
    };
    let params_value = if !templ.params.is_empty() {
        pp.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
        pp.gather_groups(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?
    } else {
        Vec::new()
    };

    pp.try_consume_or(&tag(TokenKind::OpenCurly), ErrorKind::MissingToken, "Expected '{'")?;
    let mut body_value = Vec::new();
    pp.do_until_find_or(
        &tag(TokenKind::CloseCurly),
        |p| {
            body_value.push(p.consume());
            Ok(())
        },
        ErrorKind::MissingToken,
        "Expected '}'",
    )?;

    if generics_value.len() != templ.generics.len() {
        return Err(pp.fail(ErrorKind::SyntaxError, "Macro generics mismatch"));
    }
    if params_value.len() != templ.params.len() {
        return Err(pp.fail(ErrorKind::SyntaxError, "Macro parameters mismatch"));
    }

    for (name, value) in templ.generics.iter().zip(generics_value) {
        pp.internal.insert(name.clone(), value);
    }
    for (name, value) in templ.params.iter().zip(params_value) {
        pp.internal.insert(name.clone(), value);
    }
    pp.internal.insert(templ.body.clone(), body_value);

    let result = pp.with_tokens(templ.content.clone(), 0, |p| p.preprocess_into(out));

    for name in &templ.generics {
        pp.internal.remove(name);
    }
    for name in &templ.params {
        pp.internal.remove(name);
    }
    pp.internal.remove(&templ.body);

    result
}
