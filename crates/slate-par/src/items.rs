//! Item-level builders: declarations that can appear at file scope or
//! inside a block — functions, variables, types, imports, namespaces,
//! defers, aliases, operators, and casts (§4.3).

use slate_lex::{Token, TokenKind};
use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use crate::{
    AliasDecl, AliasUse, Cast, CastDecl, DeferStmt, FuncDecl, ImportStmt, Namesp, Node, NodeId,
    NodeKind, NodePayload, Operation, OperationDecl, Parser, PublicField, ScopeNode, TypeDecl,
    TypeId, VarDecl, Variable,
};

fn tag(kind: TokenKind) -> Token {
    Token::new(kind, 0, "")
}

fn symtag(value: &str) -> Token {
    Token::new(TokenKind::Symbols, 0, value)
}

pub(crate) fn is_func_decl(p: &Parser) -> bool {
    matches!(p.peek().kind, TokenKind::Func | TokenKind::Inline)
}

pub(crate) fn build_func_decl(p: &mut Parser) -> CompileResult<NodeId> {
    if p.scope_depth() > 0 {
        return Err(p.fail(ErrorKind::LogicError, "Cannot declare a function inside a scope"));
    }
    let inline = p.try_consume(&tag(TokenKind::Inline));
    p.try_consume_or(&tag(TokenKind::Func), ErrorKind::MissingToken, "Expected 'func'")?;
    let name = p.get_identifier()?;
    let qualified = p.qualify(&name);

    p.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    let mut params = Vec::new();
    if p.peek().kind != TokenKind::CloseParen {
        loop {
            params.push(p.parse_var()?);
            if !p.try_consume(&tag(TokenKind::Comma)) {
                break;
            }
        }
    }
    p.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;
    p.try_consume_or(&tag(TokenKind::Colon), ErrorKind::MissingToken, "Expected ':'")?;
    let return_type = p.parse_type()?;
    let has_body = p.peek().kind == TokenKind::OpenCurly;

    check_overload_collision(p, &qualified, &params, return_type, has_body)?;

    let body = if has_body {
        p.enter_scope();
        for param in params.clone() {
            p.declare_variable(param)?;
        }
        let mut stmts = p.parse_block_body()?;
        stmts.extend(p.leave_scope());
        Some(stmts)
    } else {
        p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
        None
    };

    let decl = FuncDecl { name: qualified.clone(), params, return_type, inline, body };
    let node = p.arena.alloc_node(Node { kind: NodeKind::FuncDecl, add: true, payload: NodePayload::FuncDecl(decl) });
    p.register_function(qualified, node);
    Ok(node)
}

/// Two overloads collide only when both their parameter/return shape AND
/// the fact that both carry a body coincide; a forward declaration doesn't
/// block a later matching definition.
fn check_overload_collision(
    p: &Parser,
    name: &str,
    params: &[Variable],
    return_type: TypeId,
    has_body: bool,
) -> CompileResult<()> {
    if !has_body {
        return Ok(());
    }
    for &existing in p.functions_named(name) {
        if let NodePayload::FuncDecl(f) = &p.arena.nodes[existing].payload {
            let same_params = f.params.len() == params.len()
                && f.params.iter().zip(params).all(|(a, b)| p.arena.types_equal(a.ty, b.ty));
            if same_params && p.arena.types_equal(f.return_type, return_type) && f.body.is_some() {
                return Err(p.fail(ErrorKind::RedefinitionError, "Function already defined"));
            }
        }
    }
    Ok(())
}

pub(crate) fn is_var_decl(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Var
}

pub(crate) fn build_var_decl(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let var = p.parse_var()?;
    let value = if p.try_consume(&symtag("=")) { Some(p.parse_expr(Some(var.ty))?) } else { None };
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
    p.declare_variable(var.clone())?;
    let node = Node { kind: NodeKind::VarDecl, add: true, payload: NodePayload::VarDecl(VarDecl { var, value }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_type_decl(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Type
}

pub(crate) fn build_type_decl(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let name = p.get_identifier()?;
    p.try_consume_or(&symtag("="), ErrorKind::MissingToken, "Expected '='")?;

    // `type S = struct;` / `type S = union;`: the bare forward-declaration
    // shorthand, only meaningful once attached to a name.
    if matches!(p.peek().kind, TokenKind::Struct | TokenKind::Union) && p.peek_at(1).kind == TokenKind::Semicolon {
        p.consume();
        p.consume();
        p.forward_declare_type(name.clone())?;
        let node =
            Node { kind: NodeKind::TypeDecl, add: true, payload: NodePayload::TypeDecl(TypeDecl { name, ty: None }) };
        return Ok(p.arena.alloc_node(node));
    }

    let ty = p.parse_type()?;
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
    p.complete_type(name.clone(), ty)?;
    let node =
        Node { kind: NodeKind::TypeDecl, add: true, payload: NodePayload::TypeDecl(TypeDecl { name, ty: Some(ty) }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_public_field(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Public
}

pub(crate) fn build_public_field(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let name = p.get_identifier()?;
    p.try_consume_or(&tag(TokenKind::PublicClosure), ErrorKind::MissingToken, "Expected '$'")?;
    let mut stmts = Vec::new();
    p.do_until_find_or(
        &tag(TokenKind::PublicClosure),
        |inner| {
            let id = inner.parse_single()?;
            inner.flatten_into(id, &mut stmts);
            Ok(())
        },
        ErrorKind::MissingToken,
        "Expected closing '$'",
    )?;
    let node = Node {
        kind: NodeKind::PublicField,
        add: false,
        payload: NodePayload::PublicField(PublicField { name, body: stmts }),
    };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_import(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Import
}

pub(crate) fn build_import(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let mut segments = vec![p.get_identifier()?];
    while p.try_consume(&tag(TokenKind::Dot)) {
        segments.push(p.get_identifier()?);
    }
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;

    if segments.len() < 2 {
        return Err(p.fail(ErrorKind::FileError, "Import path needs at least a file and a public section"));
    }
    let section = segments.pop().expect("checked len >= 2");
    let stem = segments.pop().expect("checked len >= 2");
    segments.push(format!("{stem}{}", p.source_ext()));
    let path = segments.join("\\");

    let source = p.read_import(&path)?;
    let tokens = crate::lex_import(&source)?;
    let spliced = filter_public_section(&tokens, &section, p)?;
    p.splice_tokens(spliced);

    let node = Node {
        kind: NodeKind::Import,
        add: false,
        payload: NodePayload::Import(ImportStmt { path, section }),
    };
    Ok(p.arena.alloc_node(node))
}

/// Scans a lexed file for `public NAME $ ... $` and returns the interior
/// tokens, or a `FileError` if the markers are missing or unbalanced.
fn filter_public_section(tokens: &[Token], name: &str, p: &Parser) -> CompileResult<Vec<Token>> {
    let mut i = 0;
    while i < tokens.len() {
        let opens_section = tokens[i].kind == TokenKind::Public
            && tokens.get(i + 1).map(|t| t.kind == TokenKind::Identifier && t.value == name).unwrap_or(false)
            && tokens.get(i + 2).map(|t| t.kind == TokenKind::PublicClosure).unwrap_or(false);
        if opens_section {
            let start = i + 3;
            let mut end = start;
            while end < tokens.len() && tokens[end].kind != TokenKind::PublicClosure {
                end += 1;
            }
            if end >= tokens.len() {
                return Err(p.fail(ErrorKind::FileError, "Syntax Error in imported file"));
            }
            return Ok(tokens[start..end].to_vec());
        }
        i += 1;
    }
    Err(p.fail(ErrorKind::FileError, "Syntax Error in imported file"))
}

pub(crate) fn is_namesp(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Namespace
}

pub(crate) fn build_namesp(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let name = p.get_identifier()?;
    p.push_namespace(name.clone());
    let body = p.parse_block_body();
    p.pop_namespace();
    let body = body?;
    let node = Node { kind: NodeKind::Namesp, add: false, payload: NodePayload::Namesp(Namesp { name, body }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_defer(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Defer
}

pub(crate) fn build_defer(p: &mut Parser) -> CompileResult<NodeId> {
    if p.scope_depth() == 0 {
        return Err(p.fail(ErrorKind::LogicError, "Cannot use defer out of scope"));
    }
    p.consume();
    let inner = p.parse_single()?;
    p.register_defer(inner);
    let node = Node { kind: NodeKind::Defer, add: false, payload: NodePayload::Defer(DeferStmt { body: inner }) };
    Ok(p.arena.alloc_node(node))
}

/// `@name;` replays a previously-declared alias's body in place. Checked
/// before `alias_decl`, which shares the same `@name` prefix; the trailing
/// `{` that introduces a body is what `alias_decl` alone matches.
pub(crate) fn is_alias_use(p: &Parser) -> bool {
    p.peek().kind == TokenKind::At && p.peek_at(2).kind != TokenKind::OpenCurly
}

pub(crate) fn build_alias_use(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let name = p.get_identifier()?;
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
    let node = Node { kind: NodeKind::AliasUse, add: false, payload: NodePayload::AliasUse(AliasUse { name }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_alias_decl(p: &Parser) -> bool {
    p.peek().kind == TokenKind::At
}

pub(crate) fn build_alias_decl(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let name = p.get_identifier()?;
    let body = p.parse_block_body()?;
    p.register_alias(name.clone(), body.clone())?;
    let node =
        Node { kind: NodeKind::AliasDecl, add: false, payload: NodePayload::AliasDecl(AliasDecl { name, body }) };
    Ok(p.arena.alloc_node(node))
}

enum PrecKind {
    None,
    AboveAll,
    BelowAll,
    Above(RefSig),
    Below(RefSig),
}

struct PrecClause {
    kind: PrecKind,
}

struct RefSig {
    unary: bool,
    symbols: String,
    a: TypeId,
    b: Option<TypeId>,
}

fn parse_precedence_clause(p: &mut Parser) -> CompileResult<PrecClause> {
    if p.try_consume(&tag(TokenKind::NoneKw)) {
        return Ok(PrecClause { kind: PrecKind::None });
    }
    if p.try_consume(&tag(TokenKind::Above)) {
        if p.try_consume(&tag(TokenKind::All)) {
            return Ok(PrecClause { kind: PrecKind::AboveAll });
        }
        return Ok(PrecClause { kind: PrecKind::Above(parse_ref_signature(p)?) });
    }
    if p.try_consume(&tag(TokenKind::Below)) {
        if p.try_consume(&tag(TokenKind::All)) {
            return Ok(PrecClause { kind: PrecKind::BelowAll });
        }
        return Ok(PrecClause { kind: PrecKind::Below(parse_ref_signature(p)?) });
    }
    Err(p.fail(ErrorKind::SyntaxError, "Expected 'none', 'above', or 'below'"))
}

/// `SYM type | retType` (unary) or `type SYM type | retType` (binary); the
/// return type is required by the grammar but unused by precedence
/// resolution itself — it only helps a reader identify the reference op.
fn parse_ref_signature(p: &mut Parser) -> CompileResult<RefSig> {
    if p.peek().kind == TokenKind::Symbols {
        let symbols = p.consume().value;
        let a = p.parse_type()?;
        p.try_consume_or(&tag(TokenKind::Pipe), ErrorKind::MissingToken, "Expected '|'")?;
        p.parse_type()?;
        return Ok(RefSig { unary: true, symbols, a, b: None });
    }
    let a = p.parse_type()?;
    let symbols = p
        .try_consume_or(&Token::new(TokenKind::Symbols, 0, ""), ErrorKind::MissingToken, "Expected operator symbol")?
        .value;
    let b = p.parse_type()?;
    p.try_consume_or(&tag(TokenKind::Pipe), ErrorKind::MissingToken, "Expected '|'")?;
    p.parse_type()?;
    Ok(RefSig { unary: false, symbols, a, b: Some(b) })
}

fn resolve_precedence(p: &Parser, clause: &PrecClause) -> CompileResult<i32> {
    match &clause.kind {
        PrecKind::None => Ok(0),
        PrecKind::AboveAll => Ok(i32::MAX),
        PrecKind::BelowAll => Ok(i32::MIN),
        PrecKind::Above(r) => p
            .find_operation_by_shape(r.unary, &r.symbols, r.a, r.b)
            .map(|op| op.precedence.saturating_add(1))
            .ok_or_else(|| p.fail(ErrorKind::LogicError, "Operation does not exist")),
        PrecKind::Below(r) => p
            .find_operation_by_shape(r.unary, &r.symbols, r.a, r.b)
            .map(|op| op.precedence.saturating_sub(1))
            .ok_or_else(|| p.fail(ErrorKind::LogicError, "Operation does not exist")),
    }
}

pub(crate) fn is_operation_decl(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Operation
}

pub(crate) fn build_operation_decl(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let clause = parse_precedence_clause(p)?;
    let precedence = resolve_precedence(p, &clause)?;

    p.enter_scope();
    let (unary, symbols, a, a_name, b, b_name) = if p.peek().kind == TokenKind::Symbols {
        let symbols = p.consume().value;
        let var = p.parse_var()?;
        let (ty, name) = (var.ty, var.name.clone());
        p.declare_variable(var)?;
        (true, symbols, ty, name, None, None)
    } else {
        let var_a = p.parse_var()?;
        let symbols = p
            .try_consume_or(&Token::new(TokenKind::Symbols, 0, ""), ErrorKind::MissingToken, "Expected operator symbol")?
            .value;
        let var_b = p.parse_var()?;
        let (ty_a, name_a, ty_b, name_b) = (var_a.ty, var_a.name.clone(), var_b.ty, var_b.name.clone());
        p.declare_variable(var_a)?;
        p.declare_variable(var_b)?;
        (false, symbols, ty_a, name_a, Some(ty_b), Some(name_b))
    };

    p.try_consume_or(&tag(TokenKind::Arrow), ErrorKind::MissingToken, "Expected '->'")?;
    let r = p.parse_type()?;
    p.try_consume_or(&tag(TokenKind::Colon), ErrorKind::MissingToken, "Expected ':'")?;
    let mut stmts = p.parse_block_body()?;
    stmts.extend(p.leave_scope());
    let body = p.arena.alloc_node(Node {
        kind: NodeKind::Scope,
        add: false,
        payload: NodePayload::Scope(ScopeNode { body: stmts }),
    });

    let op = Operation { unary, symbols, a, b, r, body, precedence, a_name, b_name };
    p.register_operation(op.clone())?;
    let node =
        Node { kind: NodeKind::OperationDecl, add: true, payload: NodePayload::OperationDecl(OperationDecl { op }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_cast_decl(p: &Parser) -> bool {
    matches!(p.peek().kind, TokenKind::Cast | TokenKind::Autocast)
}

/// `cast<v:from> to : { body }` / `autocast<v:from> to : { body }`.
pub(crate) fn build_cast_decl(p: &mut Parser) -> CompileResult<NodeId> {
    let auto = p.consume().kind == TokenKind::Autocast;
    p.try_consume_or(&tag(TokenKind::OpenAngle), ErrorKind::MissingToken, "Expected '<'")?;
    p.enter_scope();
    let var = p.parse_var()?;
    let (from, param_name) = (var.ty, var.name.clone());
    p.declare_variable(var)?;
    p.try_consume_or(&tag(TokenKind::CloseAngle), ErrorKind::MissingToken, "Expected '>'")?;
    let to = p.parse_type()?;
    p.try_consume_or(&tag(TokenKind::Colon), ErrorKind::MissingToken, "Expected ':'")?;
    let mut stmts = p.parse_block_body()?;
    stmts.extend(p.leave_scope());
    let body = p.arena.alloc_node(Node {
        kind: NodeKind::Scope,
        add: false,
        payload: NodePayload::Scope(ScopeNode { body: stmts }),
    });

    let cast = Cast { from, to, body, param_name };
    p.register_cast(auto, cast.clone())?;
    let node = Node { kind: NodeKind::CastDecl, add: true, payload: NodePayload::CastDecl(CastDecl { cast, auto }) };
    Ok(p.arena.alloc_node(node))
}
