//! Statement-level builders: anonymous scopes, assignment, control flow,
//! and the two leaf forms (`return`, `asm`) (§4.3).

use slate_lex::{Token, TokenKind};
use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use crate::{
    AsmCode, DoWhileStmt, ForStmt, IfStmt, Node, NodeId, NodeKind, NodePayload, Parser, ReturnStmt,
    ScopeNode, Type, TypeKind, VarSet, WhileStmt,
};

fn tag(kind: TokenKind) -> Token {
    Token::new(kind, 0, "")
}

fn symtag(value: &str) -> Token {
    Token::new(TokenKind::Symbols, 0, value)
}

pub(crate) fn is_scope(p: &Parser) -> bool {
    p.peek().kind == TokenKind::OpenCurly
}

pub(crate) fn build_scope(p: &mut Parser) -> CompileResult<NodeId> {
    p.enter_scope();
    let mut body = p.parse_block_body()?;
    body.extend(p.leave_scope());
    let node = Node { kind: NodeKind::Scope, add: true, payload: NodePayload::Scope(ScopeNode { body }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_var_set(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Identifier
}

pub(crate) fn build_var_set(p: &mut Parser) -> CompileResult<NodeId> {
    let target = p.parse_expr(None)?;
    let target_ty = p.arena.exprs[target].return_type;
    p.try_consume_or(&symtag("="), ErrorKind::MissingToken, "Expected '='")?;
    let value = p.parse_expr(Some(target_ty))?;
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
    let node = Node { kind: NodeKind::VarSet, add: true, payload: NodePayload::VarSet(VarSet { target, value }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_return_stmt(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Return
}

pub(crate) fn build_return_stmt(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    let value = if p.peek().kind == TokenKind::Semicolon { None } else { Some(p.parse_expr(None)?) };
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
    let node = Node { kind: NodeKind::ReturnStmt, add: true, payload: NodePayload::ReturnStmt(ReturnStmt { value }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_asm_code(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Asm
}

/// The lexer captures the verbatim `{ ... }` body of an `asm` block as the
/// token's own value, so building this node is just consuming it.
pub(crate) fn build_asm_code(p: &mut Parser) -> CompileResult<NodeId> {
    let tok = p.consume();
    let node = Node { kind: NodeKind::AsmCode, add: true, payload: NodePayload::AsmCode(AsmCode { body: tok.value }) };
    Ok(p.arena.alloc_node(node))
}

fn boolean_type(p: &mut Parser) -> crate::TypeId {
    p.arena.alloc_type(Type::scalar(TypeKind::Boolean))
}

pub(crate) fn is_if_stmt(p: &Parser) -> bool {
    p.peek().kind == TokenKind::If
}

pub(crate) fn build_if_stmt(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    p.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    let bool_ty = boolean_type(p);
    let cond = p.parse_expr(Some(bool_ty))?;
    p.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;

    p.enter_scope();
    let mut then_body = p.parse_block_body()?;
    then_body.extend(p.leave_scope());

    let else_body = if p.try_consume(&tag(TokenKind::Else)) {
        p.enter_scope();
        let mut body = p.parse_block_body()?;
        body.extend(p.leave_scope());
        Some(body)
    } else {
        None
    };

    let node =
        Node { kind: NodeKind::IfStmt, add: true, payload: NodePayload::IfStmt(IfStmt { cond, then_body, else_body }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_while_stmt(p: &Parser) -> bool {
    p.peek().kind == TokenKind::While
}

pub(crate) fn build_while_stmt(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    p.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    let bool_ty = boolean_type(p);
    let cond = p.parse_expr(Some(bool_ty))?;
    p.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;

    p.enter_scope();
    let mut body = p.parse_block_body()?;
    body.extend(p.leave_scope());

    let node = Node { kind: NodeKind::WhileStmt, add: true, payload: NodePayload::WhileStmt(WhileStmt { cond, body }) };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_do_while_stmt(p: &Parser) -> bool {
    p.peek().kind == TokenKind::Do
}

pub(crate) fn build_do_while_stmt(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    p.enter_scope();
    let mut body = p.parse_block_body()?;
    body.extend(p.leave_scope());

    p.try_consume_or(&tag(TokenKind::While), ErrorKind::MissingToken, "Expected 'while'")?;
    p.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    let bool_ty = boolean_type(p);
    let cond = p.parse_expr(Some(bool_ty))?;
    p.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;

    let node = Node {
        kind: NodeKind::DoWhileStmt,
        add: true,
        payload: NodePayload::DoWhileStmt(DoWhileStmt { cond, body }),
    };
    Ok(p.arena.alloc_node(node))
}

pub(crate) fn is_for_stmt(p: &Parser) -> bool {
    p.peek().kind == TokenKind::For
}

/// `for (init? ; cond? ; step?) { body }`. `init`/`step` are parsed
/// directly rather than through `parse_single`, since neither shares the
/// ordinary statement terminator convention in this position: `init` ends
/// at the loop's own first `;`, and `step` has no terminator at all.
pub(crate) fn build_for_stmt(p: &mut Parser) -> CompileResult<NodeId> {
    p.consume();
    p.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
    p.enter_scope();

    let init = if p.try_consume(&tag(TokenKind::Semicolon)) {
        None
    } else {
        let var = p.parse_var()?;
        p.try_consume_or(&symtag("="), ErrorKind::MissingToken, "Expected '='")?;
        let value = p.parse_expr(Some(var.ty))?;
        p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
        p.declare_variable(var.clone())?;
        Some(p.arena.alloc_node(Node {
            kind: NodeKind::VarDecl,
            add: true,
            payload: NodePayload::VarDecl(crate::VarDecl { var, value: Some(value) }),
        }))
    };

    let cond = if p.peek().kind == TokenKind::Semicolon {
        None
    } else {
        let bool_ty = boolean_type(p);
        Some(p.parse_expr(Some(bool_ty))?)
    };
    p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;

    let step = if p.peek().kind == TokenKind::CloseParen {
        None
    } else {
        let target = p.parse_expr(None)?;
        p.try_consume_or(&symtag("="), ErrorKind::MissingToken, "Expected '='")?;
        let target_ty = p.arena.exprs[target].return_type;
        let value = p.parse_expr(Some(target_ty))?;
        Some(p.arena.alloc_node(Node {
            kind: NodeKind::VarSet,
            add: true,
            payload: NodePayload::VarSet(VarSet { target, value }),
        }))
    };
    p.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;

    let mut body = p.parse_block_body()?;
    body.extend(p.leave_scope());

    let node =
        Node { kind: NodeKind::ForStmt, add: true, payload: NodePayload::ForStmt(ForStmt { init, cond, step, body }) };
    Ok(p.arena.alloc_node(node))
}

#[cfg(test)]
mod tests {
    use slate_lex::Lexer;

    use crate::{NodeId, NodePayload, NoImports, Parser};

    fn parse(src: &str) -> crate::Program {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens, Box::new(NoImports), ".sl").parse().unwrap()
    }

    fn func_body(src: &str) -> (crate::Program, Vec<NodeId>) {
        let program = parse(&format!("func main() : void {{ {src} }}"));
        assert_eq!(program.statements.len(), 1);
        let body = match &program.arena.nodes[program.statements[0]].payload {
            NodePayload::FuncDecl(f) => f.body.clone().unwrap(),
            other => panic!("expected FuncDecl, got {other:?}"),
        };
        (program, body)
    }

    #[test]
    fn if_without_else_has_no_else_body() {
        let (program, body) = func_body("if (true) { return; }");
        match &program.arena.nodes[body[0]].payload {
            NodePayload::IfStmt(s) => assert!(s.else_body.is_none()),
            other => panic!("expected IfStmt, got {other:?}"),
        }
    }

    #[test]
    fn if_else_keeps_both_branches() {
        let (program, body) = func_body("if (true) { return; } else { return; }");
        match &program.arena.nodes[body[0]].payload {
            NodePayload::IfStmt(s) => assert!(s.else_body.is_some()),
            other => panic!("expected IfStmt, got {other:?}"),
        }
    }

    #[test]
    fn while_loop_parses_condition_and_body() {
        let (program, body) = func_body("while (true) { return; }");
        match &program.arena.nodes[body[0]].payload {
            NodePayload::WhileStmt(s) => assert_eq!(s.body.len(), 1),
            other => panic!("expected WhileStmt, got {other:?}"),
        }
    }

    #[test]
    fn do_while_requires_trailing_semicolon() {
        let (program, body) = func_body("do { return; } while (true);");
        match &program.arena.nodes[body[0]].payload {
            NodePayload::DoWhileStmt(s) => assert_eq!(s.body.len(), 1),
            other => panic!("expected DoWhileStmt, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_with_all_three_clauses() {
        let (program, body) = func_body("for (var i : int = 0; i < 1; i = i + 1) { return; }");
        match &program.arena.nodes[body[0]].payload {
            NodePayload::ForStmt(s) => {
                assert!(s.init.is_some());
                assert!(s.cond.is_some());
                assert!(s.step.is_some());
            }
            other => panic!("expected ForStmt, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_clauses_are_all_optional() {
        let (program, body) = func_body("for (;;) { return; }");
        match &program.arena.nodes[body[0]].payload {
            NodePayload::ForStmt(s) => {
                assert!(s.init.is_none());
                assert!(s.cond.is_none());
                assert!(s.step.is_none());
            }
            other => panic!("expected ForStmt, got {other:?}"),
        }
    }

    #[test]
    fn asm_block_captures_verbatim_body() {
        let (program, body) = func_body("asm { mov eax, ebx }");
        match &program.arena.nodes[body[0]].payload {
            NodePayload::AsmCode(a) => assert!(a.body.contains("mov eax, ebx")),
            other => panic!("expected AsmCode, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_scope_variable_does_not_escape() {
        let (_, body) = func_body("{ var x : int = 1; } return;");
        assert_eq!(body.len(), 2);
    }
}
