//! Type-directed expression parsing (§4.3): literals, variables, calls,
//! interface references, postfix access, prefix/custom operators, and the
//! autocast search that lets a required type differ from what was parsed.
//!
//! Binary and prefix custom operators are resolved through the
//! `operations` table registered by `operation_decl`, using each
//! operation's own `precedence` as the binding power for a standard
//! precedence-climbing loop.

use slate_lex::{Token, TokenKind};
use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use crate::{
    CastExpr, CustomExpr, DotNotationExpr, Expression, ExprId, ExprKind, ExprPayload, FuncCallExpr,
    InterfaceCallExpr, Literal, NodeId, NodePayload, Operation, Parser, SubscriptExpr, Type, TypeId,
    TypeKind, Variable,
};

fn tag(kind: TokenKind) -> Token {
    Token::new(kind, 0, "")
}

struct InterfaceSig {
    params: Vec<TypeId>,
    return_type: TypeId,
}

fn literal_type_kind(lit: &Literal) -> TypeKind {
    match lit {
        Literal::Int(_) => TypeKind::Int,
        Literal::Long(_) => TypeKind::Long,
        Literal::Float(_) => TypeKind::Float,
        Literal::Double(_) => TypeKind::Double,
        Literal::Char(_) => TypeKind::Char,
        Literal::Boolean(_) => TypeKind::Boolean,
        Literal::Str(_) => TypeKind::Str,
        Literal::Null => unreachable!("null literals get a pointer type, not a scalar kind"),
    }
}

impl Parser {
    pub(crate) fn parse_expr(&mut self, required: Option<TypeId>) -> CompileResult<ExprId> {
        let expr = self.parse_binary(i32::MIN)?;
        self.apply_required_type(expr, required)
    }

    /// If `expr`'s type doesn't already match `required`, look for a
    /// registered autocast from the one to the other and wrap `expr` in a
    /// `Cast` node; otherwise the expression is reported as a type error.
    fn apply_required_type(&mut self, expr: ExprId, required: Option<TypeId>) -> CompileResult<ExprId> {
        let Some(req) = required else { return Ok(expr) };
        let actual = self.arena.exprs[expr].return_type;
        if self.arena.types_equal(actual, req) {
            return Ok(expr);
        }
        for cast in self.autocasts().to_vec() {
            if self.arena.types_equal(cast.from, actual) && self.arena.types_equal(cast.to, req) {
                let wrapped = Expression {
                    kind: ExprKind::Cast,
                    return_type: req,
                    payload: ExprPayload::Cast(CastExpr { inner: expr, cast }),
                };
                return Ok(self.arena.alloc_expr(wrapped));
            }
        }
        Err(self.fail(ErrorKind::TypeError, "Type mismatch and no matching autocast"))
    }

    fn parse_binary(&mut self, min_prec: i32) -> CompileResult<ExprId> {
        let mut left = self.parse_unary(None)?;
        loop {
            if self.peek().kind != TokenKind::Symbols {
                break;
            }
            let left_ty = self.arena.exprs[left].return_type;
            let symbols = self.peek().value.clone();
            let op = match self.find_binary_operation(&symbols, left_ty) {
                Some(op) if op.precedence >= min_prec => op,
                _ => break,
            };
            self.consume();
            let right = self.parse_binary(op.precedence + 1)?;
            let right = self.apply_required_type(right, op.b)?;
            let return_type = op.r;
            let custom = CustomExpr { a: left, b: Some(right), op };
            left = self.arena.alloc_expr(Expression {
                kind: ExprKind::Custom,
                return_type,
                payload: ExprPayload::Custom(custom),
            });
        }
        Ok(left)
    }

    fn find_binary_operation(&self, symbols: &str, a_ty: TypeId) -> Option<Operation> {
        self.operations
            .iter()
            .find(|op| !op.unary && op.symbols == symbols && self.arena.types_equal(op.a, a_ty))
            .cloned()
    }

    /// `&`/`*` are the two built-in prefix operators; anything else in
    /// `Symbols` position is looked up in the custom-operator table, trying
    /// each same-named candidate's operand type in turn with cursor
    /// backtracking (mirroring the overload search used for calls).
    fn parse_unary(&mut self, required: Option<TypeId>) -> CompileResult<ExprId> {
        if self.peek().kind == TokenKind::Symbols {
            match self.peek().value.as_str() {
                "&" => {
                    self.consume();
                    let inner = self.parse_unary(None)?;
                    let inner_ty = self.arena.exprs[inner].return_type;
                    let ptr_ty = self.arena.alloc_type(Type::pointer(inner_ty, false));
                    return Ok(self.arena.alloc_expr(Expression {
                        kind: ExprKind::Reference,
                        return_type: ptr_ty,
                        payload: ExprPayload::Reference(inner),
                    }));
                }
                "*" => {
                    self.consume();
                    let inner = self.parse_unary(None)?;
                    let inner_ty = self.arena.exprs[inner].return_type;
                    let pointee = match self.arena.types[inner_ty].kind {
                        TypeKind::Pointer => {
                            self.arena.types[inner_ty].points_to.expect("pointer type always has a pointee")
                        }
                        _ => return Err(self.fail(ErrorKind::TypeError, "Cannot dereference a non-pointer type")),
                    };
                    return Ok(self.arena.alloc_expr(Expression {
                        kind: ExprKind::Dereference,
                        return_type: pointee,
                        payload: ExprPayload::Dereference(inner),
                    }));
                }
                symbols => {
                    let candidates: Vec<Operation> =
                        self.operations.iter().filter(|o| o.unary && o.symbols == symbols).cloned().collect();
                    if !candidates.is_empty() {
                        let start = self.cursor();
                        self.consume();
                        for op in candidates {
                            self.set_cursor(start + 1);
                            if let Ok(operand) = self.parse_unary(Some(op.a)) {
                                let return_type = op.r;
                                let custom = CustomExpr { a: operand, b: None, op };
                                return Ok(self.arena.alloc_expr(Expression {
                                    kind: ExprKind::Custom,
                                    return_type,
                                    payload: ExprPayload::Custom(custom),
                                }));
                            }
                        }
                        self.set_cursor(start);
                        return Err(self.fail(ErrorKind::TypeError, "No matching unary operation"));
                    }
                }
            }
        }
        self.parse_postfix(required)
    }

    fn parse_postfix(&mut self, required: Option<TypeId>) -> CompileResult<ExprId> {
        let mut expr = self.parse_primary(required)?;
        loop {
            if self.try_consume(&tag(TokenKind::Dot)) {
                let field = self.get_identifier()?;
                let base_ty = self.arena.exprs[expr].return_type;
                let field_ty = self.resolve_field_type(base_ty, &field)?;
                expr = self.arena.alloc_expr(Expression {
                    kind: ExprKind::DotNotation,
                    return_type: field_ty,
                    payload: ExprPayload::DotNotation(DotNotationExpr { base: expr, after: field }),
                });
                continue;
            }
            if self.try_consume(&tag(TokenKind::OpenSquare)) {
                let index = self.parse_expr(None)?;
                self.try_consume_or(&tag(TokenKind::CloseSquare), ErrorKind::MissingToken, "Expected ']'")?;
                let base_ty = self.arena.exprs[expr].return_type;
                let elem_ty = match self.arena.types[base_ty].kind {
                    TypeKind::Pointer => {
                        self.arena.types[base_ty].points_to.expect("pointer type always has a pointee")
                    }
                    _ => return Err(self.fail(ErrorKind::TypeError, "Cannot subscript a non-pointer type")),
                };
                expr = self.arena.alloc_expr(Expression {
                    kind: ExprKind::Subscript,
                    return_type: elem_ty,
                    payload: ExprPayload::Subscript(SubscriptExpr { base: expr, index }),
                });
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn resolve_field_type(&self, base_ty: TypeId, field: &str) -> CompileResult<TypeId> {
        let ty = &self.arena.types[base_ty];
        let target = if ty.kind == TypeKind::Pointer {
            &self.arena.types[ty.points_to.expect("pointer type always has a pointee")]
        } else {
            ty
        };
        target
            .fields
            .iter()
            .find(|v| v.name == field)
            .map(|v| v.ty)
            .ok_or_else(|| self.fail(ErrorKind::TypeError, format!("No field '{field}'")))
    }

    fn parse_primary(&mut self, required: Option<TypeId>) -> CompileResult<ExprId> {
        match self.peek().kind {
            TokenKind::Literal => self.parse_literal_expr(),
            TokenKind::Identifier => self.parse_identifier_expr(required),
            TokenKind::OpenParen => {
                self.consume();
                let inner = self.parse_expr(required)?;
                self.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;
                Ok(inner)
            }
            _ => Err(self.fail(ErrorKind::SyntaxError, "Expected expression")),
        }
    }

    fn parse_literal_expr(&mut self) -> CompileResult<ExprId> {
        let tok = self.consume();
        let context = tok.render();
        let line = tok.line;
        let lit = crate::parse_literal(&tok.value, line, &context)?;
        let ty = match &lit {
            Literal::Null => {
                let void_ty = self.arena.alloc_type(Type::scalar(TypeKind::Void));
                self.arena.alloc_type(Type::pointer(void_ty, false))
            }
            other => {
                let kind = literal_type_kind(other);
                self.arena.alloc_type(Type::scalar(kind))
            }
        };
        Ok(self.arena.alloc_expr(Expression { kind: ExprKind::Literal, return_type: ty, payload: ExprPayload::Literal(lit) }))
    }

    /// A bare identifier is a variable use, an interface call (a variable
    /// of `interface` type applied to arguments), a direct function call,
    /// or — with no matching variable or parenthesised call — an interface
    /// reference.
    fn parse_identifier_expr(&mut self, required: Option<TypeId>) -> CompileResult<ExprId> {
        let name = self.consume().value;

        if let Some(var) = self.lookup_variable(&name).cloned() {
            if self.peek().kind == TokenKind::OpenParen && self.arena.types[var.ty].kind == TypeKind::Interface {
                return self.parse_interface_call(var, required);
            }
            return Ok(self.arena.alloc_expr(Expression {
                kind: ExprKind::Variable,
                return_type: var.ty,
                payload: ExprPayload::Variable(var),
            }));
        }

        let qualified = self.qualify(&name);
        if self.peek().kind == TokenKind::OpenParen {
            return self.parse_func_call(qualified, required);
        }
        self.parse_interface_ref(qualified)
    }

    fn parse_interface_call(&mut self, var: Variable, required: Option<TypeId>) -> CompileResult<ExprId> {
        let callee = self.arena.alloc_expr(Expression {
            kind: ExprKind::Variable,
            return_type: var.ty,
            payload: ExprPayload::Variable(var.clone()),
        });
        let iface = &self.arena.types[var.ty];
        let param_types = iface.params.clone();
        let return_type = iface.return_type.expect("interface type always carries a return type");

        self.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
        let mut args = Vec::new();
        for (i, param_ty) in param_types.iter().enumerate() {
            if i > 0 {
                self.try_consume_or(&tag(TokenKind::Comma), ErrorKind::MissingToken, "Expected ','")?;
            }
            args.push(self.parse_expr(Some(*param_ty))?);
        }
        self.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;

        let call = InterfaceCallExpr { callee, args };
        let expr = self.arena.alloc_expr(Expression {
            kind: ExprKind::InterfaceCall,
            return_type,
            payload: ExprPayload::InterfaceCall(call),
        });
        self.apply_required_type(expr, required)
    }

    /// Tries each same-named overload in turn, propagating that
    /// candidate's own parameter types into each argument (so a literal
    /// like `1` autocasts differently depending on which overload is being
    /// attempted) and backtracking the cursor on failure.
    fn parse_func_call(&mut self, name: String, required: Option<TypeId>) -> CompileResult<ExprId> {
        let candidates = self.functions_named(&name).to_vec();
        if candidates.is_empty() {
            return Err(self.fail(ErrorKind::LogicError, "Function does not exist"));
        }
        let start = self.cursor();
        for candidate in &candidates {
            self.set_cursor(start);
            if let Ok(expr) = self.try_call_candidate(*candidate, required) {
                return Ok(expr);
            }
        }
        self.set_cursor(start);
        Err(self.fail(ErrorKind::LogicError, "Function does not exist"))
    }

    fn try_call_candidate(&mut self, candidate: NodeId, required: Option<TypeId>) -> CompileResult<ExprId> {
        let (param_types, return_type) = match &self.arena.nodes[candidate].payload {
            NodePayload::FuncDecl(f) => (f.params.iter().map(|v| v.ty).collect::<Vec<_>>(), f.return_type),
            _ => unreachable!("functions table only holds FuncDecl nodes"),
        };

        self.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
        let mut args = Vec::new();
        for (i, param_ty) in param_types.iter().enumerate() {
            if i > 0 {
                self.try_consume_or(&tag(TokenKind::Comma), ErrorKind::MissingToken, "Expected ','")?;
            }
            args.push(self.parse_expr(Some(*param_ty))?);
        }
        self.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;

        let call = FuncCallExpr { callee: candidate, args };
        let expr = self.arena.alloc_expr(Expression { kind: ExprKind::FuncCall, return_type, payload: ExprPayload::FuncCall(call) });
        self.apply_required_type(expr, required)
    }

    /// A bare name with no matching variable is an interface reference: if
    /// exactly one function shares the name it is unambiguous, otherwise a
    /// `<(params) -> ret>` disambiguator is required.
    fn parse_interface_ref(&mut self, name: String) -> CompileResult<ExprId> {
        let candidates = self.functions_named(&name).to_vec();
        if candidates.len() == 1 {
            return self.build_interface_ref(candidates[0]);
        }
        if !candidates.is_empty() && self.peek().kind == TokenKind::OpenAngle {
            let sig = self.parse_interface_signature()?;
            for c in &candidates {
                if let NodePayload::FuncDecl(f) = &self.arena.nodes[*c].payload {
                    let params_match = f.params.len() == sig.params.len()
                        && f.params.iter().zip(&sig.params).all(|(p, s)| self.arena.types_equal(p.ty, *s));
                    if params_match && self.arena.types_equal(f.return_type, sig.return_type) {
                        return self.build_interface_ref(*c);
                    }
                }
            }
        }
        Err(self.fail(ErrorKind::LogicError, "Function with provided type specifiers does not exist"))
    }

    fn build_interface_ref(&mut self, node: NodeId) -> CompileResult<ExprId> {
        let mut ty = Type::scalar(TypeKind::Interface);
        match &self.arena.nodes[node].payload {
            NodePayload::FuncDecl(f) => {
                ty.params = f.params.iter().map(|v| v.ty).collect();
                ty.return_type = Some(f.return_type);
            }
            _ => unreachable!("functions table only holds FuncDecl nodes"),
        }
        let ty_id = self.arena.alloc_type(ty);
        Ok(self.arena.alloc_expr(Expression {
            kind: ExprKind::InterfaceRef,
            return_type: ty_id,
            payload: ExprPayload::InterfaceRef(node),
        }))
    }

    fn parse_interface_signature(&mut self) -> CompileResult<InterfaceSig> {
        self.try_consume_or(&tag(TokenKind::OpenAngle), ErrorKind::MissingToken, "Expected '<'")?;
        self.try_consume_or(&tag(TokenKind::OpenParen), ErrorKind::MissingToken, "Expected '('")?;
        let mut params = Vec::new();
        if self.peek().kind != TokenKind::CloseParen {
            loop {
                params.push(self.parse_type()?);
                if !self.try_consume(&tag(TokenKind::Comma)) {
                    break;
                }
            }
        }
        self.try_consume_or(&tag(TokenKind::CloseParen), ErrorKind::MissingToken, "Expected ')'")?;
        self.try_consume_or(&tag(TokenKind::Arrow), ErrorKind::MissingToken, "Expected '->'")?;
        let return_type = self.parse_type()?;
        self.try_consume_or(&tag(TokenKind::CloseAngle), ErrorKind::MissingToken, "Expected '>'")?;
        Ok(InterfaceSig { params, return_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoImports;
    use slate_lex::Lexer;

    fn parser(src: &str) -> Parser {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens, Box::new(NoImports), ".sl")
    }

    #[test]
    fn int_literal_has_int_type() {
        let mut p = parser("42");
        let e = p.parse_expr(None).unwrap();
        assert_eq!(p.arena.types[p.arena.exprs[e].return_type].kind, TypeKind::Int);
    }

    #[test]
    fn undeclared_identifier_with_no_function_is_an_error() {
        let mut p = parser("nope");
        assert!(p.parse_expr(None).is_err());
    }

    #[test]
    fn required_type_mismatch_without_autocast_is_an_error() {
        let mut p = parser("42");
        let long_ty = p.arena.alloc_type(Type::scalar(TypeKind::Long));
        assert!(p.parse_expr(Some(long_ty)).is_err());
    }

    #[test]
    fn dereferencing_a_non_pointer_is_an_error() {
        let mut p = parser("*42");
        assert!(p.parse_expr(None).is_err());
    }
}
