//! Type parsing: the `mutable?` prefix, pointers, scalars, struct/union
//! bodies, interface signatures, and named-type lookup (§4.3 "Type
//! parsing").

use slate_lex::{Token, TokenKind};
use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

use crate::{Parser, Type, TypeId, TypeKind, Variable};

fn tag(kind: TokenKind) -> Token {
    Token::new(kind, 0, "")
}

fn scalar_kind(kind: TokenKind) -> Option<TypeKind> {
    use TokenKind::*;
    Some(match kind {
        Int => TypeKind::Int,
        Uint => TypeKind::Uint,
        Long => TypeKind::Long,
        Ulong => TypeKind::Ulong,
        Float => TypeKind::Float,
        Double => TypeKind::Double,
        Byte => TypeKind::Byte,
        Char => TypeKind::Char,
        Boolean => TypeKind::Boolean,
        Str => TypeKind::Str,
        Void => TypeKind::Void,
        _ => return None,
    })
}

impl Parser {
    /// `mutable?` then one of: `&T` pointer, a scalar keyword,
    /// `struct`/`union`, `interface<...>`, or a declared-type lookup.
    pub(crate) fn parse_type(&mut self) -> CompileResult<TypeId> {
        let outer_mut = self.try_consume(&tag(TokenKind::Mutable));

        if self.peek().kind == TokenKind::Symbols && self.peek().value == "&" {
            self.consume();
            let pointee = self.parse_type()?;
            return Ok(self.arena.alloc_type(Type::pointer(pointee, outer_mut)));
        }

        if let Some(kind) = scalar_kind(self.peek().kind) {
            self.consume();
            let mut ty = Type::scalar(kind);
            ty.mutable = outer_mut;
            return Ok(self.arena.alloc_type(ty));
        }

        if self.peek().kind == TokenKind::Struct || self.peek().kind == TokenKind::Union {
            return self.parse_struct_or_union(outer_mut);
        }

        if self.try_consume(&tag(TokenKind::Interface)) {
            return self.parse_interface_type(outer_mut);
        }

        let name = self.get_identifier()?;
        match self.lookup_type(&name) {
            Some(Some(target)) => {
                let target_mut = self.arena.types[target].mutable;
                let ty = Type {
                    kind: TypeKind::Alias,
                    mutable: outer_mut || target_mut,
                    identifier: name,
                    points_to: Some(target),
                    fields: Vec::new(),
                    params: Vec::new(),
                    return_type: None,
                };
                Ok(self.arena.alloc_type(ty))
            }
            // Incomplete forward declaration: §4.3 "becomes a pointer to
            // void, mut".
            Some(None) => {
                let void_ty = self.arena.alloc_type(Type::scalar(TypeKind::Void));
                Ok(self.arena.alloc_type(Type::pointer(void_ty, true)))
            }
            None => Err(self.fail(ErrorKind::TypeError, format!("Unknown type '{name}'"))),
        }
    }

    /// `struct`/`union` body: `{ field:type; ... }`. The bare `struct;`/
    /// `union;` forward-declaration form is only meaningful attached to a
    /// name, so it is handled by the `type_decl` builder instead of here.
    fn parse_struct_or_union(&mut self, outer_mut: bool) -> CompileResult<TypeId> {
        let kind = if self.consume().kind == TokenKind::Struct { TypeKind::Struct } else { TypeKind::Union };
        self.try_consume_or(&tag(TokenKind::OpenCurly), ErrorKind::MissingToken, "Expected '{'")?;
        let mut fields = Vec::new();
        self.do_until_find_or(
            &tag(TokenKind::CloseCurly),
            |p| {
                let var = p.parse_var()?;
                p.try_consume_or(&tag(TokenKind::Semicolon), ErrorKind::MissingToken, "Expected ';'")?;
                fields.push(var);
                Ok(())
            },
            ErrorKind::MissingToken,
            "Expected '}'",
        )?;
        let mut ty = Type::scalar(kind);
        ty.mutable = outer_mut;
        ty.fields = fields;
        Ok(self.arena.alloc_type(ty))
    }

    fn parse_interface_type(&mut self, outer_mut: bool) -> CompileResult<TypeId> {
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
        let mut ty = Type::scalar(TypeKind::Interface);
        ty.mutable = outer_mut;
        ty.params = params;
        ty.return_type = Some(return_type);
        Ok(self.arena.alloc_type(ty))
    }

    /// `identifier : type`, shared by struct fields, function parameters,
    /// and `var_decl`.
    pub(crate) fn parse_var(&mut self) -> CompileResult<Variable> {
        let name = self.get_identifier()?;
        self.try_consume_or(&tag(TokenKind::Colon), ErrorKind::MissingToken, "Expected ':'")?;
        let ty = self.parse_type()?;
        Ok(Variable { name, ty })
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
    fn scalar_type() {
        let mut p = parser("int");
        let ty = p.parse_type().unwrap();
        assert_eq!(p.arena.types[ty].kind, TypeKind::Int);
    }

    #[test]
    fn pointer_propagates_outer_mut() {
        let mut p = parser("mutable &int");
        let ty = p.parse_type().unwrap();
        assert_eq!(p.arena.types[ty].kind, TypeKind::Pointer);
        assert!(p.arena.types[ty].mutable);
    }

    #[test]
    fn struct_fields_preserve_order() {
        let mut p = parser("struct { a:int; b:long; }");
        let ty = p.parse_type().unwrap();
        let fields = &p.arena.types[ty].fields;
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[1].name, "b");
    }

    #[test]
    fn interface_type() {
        let mut p = parser("interface<(int, int) -> int>");
        let ty = p.parse_type().unwrap();
        let t = &p.arena.types[ty];
        assert_eq!(t.kind, TypeKind::Interface);
        assert_eq!(t.params.len(), 2);
    }

    #[test]
    fn incomplete_forward_declaration_becomes_void_pointer() {
        let mut p = parser("S");
        p.forward_declare_type("S".to_string()).unwrap();
        let ty = p.parse_type().unwrap();
        assert_eq!(p.arena.types[ty].kind, TypeKind::Pointer);
    }
}
