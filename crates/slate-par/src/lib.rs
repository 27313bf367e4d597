//! Tokens in, typed AST out.
//!
//! The parser is built as a registry of node builders rather than a grammar
//! table: each builder owns a predicate that decides whether the current
//! token begins its node, and a build function that runs against a fresh
//! `Parser` state. `parse_single` scans the registry in order and invokes
//! the first builder whose predicate matches (§4.3's "prefix-unique
//! statements first" ordering) — this is the only dispatch mechanism.

mod ast;
mod expr;
mod items;
mod literal;
mod stmt;
mod types_parse;

pub use ast::*;
pub use literal::{parse_literal, Literal};

use std::collections::HashMap;

use slate_lex::{Lexer, Token, TokenKind};
use slate_util::processor::{ErrorKind, Processor};
use slate_util::CompileResult;

/// External filesystem collaborator for `import` (§6): the core only
/// requires a `read_all(path) -> string | FileError` operation.
pub trait SourceLoader {
    fn read_all(&self, path: &str) -> CompileResult<String>;
}

/// A loader that always fails; useful where imports are not exercised.
pub struct NoImports;

impl SourceLoader for NoImports {
    fn read_all(&self, path: &str) -> CompileResult<String> {
        Err(ErrorKind::FileError.at(0, path.to_string(), "No import loader configured".to_string()))
    }
}

/// The immutable collaborators the code generator reads after parsing
/// finishes (§5: these outlive the parser as read-only state).
pub struct Program {
    pub statements: Vec<NodeId>,
    pub arena: Arena,
    pub declared_types: DeclaredTypes,
    pub functions: HashMap<String, Vec<NodeId>>,
    pub operations: Vec<Operation>,
    pub casts: Vec<Cast>,
    pub autocasts: Vec<Cast>,
}

struct Builder {
    predicate: fn(&Parser) -> bool,
    build: fn(&mut Parser) -> CompileResult<NodeId>,
}

/// Registration order encodes parse priority (§4.3) and matches the
/// original builder registration order. `alias_use` sits before `var_set`
/// so the two `@name`-prefixed forms (`alias_decl`'s `@name { ... }` and
/// `alias_use`'s `@name;`) don't have to compete with statement dispatch in
/// between; `alias_decl` is tried last since its predicate is the same `@`
/// prefix and only the trailing `{` distinguishes it from `alias_use`.
fn builders() -> [Builder; 19] {
    [
        Builder { predicate: stmt::is_scope, build: stmt::build_scope },
        Builder { predicate: items::is_func_decl, build: items::build_func_decl },
        Builder { predicate: items::is_var_decl, build: items::build_var_decl },
        Builder { predicate: items::is_type_decl, build: items::build_type_decl },
        Builder { predicate: items::is_public_field, build: items::build_public_field },
        Builder { predicate: items::is_import, build: items::build_import },
        Builder { predicate: items::is_namesp, build: items::build_namesp },
        Builder { predicate: items::is_defer, build: items::build_defer },
        Builder { predicate: items::is_alias_use, build: items::build_alias_use },
        Builder { predicate: stmt::is_var_set, build: stmt::build_var_set },
        Builder { predicate: stmt::is_return_stmt, build: stmt::build_return_stmt },
        Builder { predicate: stmt::is_asm_code, build: stmt::build_asm_code },
        Builder { predicate: items::is_operation_decl, build: items::build_operation_decl },
        Builder { predicate: items::is_cast_decl, build: items::build_cast_decl },
        Builder { predicate: stmt::is_if_stmt, build: stmt::build_if_stmt },
        Builder { predicate: stmt::is_while_stmt, build: stmt::build_while_stmt },
        Builder { predicate: stmt::is_do_while_stmt, build: stmt::build_do_while_stmt },
        Builder { predicate: stmt::is_for_stmt, build: stmt::build_for_stmt },
        Builder { predicate: items::is_alias_decl, build: items::build_alias_decl },
    ]
}

pub struct Parser {
    content: Vec<Token>,
    pos: usize,

    pub handler: slate_util::diagnostic::Handler,
    pub arena: Arena,

    scope_depth: u32,
    variables: Vec<Variable>,
    scope_marks: Vec<usize>,
    defers_stack: Vec<Vec<NodeId>>,
    namespace_stack: Vec<String>,

    declared_types: DeclaredTypes,
    functions: HashMap<String, Vec<NodeId>>,
    operations: Vec<Operation>,
    casts: Vec<Cast>,
    autocasts: Vec<Cast>,
    aliases: HashMap<String, Vec<NodeId>>,

    loader: Box<dyn SourceLoader>,
    ext: String,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, loader: Box<dyn SourceLoader>, ext: impl Into<String>) -> Self {
        Parser {
            content: tokens,
            pos: 0,
            handler: slate_util::diagnostic::Handler::new(),
            arena: Arena::new(),
            scope_depth: 0,
            variables: Vec::new(),
            scope_marks: Vec::new(),
            defers_stack: Vec::new(),
            namespace_stack: Vec::new(),
            declared_types: DeclaredTypes::new(),
            functions: HashMap::new(),
            operations: Vec::new(),
            casts: Vec::new(),
            autocasts: Vec::new(),
            aliases: HashMap::new(),
            loader,
            ext: ext.into(),
        }
    }

    pub fn parse(mut self) -> CompileResult<Program> {
        let mut statements = Vec::new();
        while self.has_peek() {
            let id = self.parse_single()?;
            self.flatten_into(id, &mut statements);
        }
        Ok(Program {
            statements,
            arena: self.arena,
            declared_types: self.declared_types,
            functions: self.functions,
            operations: self.operations,
            casts: self.casts,
            autocasts: self.autocasts,
        })
    }

    fn parse_single(&mut self) -> CompileResult<NodeId> {
        for builder in builders() {
            if (builder.predicate)(self) {
                return (builder.build)(self);
            }
        }
        Err(self.fail(ErrorKind::SyntaxError, "No statement matches the current token"))
    }

    /// Consume a `{ ... }` block, flattening each built statement into the
    /// returned list (so `namesp`/`public_field`/`alias_use` splice their
    /// captured bodies in rather than appearing themselves).
    pub(crate) fn parse_block_body(&mut self) -> CompileResult<Vec<NodeId>> {
        self.try_consume_or(&Token::new(TokenKind::OpenCurly, 0, ""), ErrorKind::MissingToken, "Expected '{'")?;
        let mut body = Vec::new();
        loop {
            if self.try_consume(&Token::new(TokenKind::CloseCurly, 0, "")) {
                break;
            }
            if !self.has_peek() {
                return Err(self.fail(ErrorKind::MissingToken, "Expected '}'"));
            }
            let id = self.parse_single()?;
            self.flatten_into(id, &mut body);
        }
        Ok(body)
    }

    /// `namesp`/`public_field` do not emit nodes themselves; their captured
    /// body is appended to the output list in their place. `alias_use`
    /// replays the aliased declaration's captured body the same way. Every
    /// other kind falls back to the node's own `add` flag.
    pub(crate) fn flatten_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match &self.arena.nodes[id].payload {
            NodePayload::Namesp(n) => out.extend(n.body.iter().copied()),
            NodePayload::PublicField(n) => out.extend(n.body.iter().copied()),
            NodePayload::AliasUse(a) => {
                if let Some(body) = self.lookup_alias(&a.name) {
                    out.extend(body.iter().copied());
                }
            }
            _ => {
                if self.arena.nodes[id].add {
                    out.push(id);
                }
            }
        }
    }

    /// Inserts `tokens` at the current cursor position, so the next
    /// `consume()` sees the first spliced token. Used by `import` to splice
    /// in tokens lexed from another file. A simpler, functionally
    /// equivalent restatement of the original's "insert in reverse order at
    /// one fixed index" trick.
    pub(crate) fn splice_tokens(&mut self, tokens: Vec<Token>) {
        let at = self.cursor();
        for (offset, token) in tokens.into_iter().enumerate() {
            self.content.insert(at + offset, token);
        }
    }

    /// Looks up a registered operation by shape alone (unary/symbols/operand
    /// types), ignoring return type and precedence — used to resolve an
    /// `operation_decl`'s relative `above <ref>`/`below <ref>` clause, which
    /// names a reference signature but not its return type.
    pub(crate) fn find_operation_by_shape(
        &self,
        unary: bool,
        symbols: &str,
        a: TypeId,
        b: Option<TypeId>,
    ) -> Option<&Operation> {
        self.operations.iter().find(|op| {
            op.unary == unary
                && op.symbols == symbols
                && self.arena.types_equal(op.a, a)
                && match (op.b, b) {
                    (Some(x), Some(y)) => self.arena.types_equal(x, y),
                    (None, None) => true,
                    _ => false,
                }
        })
    }

    /// Runs `body` against a token buffer lexed from an imported file,
    /// restoring the importer's own stream afterwards.
    pub(crate) fn with_tokens<R>(
        &mut self,
        new_tokens: Vec<Token>,
        body: impl FnOnce(&mut Self) -> CompileResult<R>,
    ) -> CompileResult<R> {
        let old_tokens = std::mem::replace(&mut self.content, new_tokens);
        let old_pos = std::mem::replace(&mut self.pos, 0);
        let result = body(self);
        self.content = old_tokens;
        self.pos = old_pos;
        result
    }

    pub(crate) fn source_ext(&self) -> &str {
        &self.ext
    }

    pub(crate) fn read_import(&self, path: &str) -> CompileResult<String> {
        self.loader.read_all(path)
    }

    // ---- identifiers & namespaces ----------------------------------

    pub(crate) fn get_identifier(&mut self) -> CompileResult<String> {
        Ok(self
            .try_consume_or(&Token::new(TokenKind::Identifier, 0, ""), ErrorKind::MissingToken, "Expected Identifier")?
            .value)
    }

    /// Qualifies `name` by the current namespace stack using `:` as the
    /// separator (source-level `::` already collapses to one `DColon`
    /// token at the lex stage; namespaces join with the same character).
    pub(crate) fn qualify(&self, name: &str) -> String {
        if self.namespace_stack.is_empty() {
            name.to_string()
        } else {
            format!("{}:{}", self.namespace_stack.join(":"), name)
        }
    }

    pub(crate) fn push_namespace(&mut self, name: String) {
        self.namespace_stack.push(name);
    }

    pub(crate) fn pop_namespace(&mut self) {
        self.namespace_stack.pop();
    }

    // ---- scopes & variables -----------------------------------------

    pub(crate) fn scope_depth(&self) -> u32 {
        self.scope_depth
    }

    pub(crate) fn enter_scope(&mut self) {
        self.scope_depth += 1;
        self.scope_marks.push(self.variables.len());
        self.defers_stack.push(Vec::new());
    }

    /// Truncates the variable table back to the scope's entry size
    /// (inner-scope locals are destroyed) and returns deferred statements
    /// in LIFO registration order, to be appended at the scope's exit.
    pub(crate) fn leave_scope(&mut self) -> Vec<NodeId> {
        self.scope_depth -= 1;
        let mark = self.scope_marks.pop().unwrap_or(0);
        self.variables.truncate(mark);
        let mut defers = self.defers_stack.pop().unwrap_or_default();
        defers.reverse();
        defers
    }

    pub(crate) fn register_defer(&mut self, node: NodeId) {
        if let Some(top) = self.defers_stack.last_mut() {
            top.push(node);
        }
    }

    pub(crate) fn declare_variable(&mut self, var: Variable) -> CompileResult<()> {
        if self.variables.iter().any(|v| v.name == var.name) {
            return Err(self.fail(ErrorKind::RedefinitionError, "Variable already exists in this scope"));
        }
        self.variables.push(var);
        Ok(())
    }

    pub(crate) fn lookup_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().rev().find(|v| v.name == name)
    }

    // ---- declared types -----------------------------------------------

    pub(crate) fn forward_declare_type(&mut self, name: String) -> CompileResult<()> {
        if self.declared_types.contains_key(&name) {
            return Err(self.fail(ErrorKind::RedefinitionError, "Type already declared"));
        }
        self.declared_types.insert(name, None);
        Ok(())
    }

    pub(crate) fn complete_type(&mut self, name: String, ty: TypeId) -> CompileResult<()> {
        match self.declared_types.get(&name) {
            Some(Some(_)) => Err(self.fail(ErrorKind::RedefinitionError, "Type already complete")),
            _ => {
                self.declared_types.insert(name, Some(ty));
                Ok(())
            }
        }
    }

    pub(crate) fn lookup_type(&self, name: &str) -> Option<Option<TypeId>> {
        self.declared_types.get(name).copied()
    }

    // ---- functions, operators, casts, aliases --------------------------

    pub(crate) fn register_function(&mut self, name: String, node: NodeId) {
        self.functions.entry(name).or_default().push(node);
    }

    pub(crate) fn functions_named(&self, name: &str) -> &[NodeId] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn find_operation(&self, op: &Operation) -> Option<&Operation> {
        self.operations.iter().find(|existing| existing.same_signature(op))
    }

    pub(crate) fn register_operation(&mut self, op: Operation) -> CompileResult<()> {
        if self.find_operation(&op).is_some() {
            return Err(self.fail(ErrorKind::RedefinitionError, "Operation already exists"));
        }
        self.operations.push(op);
        Ok(())
    }

    pub(crate) fn find_cast(&self, auto: bool, cast: &Cast) -> Option<&Cast> {
        let list = if auto { &self.autocasts } else { &self.casts };
        list.iter().find(|existing| existing.same_signature(cast))
    }

    pub(crate) fn autocasts(&self) -> &[Cast] {
        &self.autocasts
    }

    pub(crate) fn register_cast(&mut self, auto: bool, cast: Cast) -> CompileResult<()> {
        if self.find_cast(auto, &cast).is_some() {
            return Err(self.fail(ErrorKind::RedefinitionError, "Cast already exists"));
        }
        if auto {
            self.autocasts.push(cast);
        } else {
            self.casts.push(cast);
        }
        Ok(())
    }

    pub(crate) fn register_alias(&mut self, name: String, body: Vec<NodeId>) -> CompileResult<()> {
        if self.aliases.contains_key(&name) {
            return Err(self.fail(ErrorKind::RedefinitionError, "Alias already exists"));
        }
        self.aliases.insert(name, body);
        Ok(())
    }

    pub(crate) fn lookup_alias(&self, name: &str) -> Option<&[NodeId]> {
        self.aliases.get(name).map(Vec::as_slice)
    }
}

impl Processor for Parser {
    type Item = Token;

    fn items(&self) -> &[Token] {
        &self.content
    }
    fn cursor(&self) -> usize {
        self.pos
    }
    fn set_cursor(&mut self, pos: usize) {
        self.pos = pos;
    }
    fn null_item(&self) -> Token {
        Token::null()
    }

    fn current_line(&self) -> u32 {
        self.peek_at(-1).line
    }
    fn render_current(&self) -> String {
        self.peek_at(-1).render()
    }

    fn items_equal(&self, a: &Token, b: &Token) -> bool {
        if a.kind != b.kind {
            return false;
        }
        if !a.value.is_empty() && !b.value.is_empty() && a.value != b.value {
            return false;
        }
        true
    }
}

/// Lex-only re-processing of an imported file's tokens (imports are not
/// macro-expanded; §4.3 "Imports").
pub(crate) fn lex_import(source: &str) -> CompileResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Parser::new(tokens, Box::new(NoImports), ".sl").parse().unwrap()
    }

    #[test]
    fn var_decl_resolves_declared_type() {
        let program = parse("var x : int = 1;");
        assert_eq!(program.statements.len(), 1);
        let node = &program.arena.nodes[program.statements[0]];
        match &node.payload {
            NodePayload::VarDecl(v) => assert_eq!(program.arena.types[v.var.ty].kind, TypeKind::Int),
            other => panic!("expected VarDecl, got {other:?}"),
        }
    }

    #[test]
    fn inner_scope_variable_does_not_escape() {
        let program = parse("{ var x : int = 1; }");
        assert_eq!(program.statements.len(), 1);
    }
}
