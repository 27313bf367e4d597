//! Token-level macro expansion: `#define`/`#macro`/`#keyword`/`#template`,
//! conditional compilation, and `@fragment` identifier substitution.
//!
//! The preprocessor walks a token stream and produces an expanded one,
//! re-using the same [`slate_util::Processor`] cursor the lexer and parser
//! are built on. Four name tables (`definitions`, `macros`, `keywords`,
//! `templates`) plus a transient `internal` substitution scope carry state
//! across nested expansions.

mod directive;
mod identifier;

use std::collections::HashMap;

use slate_lex::{Token, TokenKind};
use slate_util::diagnostic::Handler;
use slate_util::processor::Processor;
use slate_util::CompileResult;

/// A registered `#template` declaration.
#[derive(Debug, Clone)]
pub struct Template {
    pub generics: Vec<String>,
    pub params: Vec<String>,
    pub body: String,
    pub content: Vec<Token>,
}

/// Tokens in, expanded tokens out.
pub struct Preprocessor {
    content: Vec<Token>,
    pos: usize,

    definitions: HashMap<String, Vec<Token>>,
    internal: HashMap<String, Vec<Token>>,
    macros: HashMap<String, (Vec<String>, Vec<Token>)>,
    keywords: HashMap<String, (Token, Vec<Token>)>,
    templates: HashMap<String, Template>,

    pub handler: Handler,
}

impl Preprocessor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Preprocessor {
            content: tokens,
            pos: 0,
            definitions: HashMap::new(),
            internal: HashMap::new(),
            macros: HashMap::new(),
            keywords: HashMap::new(),
            templates: HashMap::new(),
            handler: Handler::new(),
        }
    }

    /// Expand the whole token stream, returning the flattened output.
    pub fn preprocess(mut self) -> CompileResult<Vec<Token>> {
        let mut out = Vec::new();
        self.preprocess_into(&mut out)?;
        Ok(out)
    }

    fn preprocess_into(&mut self, out: &mut Vec<Token>) -> CompileResult<()> {
        while self.has_peek() {
            self.preprocess_single(out)?;
        }
        Ok(())
    }

    fn preprocess_single(&mut self, out: &mut Vec<Token>) -> CompileResult<()> {
        if self.try_consume(&Token::new(TokenKind::Preprocessor, 0, "")) {
            directive::preprocess_directive(self, out)
        } else if self.peek().kind == TokenKind::Identifier {
            identifier::preprocess_identifier(self, out)
        } else {
            out.push(self.consume());
            Ok(())
        }
    }

    fn is_unique(&self, name: &str) -> bool {
        !self.definitions.contains_key(name)
            && !self.macros.contains_key(name)
            && !self.keywords.contains_key(name)
            && !self.templates.contains_key(name)
    }

    fn must_be_unique(&self, name: &str) -> CompileResult<()> {
        if self.is_unique(name) {
            Ok(())
        } else {
            Err(self.fail(slate_util::ErrorKind::RedefinitionError, "Definition already exists"))
        }
    }

    fn get_identifier(&mut self) -> CompileResult<String> {
        Ok(self
            .try_consume_or(
                &Token::new(TokenKind::Identifier, 0, ""),
                slate_util::ErrorKind::MissingToken,
                "Expected Identifier",
            )?
            .value)
    }

    /// Temporarily operate on a different token buffer, restoring the
    /// previous one on every exit path (success or error) — the scoped
    /// acquisition spec.md calls for around every expansion.
    fn with_tokens<R>(
        &mut self,
        new_tokens: Vec<Token>,
        start: usize,
        body: impl FnOnce(&mut Self) -> CompileResult<R>,
    ) -> CompileResult<R> {
        let old_tokens = std::mem::replace(&mut self.content, new_tokens);
        let old_pos = std::mem::replace(&mut self.pos, start);
        let result = body(self);
        self.content = old_tokens;
        self.pos = old_pos;
        result
    }

    /// Bind `name` to `tokens` in the `internal` table for the duration of
    /// `body`, unbinding on every exit path.
    fn with_internal<R>(
        &mut self,
        name: impl Into<String>,
        tokens: Vec<Token>,
        body: impl FnOnce(&mut Self) -> CompileResult<R>,
    ) -> CompileResult<R> {
        let name = name.into();
        self.internal.insert(name.clone(), tokens);
        let result = body(self);
        self.internal.remove(&name);
        result
    }

    /// Gather a comma-separated run of token groups up to (and consuming)
    /// `terminator`. Shared by macro arguments and template generic/param
    /// lists.
    fn gather_groups(
        &mut self,
        terminator: &Token,
        kind: slate_util::ErrorKind,
        message: &str,
    ) -> CompileResult<Vec<Vec<Token>>> {
        let mut groups = Vec::new();
        let mut buffer = Vec::new();
        self.do_until_find_or(
            terminator,
            |p| {
                if p.try_consume(&Token::new(TokenKind::Comma, 0, "")) {
                    groups.push(std::mem::take(&mut buffer));
                } else {
                    buffer.push(p.consume());
                }
                Ok(())
            },
            kind,
            message,
        )?;
        groups.push(buffer);
        Ok(groups)
    }
}

impl Processor for Preprocessor {
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

    // The original renders the *previously consumed* token for error
    // context (`peek(-1)`), not the one about to be read.
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

#[cfg(test)]
mod tests {
    use super::*;
    use slate_lex::Lexer;

    fn expand(src: &str) -> Vec<Token> {
        let tokens = Lexer::new(src).tokenize().unwrap();
        Preprocessor::new(tokens).preprocess().unwrap()
    }

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().filter(|t| t.kind != TokenKind::Null).map(|t| t.value.as_str()).collect()
    }

    #[test]
    fn define_and_use() {
        let out = expand("#define N 42 #\n var x : int = N;");
        assert_eq!(values(&out), vec!["var", "x", "int", "42", ";"]);
    }

    #[test]
    fn ifdef_branch_selects_the_defined_arm() {
        let out = expand("#define A 1 #\n #ifndef A x #endif #ifdef A y #endif");
        assert_eq!(values(&out), vec!["y"]);
    }

    #[test]
    fn macro_expansion_substitutes_arguments() {
        let out = expand("#macro M(a, b) a + b #\n M(3, 4);");
        assert_eq!(values(&out), vec!["3", "+", "4", ";"]);
    }

    #[test]
    fn undef_makes_a_name_unresolvable() {
        let out = expand("#define N 1 #\n #undef N\n N");
        assert_eq!(values(&out), vec!["N"]);
    }

    #[test]
    fn keyword_binds_a_single_trailing_token() {
        let out = expand("#keyword K<X> X + 1 #\n K 5;");
        assert_eq!(values(&out), vec!["5", "+", "1", ";"]);
    }
}
