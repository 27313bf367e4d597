//! The token model shared by the preprocessor and parser.

/// The tag half of a [`Token`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Punctuation
    OpenParen,
    CloseParen,
    OpenCurly,
    CloseCurly,
    OpenAngle,
    CloseAngle,
    OpenSquare,
    CloseSquare,
    Semicolon,
    Colon,
    DColon,
    Dot,
    Comma,
    Pipe,
    Arrow,
    At,
    PublicClosure,
    Preprocessor,

    // Generic categories
    Literal,
    Symbols,
    Identifier,

    // Reserved words
    Var,
    Int,
    Uint,
    Float,
    Long,
    Ulong,
    Double,
    Char,
    Byte,
    Boolean,
    Str,
    Void,
    Mutable,
    Struct,
    Union,
    Interface,
    As,
    Return,
    Asm,
    Type,
    If,
    Else,
    While,
    Do,
    For,
    Namespace,
    Defer,
    Func,
    Inline,
    Public,
    Import,
    Below,
    Above,
    All,
    NoneKw,
    Operation,
    Cast,
    Autocast,

    // Preprocessor keywords
    Define,
    Ifdef,
    Ifndef,
    Endif,
    Undef,
    Keyword,
    Macro,
    Template,
    Logi,
    Logw,
    Loge,

    /// Sentinel returned once the cursor runs past the end of input.
    Null,
}

impl TokenKind {
    /// The reserved-word table: language keywords and preprocessor directive
    /// keywords share one namespace, exactly as spec.md's Token model lists
    /// them together.
    pub fn reserved_word(text: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match text {
            "var" => Var,
            "int" => Int,
            "uint" => Uint,
            "float" => Float,
            "long" => Long,
            "ulong" => Ulong,
            "double" => Double,
            "char" => Char,
            "byte" => Byte,
            "boolean" => Boolean,
            "string" => Str,
            "void" => Void,
            "mutable" => Mutable,
            "struct" => Struct,
            "union" => Union,
            "interface" => Interface,
            "as" => As,
            "return" => Return,
            "asm" => Asm,
            "type" => Type,
            "if" => If,
            "else" => Else,
            "while" => While,
            "do" => Do,
            "for" => For,
            "namespace" => Namespace,
            "defer" => Defer,
            "func" => Func,
            "inline" => Inline,
            "public" => Public,
            "import" => Import,
            "below" => Below,
            "above" => Above,
            "all" => All,
            "none" => NoneKw,
            "operation" => Operation,
            "cast" => Cast,
            "autocast" => Autocast,
            "define" => Define,
            "ifdef" => Ifdef,
            "ifndef" => Ifndef,
            "endif" => Endif,
            "undef" => Undef,
            "keyword" => Keyword,
            "macro" => Macro,
            "template" => Template,
            "logi" => Logi,
            "logw" => Logw,
            "loge" => Loge,
            _ => return None,
        })
    }
}

/// A single lexeme: its tag, the line it started on, and its literal text.
///
/// `value` carries the raw lexeme for generic categories (`literal`,
/// `symbols`, `identifier`), the verbatim block body for `asm`, and is empty
/// for single-character punctuation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32, value: impl Into<String>) -> Self {
        Token { kind, line, value: value.into() }
    }

    pub fn punct(kind: TokenKind, line: u32) -> Self {
        Token::new(kind, line, "")
    }

    /// The sentinel token returned past the end of input.
    pub fn null() -> Self {
        Token::new(TokenKind::Null, 0, "")
    }

    pub fn is_null(&self) -> bool {
        self.kind == TokenKind::Null
    }

    /// Short rendering used as error context, matching the original's
    /// "render the current token" debug string.
    pub fn render(&self) -> String {
        if self.value.is_empty() {
            format!("{:?}", self.kind)
        } else {
            self.value.clone()
        }
    }
}
