//! Token types for the rule-file lexer.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Var,
    Str,
    Regex,
    Int,
    Float,
    LBrace,
    RBrace,
    Colon,
    Equals,
    LParen,
    RParen,
    Star,
    Eof,
    Unknown,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Var => "$variable",
            TokenKind::Str => "string",
            TokenKind::Regex => "regex literal",
            TokenKind::Int => "integer",
            TokenKind::Float => "float",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Colon => "':'",
            TokenKind::Equals => "'='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Star => "'*'",
            TokenKind::Eof => "end of input",
            TokenKind::Unknown => "unknown character",
        };
        write!(f, "{s}")
    }
}

/// A lexed token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, offset: usize, line: usize, column: usize) -> Self {
        Self {
            kind,
            text,
            offset,
            line,
            column,
        }
    }

    pub fn eof(offset: usize, line: usize, column: usize) -> Self {
        Self::new(TokenKind::Eof, "", offset, line, column)
    }
}
