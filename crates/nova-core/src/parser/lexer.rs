//! Zero-copy lexer for rule source text.
//!
//! Comments are stripped by the caller before lexing (see
//! `strip_comments`), replacing their contents with spaces so that byte
//! offsets — and therefore line/column numbers — are unaffected.

use super::token::{Token, TokenKind};

/// Replaces `// ...` (to end of line) and `/* ... */` comments with spaces,
/// preserving newlines so line numbers in later diagnostics stay accurate.
pub fn strip_comments(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                out.push(b' ');
                i += 1;
            }
        } else if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            out.push(b' ');
            out.push(b' ');
            i += 2;
            while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                i += 1;
            }
            if i < bytes.len() {
                out.push(b' ');
                out.push(b' ');
                i += 2;
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).expect("comment stripping preserves UTF-8 boundaries")
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
            done: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_char_at(&self, ahead: usize) -> Option<char> {
        self.remaining().chars().nth(ahead)
    }

    fn advance(&mut self, c: char) {
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance(c);
            } else {
                break;
            }
        }
    }

    fn read_quoted_string(&mut self) -> Token<'a> {
        let (start, line, column) = (self.position, self.line, self.column);
        let quote = self.peek_char().unwrap();
        self.advance(quote);

        let content_start = self.position;
        let mut content_end = content_start;
        while let Some(c) = self.peek_char() {
            if c == '\\' {
                self.advance(c);
                if let Some(escaped) = self.peek_char() {
                    self.advance(escaped);
                }
                content_end = self.position;
                continue;
            }
            if c == quote {
                content_end = self.position;
                self.advance(c);
                break;
            }
            self.advance(c);
            content_end = self.position;
        }

        Token::new(
            TokenKind::Str,
            &self.input[content_start..content_end],
            start,
            line,
            column,
        )
    }

    fn read_regex(&mut self) -> Token<'a> {
        let (start, line, column) = (self.position, self.line, self.column);
        self.advance('/'); // opening delimiter

        let content_start = self.position;
        let mut content_end = content_start;
        while let Some(c) = self.peek_char() {
            if c == '\\' {
                self.advance(c);
                if let Some(escaped) = self.peek_char() {
                    self.advance(escaped);
                }
                content_end = self.position;
                continue;
            }
            if c == '/' {
                content_end = self.position;
                self.advance(c);
                break;
            }
            self.advance(c);
            content_end = self.position;
        }

        Token::new(
            TokenKind::Regex,
            &self.input[content_start..content_end],
            start,
            line,
            column,
        )
    }

    fn read_var(&mut self) -> Token<'a> {
        let (start, line, column) = (self.position, self.line, self.column);
        self.advance('$');
        let name_start = self.position;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.advance(c);
            } else {
                break;
            }
        }
        Token::new(
            TokenKind::Var,
            &self.input[name_start..self.position],
            start,
            line,
            column,
        )
    }

    fn read_ident(&mut self) -> Token<'a> {
        let (start, line, column) = (self.position, self.line, self.column);
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.advance(c);
            } else {
                break;
            }
        }
        Token::new(
            TokenKind::Ident,
            &self.input[start..self.position],
            start,
            line,
            column,
        )
    }

    fn read_number(&mut self) -> Token<'a> {
        let (start, line, column) = (self.position, self.line, self.column);
        let mut is_float = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance(c);
            } else if c == '.' && !is_float && matches!(self.peek_char_at(1), Some(d) if d.is_ascii_digit())
            {
                is_float = true;
                self.advance(c);
            } else {
                break;
            }
        }
        let kind = if is_float { TokenKind::Float } else { TokenKind::Int };
        Token::new(kind, &self.input[start..self.position], start, line, column)
    }

    fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();

        let (offset, line, column) = (self.position, self.line, self.column);
        let Some(c) = self.peek_char() else {
            self.done = true;
            return Token::eof(offset, line, column);
        };

        match c {
            '"' | '\'' => self.read_quoted_string(),
            '/' => self.read_regex(),
            '$' => self.read_var(),
            '{' => {
                self.advance(c);
                Token::new(TokenKind::LBrace, &self.input[offset..self.position], offset, line, column)
            }
            '}' => {
                self.advance(c);
                Token::new(TokenKind::RBrace, &self.input[offset..self.position], offset, line, column)
            }
            ':' => {
                self.advance(c);
                Token::new(TokenKind::Colon, &self.input[offset..self.position], offset, line, column)
            }
            '=' => {
                self.advance(c);
                Token::new(TokenKind::Equals, &self.input[offset..self.position], offset, line, column)
            }
            '(' => {
                self.advance(c);
                Token::new(TokenKind::LParen, &self.input[offset..self.position], offset, line, column)
            }
            ')' => {
                self.advance(c);
                Token::new(TokenKind::RParen, &self.input[offset..self.position], offset, line, column)
            }
            '*' => {
                self.advance(c);
                Token::new(TokenKind::Star, &self.input[offset..self.position], offset, line, column)
            }
            _ if c.is_ascii_digit() => self.read_number(),
            _ if c.is_alphanumeric() || c == '_' => self.read_ident(),
            _ => {
                self.advance(c);
                Token::new(TokenKind::Unknown, &self.input[offset..self.position], offset, line, column)
            }
        }
    }

    /// Current byte offset, for splicing out raw condition text.
    pub fn offset(&self) -> usize {
        self.position
    }

    pub fn line_column(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// Resets the lexer to resume scanning from a given byte offset,
    /// recomputing line/column by counting newlines up to that point. Used
    /// once the parser has spliced out a raw condition span and needs to
    /// continue tokenising the rest of the rule block.
    pub fn seek(&mut self, offset: usize) {
        let consumed = &self.input[..offset];
        self.line = 1 + consumed.matches('\n').count();
        self.column = match consumed.rfind('\n') {
            Some(idx) => consumed[idx + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };
        self.position = offset;
        self.done = false;
    }

    pub fn source(&self) -> &'a str {
        self.input
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.done = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn strips_line_and_block_comments_preserving_newlines() {
        let src = "a // comment\nb /* block\ncomment */ c";
        let stripped = strip_comments(src);
        assert_eq!(stripped.matches('\n').count(), src.matches('\n').count());
        assert!(!stripped.contains("comment"));
    }

    #[test]
    fn lexes_rule_header() {
        let k = kinds("rule foo {");
        assert_eq!(k, vec![TokenKind::Ident, TokenKind::Ident, TokenKind::LBrace, TokenKind::Eof]);
    }

    #[test]
    fn lexes_var_and_string() {
        let mut lx = Lexer::new("$hack = \"hack\"");
        let t1 = lx.next().unwrap();
        assert_eq!(t1.kind, TokenKind::Var);
        assert_eq!(t1.text, "hack");
        lx.next(); // '='
        let t3 = lx.next().unwrap();
        assert_eq!(t3.kind, TokenKind::Str);
        assert_eq!(t3.text, "hack");
    }

    #[test]
    fn lexes_regex_literal() {
        let mut lx = Lexer::new("/[a-z]+/");
        let t = lx.next().unwrap();
        assert_eq!(t.kind, TokenKind::Regex);
        assert_eq!(t.text, "[a-z]+");
    }

    #[test]
    fn lexes_float_and_int() {
        let k = kinds("10 0.8");
        assert_eq!(k, vec![TokenKind::Int, TokenKind::Float, TokenKind::Eof]);
    }

    #[test]
    fn tracks_line_and_column() {
        let mut lx = Lexer::new("a\nb");
        let t1 = lx.next().unwrap();
        assert_eq!((t1.line, t1.column), (1, 1));
        let t2 = lx.next().unwrap();
        assert_eq!((t2.line, t2.column), (2, 1));
    }
}
