//! Parser for the condition language (spec'd grammar in §4.3.1).
//!
//! Operates on its own small token stream rather than reusing the rule
//! lexer: condition text is a flat boolean expression (words, `$vars`,
//! `.`, `*`, parens) with none of the rule lexer's string/regex literal
//! forms, so a dedicated word-oriented tokenizer is simpler than bolting
//! expression parsing onto the block lexer.

use super::ast::{Condition, Section};
use crate::error::NovaError;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Word(String),
    Var(String),
    Dot,
    Star,
    LParen,
    RParen,
    Eof,
}

struct CondLexer<'a> {
    chars: std::str::Chars<'a>,
    rest: &'a str,
}

impl<'a> CondLexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars(),
            rest: src,
        }
    }

    fn tokens(src: &'a str) -> Vec<Tok> {
        let mut lexer = CondLexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_tok();
            let done = tok == Tok::Eof;
            out.push(tok);
            if done {
                break;
            }
        }
        out
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.rest = self.chars.as_str();
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn next_tok(&mut self) -> Tok {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                _ => break,
            }
        }
        let Some(c) = self.peek() else {
            return Tok::Eof;
        };
        match c {
            '.' => {
                self.bump();
                Tok::Dot
            }
            '*' => {
                self.bump();
                Tok::Star
            }
            '(' => {
                self.bump();
                Tok::LParen
            }
            ')' => {
                self.bump();
                Tok::RParen
            }
            '$' => {
                self.bump();
                let start = self.rest;
                let mut len = 0;
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        self.bump();
                        len += c.len_utf8();
                    } else {
                        break;
                    }
                }
                Tok::Var(start[..len].to_string())
            }
            _ if c.is_alphanumeric() || c == '_' => {
                let start = self.rest;
                let mut len = 0;
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        self.bump();
                        len += c.len_utf8();
                    } else {
                        break;
                    }
                }
                Tok::Word(start[..len].to_string())
            }
            other => {
                self.bump();
                Tok::Word(other.to_string())
            }
        }
    }
}

struct CondParser {
    tokens: Vec<Tok>,
    pos: usize,
}

type PResult<T> = std::result::Result<T, NovaError>;

impl CondParser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Tok {
        let t = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Tok::Word(s) if s.eq_ignore_ascii_case(w))
    }

    fn expect_word(&mut self, w: &str) -> PResult<()> {
        if self.is_word(w) {
            self.bump();
            Ok(())
        } else {
            Err(NovaError::Condition(format!("expected '{w}', found {:?}", self.peek())))
        }
    }

    fn expect(&mut self, expected: &Tok) -> PResult<()> {
        if self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(NovaError::Condition(format!(
                "expected {expected:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn parse_expr(&mut self) -> PResult<Condition> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Condition> {
        let mut lhs = self.parse_and()?;
        while self.is_word("or") {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Condition> {
        let mut lhs = self.parse_not()?;
        while self.is_word("and") {
            self.bump();
            let rhs = self.parse_not()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> PResult<Condition> {
        if self.is_word("not") {
            self.bump();
            let inner = self.parse_not()?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> PResult<Condition> {
        if self.peek() == &Tok::LParen {
            self.bump();
            let inner = self.parse_expr()?;
            self.expect(&Tok::RParen)?;
            return Ok(inner);
        }
        if self.is_word("any") {
            return self.parse_quantifier();
        }
        self.parse_var_ref()
    }

    /// `any of section.*` or `any of ( [section.] $prefix * )`.
    fn parse_quantifier(&mut self) -> PResult<Condition> {
        self.expect_word("any")?;
        self.expect_word("of")?;

        if self.peek() == &Tok::LParen {
            self.bump();
            let section = match self.peek().clone() {
                Tok::Word(w) if Section::parse(&w).is_some() => {
                    self.bump();
                    self.expect(&Tok::Dot)?;
                    Section::parse(&w)
                }
                _ => None,
            };
            let prefix = match self.bump() {
                Tok::Var(name) => name,
                other => return Err(NovaError::Condition(format!("expected $prefix, found {other:?}"))),
            };
            self.expect(&Tok::Star)?;
            self.expect(&Tok::RParen)?;
            return Ok(Condition::PrefixWildcard { section, prefix });
        }

        let section = match self.bump() {
            Tok::Word(w) => Section::parse(&w)
                .ok_or_else(|| NovaError::Condition(format!("unknown section '{w}'")))?,
            other => return Err(NovaError::Condition(format!("expected section name, found {other:?}"))),
        };
        self.expect(&Tok::Dot)?;
        self.expect(&Tok::Star)?;
        Ok(Condition::SectionWildcard(section))
    }

    /// `section.$name[*]` or bare `$name`.
    fn parse_var_ref(&mut self) -> PResult<Condition> {
        if let Tok::Word(w) = self.peek().clone() {
            if let Some(section) = Section::parse(&w) {
                self.bump();
                self.expect(&Tok::Dot)?;
                if self.peek() == &Tok::Star {
                    self.bump();
                    return Ok(Condition::SectionWildcard(section));
                }
                let name = match self.bump() {
                    Tok::Var(name) => name,
                    other => {
                        return Err(NovaError::Condition(format!(
                            "expected $name after '{w}.', found {other:?}"
                        )))
                    }
                };
                if self.peek() == &Tok::Star {
                    self.bump();
                    return Ok(Condition::PrefixWildcard {
                        section: Some(section),
                        prefix: name,
                    });
                }
                return Ok(Condition::Var {
                    section: Some(section),
                    name,
                });
            }
        }

        match self.bump() {
            Tok::Var(name) => Ok(Condition::Var { section: None, name }),
            other => Err(NovaError::Condition(format!("expected a variable reference, found {other:?}"))),
        }
    }
}

/// Parses a condition string into an AST. An empty (all-whitespace) string
/// parses to `Condition::Empty`.
pub fn parse_condition(text: &str) -> PResult<Condition> {
    if text.trim().is_empty() {
        return Ok(Condition::Empty);
    }
    let tokens = CondLexer::tokens(text);
    let mut parser = CondParser { tokens, pos: 0 };
    let cond = parser.parse_expr()?;
    if parser.peek() != &Tok::Eof {
        return Err(NovaError::Condition(format!(
            "unexpected trailing token {:?}",
            parser.peek()
        )));
    }
    Ok(cond)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_var() {
        assert_eq!(
            parse_condition("$hack").unwrap(),
            Condition::Var { section: None, name: "hack".into() }
        );
    }

    #[test]
    fn parses_section_wildcard_via_any_of() {
        assert_eq!(
            parse_condition("any of keywords.*").unwrap(),
            Condition::SectionWildcard(Section::Keywords)
        );
    }

    #[test]
    fn parses_cross_section_prefix_quantifier() {
        assert_eq!(
            parse_condition("any of ($mal*)").unwrap(),
            Condition::PrefixWildcard { section: None, prefix: "mal".into() }
        );
    }

    #[test]
    fn parses_section_qualified_prefix_quantifier() {
        assert_eq!(
            parse_condition("any of (keywords.$mal*)").unwrap(),
            Condition::PrefixWildcard { section: Some(Section::Keywords), prefix: "mal".into() }
        );
    }

    #[test]
    fn precedence_not_and_or() {
        // $a and $b or $c and $d  ==  ($a and $b) or ($c and $d)
        let parsed = parse_condition("$a and $b or $c and $d").unwrap();
        let expected = Condition::Or(
            Box::new(Condition::And(
                Box::new(Condition::Var { section: None, name: "a".into() }),
                Box::new(Condition::Var { section: None, name: "b".into() }),
            )),
            Box::new(Condition::And(
                Box::new(Condition::Var { section: None, name: "c".into() }),
                Box::new(Condition::Var { section: None, name: "d".into() }),
            )),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_binds_tighter_than_and() {
        let parsed = parse_condition("not $a and $b").unwrap();
        let expected = Condition::And(
            Box::new(Condition::Not(Box::new(Condition::Var { section: None, name: "a".into() }))),
            Box::new(Condition::Var { section: None, name: "b".into() }),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parens_override_precedence() {
        let parsed = parse_condition("$sqlmap and (any of semantics.*) and llm.$chk").unwrap();
        assert!(matches!(parsed, Condition::And(_, _)));
    }

    #[test]
    fn empty_text_is_empty_condition() {
        assert_eq!(parse_condition("   ").unwrap(), Condition::Empty);
    }

    #[test]
    fn malformed_expression_is_an_error() {
        assert!(parse_condition("$a and").is_err());
        assert!(parse_condition("and $a").is_err());
        assert!(parse_condition("(  $a").is_err());
    }
}
