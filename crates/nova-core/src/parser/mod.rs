//! Rule file parser.
//!
//! Turns `.nov`/`.nova` source text into a list of `Rule`s. A rule block is
//! `rule IDENT { section* }` where each section is one of `meta`,
//! `keywords`, `fuzzy`, `semantics`, `llm`, or `condition` (§4.1). A parse
//! error aborts only the rule block it occurs in; `parse_str`/`parse_file`
//! recover at the next `rule` keyword and keep going, matching the "batch
//! parsing may continue to the next rule" failure mode.

mod lexer;
mod token;

use std::path::Path;

use crate::condition::{self, Condition};
use crate::error::NovaError;
use crate::model::{FuzzyPattern, KeywordPattern, LLMPattern, OrderedMap, Rule, SemanticPattern};
use lexer::{strip_comments, Lexer};
use token::{Token, TokenKind};

const SECTION_HEADERS: [&str; 6] = ["meta", "keywords", "fuzzy", "semantics", "llm", "condition"];

fn is_section_header(word: &str) -> bool {
    SECTION_HEADERS.contains(&word)
}

fn is_ident_name(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_') && word.chars().all(|c| c.is_alphanumeric() || c == '_')
}

pub struct Parser;

impl Parser {
    /// Parses all rule blocks in `src`. Returns the rules that parsed
    /// successfully and the errors for any blocks that didn't.
    pub fn parse_str(src: &str, file: &str) -> (Vec<Rule>, Vec<NovaError>) {
        let stripped = strip_comments(src);
        let mut lexer = Lexer::new(&stripped);
        let mut rules = Vec::new();
        let mut errors = Vec::new();
        let mut seen_names: std::collections::HashSet<String> = std::collections::HashSet::new();

        loop {
            // Skip to the next top-level `rule` keyword or EOF.
            loop {
                let before = lexer.offset();
                match peek_kind(&lexer) {
                    TokenKind::Eof => return (rules, errors),
                    TokenKind::Ident if ident_text(&lexer) == "rule" => break,
                    _ => {
                        let mut probe = Lexer::new(stripped.as_str());
                        probe.seek(before);
                        probe.next();
                        lexer = probe;
                    }
                }
            }

            match parse_one_rule(&mut lexer, file) {
                Ok(rule) => {
                    if !seen_names.insert(rule.name.clone()) {
                        let (line, column) = lexer.line_column();
                        errors.push(NovaError::Parse {
                            file: file.to_string(),
                            line,
                            column,
                            message: format!("duplicate rule name '{}'", rule.name),
                        });
                    } else {
                        rules.push(rule);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
    }

    /// Reads `path` as UTF-8 and parses it. Non-UTF-8 content is a parse
    /// error per §6.1.
    pub fn parse_file(path: impl AsRef<Path>) -> (Vec<Rule>, Vec<NovaError>) {
        let path = path.as_ref();
        let file = path.to_string_lossy().to_string();
        match std::fs::read(path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(src) => Self::parse_str(&src, &file),
                Err(_) => (
                    Vec::new(),
                    vec![NovaError::Parse {
                        file,
                        line: 1,
                        column: 1,
                        message: "file is not valid UTF-8".to_string(),
                    }],
                ),
            },
            Err(err) => (
                Vec::new(),
                vec![NovaError::Parse {
                    file,
                    line: 1,
                    column: 1,
                    message: format!("could not read file: {err}"),
                }],
            ),
        }
    }
}

fn peek_kind(lexer: &Lexer<'_>) -> TokenKind {
    lexer.clone().next().map(|t| t.kind).unwrap_or(TokenKind::Eof)
}

fn ident_text(lexer: &Lexer<'_>) -> String {
    lexer.clone().next().map(|t| t.text.to_string()).unwrap_or_default()
}

impl<'a> Clone for Lexer<'a> {
    fn clone(&self) -> Self {
        let mut l = Lexer::new(self.source());
        l.seek(self.offset());
        l
    }
}

type PResult<T> = std::result::Result<T, NovaError>;

fn parse_err(lexer: &Lexer<'_>, file: &str, message: impl Into<String>) -> NovaError {
    let (line, column) = lexer.line_column();
    NovaError::Parse { file: file.to_string(), line, column, message: message.into() }
}

fn expect<'a>(lexer: &mut Lexer<'a>, kind: TokenKind, file: &str) -> PResult<Token<'a>> {
    let tok = lexer.next().ok_or_else(|| parse_err(lexer, file, "unexpected end of input"))?;
    if tok.kind == kind {
        Ok(tok)
    } else {
        Err(parse_err(lexer, file, format!("expected {kind}, found {} ('{}')", tok.kind, tok.text)))
    }
}

fn expect_ident<'a>(lexer: &mut Lexer<'a>, word: &str, file: &str) -> PResult<Token<'a>> {
    let tok = expect(lexer, TokenKind::Ident, file)?;
    if tok.text == word {
        Ok(tok)
    } else {
        Err(parse_err(lexer, file, format!("expected '{word}', found '{}'", tok.text)))
    }
}

fn parse_one_rule(lexer: &mut Lexer<'_>, file: &str) -> PResult<Rule> {
    expect_ident(lexer, "rule", file)?;
    let name_tok = expect(lexer, TokenKind::Ident, file)?;
    if !is_ident_name(name_tok.text) {
        return Err(parse_err(lexer, file, format!("invalid rule name '{}'", name_tok.text)));
    }
    let name = name_tok.text.to_string();
    expect(lexer, TokenKind::LBrace, file)?;

    let mut meta = OrderedMap::new();
    let mut keywords = OrderedMap::new();
    let mut fuzzy = OrderedMap::new();
    let mut semantics = OrderedMap::new();
    let mut llms = OrderedMap::new();
    let mut condition_text: Option<String> = None;

    loop {
        let next = lexer
            .clone()
            .next()
            .ok_or_else(|| parse_err(lexer, file, "unexpected end of input inside rule block"))?;

        if next.kind == TokenKind::RBrace {
            lexer.next();
            break;
        }

        if next.kind != TokenKind::Ident {
            return Err(parse_err(lexer, file, format!("expected section header, found '{}'", next.text)));
        }

        match next.text {
            "meta" => {
                lexer.next();
                expect(lexer, TokenKind::Colon, file)?;
                parse_meta(lexer, file, &mut meta)?;
            }
            "keywords" => {
                lexer.next();
                expect(lexer, TokenKind::Colon, file)?;
                parse_keywords(lexer, file, &mut keywords)?;
            }
            "fuzzy" => {
                lexer.next();
                expect(lexer, TokenKind::Colon, file)?;
                parse_fuzzy(lexer, file, &mut fuzzy)?;
            }
            "semantics" => {
                lexer.next();
                expect(lexer, TokenKind::Colon, file)?;
                parse_scored(lexer, file, &mut semantics, |pattern, threshold| SemanticPattern {
                    pattern,
                    threshold,
                })?;
            }
            "llm" => {
                lexer.next();
                expect(lexer, TokenKind::Colon, file)?;
                parse_scored(lexer, file, &mut llms, |pattern, threshold| LLMPattern { pattern, threshold })?;
            }
            "condition" => {
                lexer.next();
                expect(lexer, TokenKind::Colon, file)?;
                condition_text = Some(slurp_condition_text(lexer, file)?);
            }
            other => return Err(parse_err(lexer, file, format!("unknown section header '{other}'"))),
        }
    }

    let condition_raw = condition_text
        .ok_or_else(|| parse_err(lexer, file, format!("rule '{name}' is missing a condition section")))?;
    let condition_collapsed = collapse_whitespace(&condition_raw);
    if condition_collapsed.is_empty() {
        return Err(parse_err(lexer, file, format!("rule '{name}' has an empty condition")));
    }

    let condition_ast = condition::parse_condition(&condition_collapsed)
        .map_err(|e| parse_err(lexer, file, format!("rule '{name}': {e}")))?;

    let rule = Rule {
        name,
        meta,
        keywords,
        fuzzy,
        semantics,
        llms,
        condition: condition_collapsed,
        condition_ast,
    };

    validate_condition_refs(&rule.condition_ast, &rule)
        .map_err(|msg| parse_err(lexer, file, format!("rule '{}': {msg}", rule.name)))?;

    Ok(rule)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Consumes raw source text (not tokens) from the current position up to
/// the `}` that closes the rule block, since condition text "runs until
/// the end of the rule block" and is re-parsed independently (§4.1).
fn slurp_condition_text(lexer: &mut Lexer<'_>, file: &str) -> PResult<String> {
    let src = lexer.source();
    let start = lexer.offset();
    let end = src[start..]
        .find('}')
        .map(|rel| start + rel)
        .ok_or_else(|| parse_err(lexer, file, "rule block is missing a closing '}'"))?;
    let text = src[start..end].to_string();
    lexer.seek(end);
    Ok(text)
}

fn parse_meta(lexer: &mut Lexer<'_>, file: &str, meta: &mut OrderedMap<String>) -> PResult<()> {
    loop {
        let next = lexer.clone().next().ok_or_else(|| parse_err(lexer, file, "unexpected end of input"))?;
        if next.kind == TokenKind::RBrace || (next.kind == TokenKind::Ident && is_section_header(next.text)) {
            return Ok(());
        }
        let key_tok = expect(lexer, TokenKind::Ident, file)?;
        expect(lexer, TokenKind::Equals, file)?;
        let value_tok = expect(lexer, TokenKind::Str, file)?;
        if !meta.insert(key_tok.text, value_tok.text.to_string()) {
            return Err(parse_err(lexer, file, format!("duplicate meta key '{}'", key_tok.text)));
        }
    }
}

/// Parses a trailing `case:true`/`case:false` suffix. Returns the default
/// (`false`) when no suffix is present.
fn parse_case_suffix(lexer: &mut Lexer<'_>, file: &str) -> PResult<bool> {
    let is_case = matches!(lexer.clone().next(), Some(t) if t.kind == TokenKind::Ident && t.text == "case");
    if !is_case {
        return Ok(false);
    }
    lexer.next(); // "case"
    expect(lexer, TokenKind::Colon, file)?;
    let value_tok = expect(lexer, TokenKind::Ident, file)?;
    match value_tok.text {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(parse_err(lexer, file, format!("unknown case value '{other}'"))),
    }
}

fn parse_keywords(lexer: &mut Lexer<'_>, file: &str, keywords: &mut OrderedMap<KeywordPattern>) -> PResult<()> {
    loop {
        let next = lexer.clone().next().ok_or_else(|| parse_err(lexer, file, "unexpected end of input"))?;
        if next.kind == TokenKind::RBrace || (next.kind == TokenKind::Ident && is_section_header(next.text)) {
            return Ok(());
        }
        let var_tok = expect(lexer, TokenKind::Var, file)?;
        let var_name = var_tok.text.to_string();
        expect(lexer, TokenKind::Equals, file)?;

        let value_tok = lexer.next().ok_or_else(|| parse_err(lexer, file, "unexpected end of input"))?;
        let (pattern, is_regex) = match value_tok.kind {
            TokenKind::Str => (value_tok.text.to_string(), false),
            TokenKind::Regex => (value_tok.text.to_string(), true),
            other => return Err(parse_err(lexer, file, format!("expected string or regex literal, found {other}"))),
        };
        let case_sensitive = parse_case_suffix(lexer, file)?;

        if !keywords.insert(var_name.clone(), KeywordPattern { pattern, is_regex, case_sensitive }) {
            return Err(parse_err(lexer, file, format!("duplicate keyword variable '${var_name}'")));
        }
    }
}

fn parse_fuzzy(lexer: &mut Lexer<'_>, file: &str, fuzzy: &mut OrderedMap<FuzzyPattern>) -> PResult<()> {
    loop {
        let next = lexer.clone().next().ok_or_else(|| parse_err(lexer, file, "unexpected end of input"))?;
        if next.kind == TokenKind::RBrace || (next.kind == TokenKind::Ident && is_section_header(next.text)) {
            return Ok(());
        }
        let var_tok = expect(lexer, TokenKind::Var, file)?;
        let var_name = var_tok.text.to_string();
        expect(lexer, TokenKind::Equals, file)?;
        let pattern_tok = expect(lexer, TokenKind::Str, file)?;
        let pattern = pattern_tok.text.to_string();
        let case_sensitive = parse_case_suffix(lexer, file)?;
        expect(lexer, TokenKind::LParen, file)?;
        let threshold_tok = expect(lexer, TokenKind::Int, file)?;
        expect(lexer, TokenKind::RParen, file)?;

        let threshold: i64 = threshold_tok
            .text
            .parse()
            .map_err(|_| parse_err(lexer, file, format!("invalid fuzzy threshold '{}'", threshold_tok.text)))?;
        if !(0..=100).contains(&threshold) {
            return Err(parse_err(lexer, file, format!("fuzzy threshold {threshold} out of range 0..=100")));
        }

        if !fuzzy.insert(var_name.clone(), FuzzyPattern { pattern, case_sensitive, threshold: threshold as u8 }) {
            return Err(parse_err(lexer, file, format!("duplicate fuzzy variable '${var_name}'")));
        }
    }
}

fn parse_scored<T>(
    lexer: &mut Lexer<'_>,
    file: &str,
    map: &mut OrderedMap<T>,
    build: impl Fn(String, f64) -> T,
) -> PResult<()> {
    loop {
        let next = lexer.clone().next().ok_or_else(|| parse_err(lexer, file, "unexpected end of input"))?;
        if next.kind == TokenKind::RBrace || (next.kind == TokenKind::Ident && is_section_header(next.text)) {
            return Ok(());
        }
        let var_tok = expect(lexer, TokenKind::Var, file)?;
        let var_name = var_tok.text.to_string();
        expect(lexer, TokenKind::Equals, file)?;
        let pattern_tok = expect(lexer, TokenKind::Str, file)?;
        let pattern = pattern_tok.text.to_string();
        expect(lexer, TokenKind::LParen, file)?;
        let threshold_tok = lexer.next().ok_or_else(|| parse_err(lexer, file, "unexpected end of input"))?;
        if !matches!(threshold_tok.kind, TokenKind::Float | TokenKind::Int) {
            return Err(parse_err(lexer, file, format!("expected float threshold, found {}", threshold_tok.kind)));
        }
        expect(lexer, TokenKind::RParen, file)?;

        let threshold: f64 = threshold_tok
            .text
            .parse()
            .map_err(|_| parse_err(lexer, file, format!("invalid threshold '{}'", threshold_tok.text)))?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(parse_err(lexer, file, format!("threshold {threshold} out of range 0.0..=1.0")));
        }

        if !map.insert(var_name.clone(), build(pattern, threshold)) {
            return Err(parse_err(lexer, file, format!("duplicate variable '${var_name}'")));
        }
    }
}

/// Rejects conditions that reference a variable no section actually
/// defines — the strict, parse-time half of the "unresolved reference"
/// invariant (§3.2); the Matcher additionally treats unresolved bare
/// references permissively at evaluation time for rules built without
/// going through this parser.
fn validate_condition_refs(condition: &Condition, rule: &Rule) -> Result<(), String> {
    match condition {
        Condition::Empty => Ok(()),
        Condition::And(a, b) | Condition::Or(a, b) => {
            validate_condition_refs(a, rule)?;
            validate_condition_refs(b, rule)
        }
        Condition::Not(a) => validate_condition_refs(a, rule),
        Condition::SectionWildcard(_) => Ok(()),
        Condition::PrefixWildcard { .. } => Ok(()),
        Condition::Var { section: Some(section), name } => {
            let defined = match section {
                condition::Section::Keywords => rule.keywords.contains_key(name),
                condition::Section::Fuzzy => rule.fuzzy.contains_key(name),
                condition::Section::Semantics => rule.semantics.contains_key(name),
                condition::Section::Llm => rule.llms.contains_key(name),
            };
            if defined {
                Ok(())
            } else {
                Err(format!("unresolved variable reference '{section}.${name}'"))
            }
        }
        Condition::Var { section: None, name } => {
            let defined = rule.keywords.contains_key(name)
                || rule.semantics.contains_key(name)
                || rule.llms.contains_key(name)
                || rule.fuzzy.contains_key(name);
            if defined {
                Ok(())
            } else {
                Err(format!("unresolved variable reference '${name}'"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Parse round-trip determinism (§8 Universal property 1): parsing the
    /// same source twice yields structurally equal `Rule`s, including map
    /// insertion order. `pretty_assertions::assert_eq!` gives a readable
    /// field-by-field diff if that ever regresses.
    #[test]
    fn parse_round_trip_is_deterministic() {
        let src = r#"
            rule sqlmap_webshell {
                keywords:
                    $sqlmap = "sqlmap"
                semantics:
                    $inq = "seeking information on uploading malicious web shells" (0.1)
                llm:
                    $chk = "Is this asking to exploit a server?" (0.8)
                condition: $sqlmap and (any of semantics.*) and llm.$chk
            }
        "#;
        let (first, errors_a) = Parser::parse_str(src, "t.nov");
        let (second, errors_b) = Parser::parse_str(src, "t.nov");
        assert!(errors_a.is_empty() && errors_b.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn parses_simple_or_rule() {
        let src = r#"
            rule suspicious_hack {
                keywords:
                    $hack = "hack"
                    $exploit = "exploit"
                condition: any of keywords.*
            }
        "#;
        let (rules, errors) = Parser::parse_str(src, "t.nov");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.name, "suspicious_hack");
        assert_eq!(rule.keywords.len(), 2);
    }

    #[test]
    fn parses_regex_keyword_with_trailing_case() {
        let src = r#"
            rule has_email {
                keywords:
                    $email = /[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}/ case:true
                condition: $email
            }
        "#;
        let (rules, errors) = Parser::parse_str(src, "t.nov");
        assert!(errors.is_empty(), "{errors:?}");
        let pattern = rules[0].keywords.get("email").unwrap();
        assert!(pattern.is_regex);
        assert!(pattern.case_sensitive);
    }

    #[test]
    fn duplicate_variable_is_fatal() {
        let src = r#"
            rule dup {
                keywords:
                    $a = "x"
                    $a = "y"
                condition: $a
            }
        "#;
        let (_, errors) = Parser::parse_str(src, "t.nov");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn missing_condition_is_fatal() {
        let src = r#"
            rule no_condition {
                keywords:
                    $a = "x"
            }
        "#;
        let (_, errors) = Parser::parse_str(src, "t.nov");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unknown_section_is_fatal() {
        let src = r#"
            rule bad_section {
                bogus:
                    $a = "x"
                condition: $a
            }
        "#;
        let (_, errors) = Parser::parse_str(src, "t.nov");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unresolved_condition_reference_is_fatal() {
        let src = r#"
            rule unresolved {
                keywords:
                    $a = "x"
                condition: $b
            }
        "#;
        let (_, errors) = Parser::parse_str(src, "t.nov");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn batch_parsing_continues_after_an_error() {
        let src = r#"
            rule bad {
                bogus: $a = "x"
                condition: $a
            }
            rule good {
                keywords: $a = "x"
                condition: $a
            }
        "#;
        let (rules, errors) = Parser::parse_str(src, "t.nov");
        assert_eq!(errors.len(), 1);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "good");
    }

    #[test]
    fn fuzzy_threshold_out_of_range_is_fatal() {
        let src = r#"
            rule bad_threshold {
                fuzzy:
                    $a = "x" (150)
                condition: $a
            }
        "#;
        let (_, errors) = Parser::parse_str(src, "t.nov");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn comments_are_stripped() {
        let src = r#"
            // a full rule
            rule commented {
                keywords: // inline
                    $a = "x" /* trailing */
                condition: $a
            }
        "#;
        let (rules, errors) = Parser::parse_str(src, "t.nov");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(rules.len(), 1);
    }
}
