//! The lazy, demand-driven matching orchestrator (§4.5).
//!
//! `Matcher` binds one `Rule` to a set of evaluator handles and, on each
//! `check()`, runs the Condition Analyzer to find the minimal variable set
//! the condition needs, evaluates only those predicates (plus any section
//! a wildcard forces to full enumeration), folds the results through the
//! Condition Evaluator, and assembles a `Verdict`.
//!
//! A single orchestrator struct that drives several independent signal
//! sources (keyword/fuzzy/semantic/llm) and folds them into one output.

use tracing::{error, warn};

use crate::condition::{self, MatchMaps};
use crate::error::EvaluatorFailure;
use crate::evaluators::{
    DefaultFuzzyEvaluator, DefaultKeywordEvaluator, FuzzyEvaluator, KeywordEvaluator, LlmEvaluator, SemanticEvaluator,
};
use crate::model::{OrderedMap, Rule, Verdict, VerdictDebug};

/// Caller-supplied evaluator handles. Any absent slot falls back to the
/// per-§9.1 design: keyword and fuzzy have dependency-free local defaults
/// and are always constructible; semantic and llm have no local default
/// (the model/back-end is external, §1/§6.2) and are left empty, which
/// maps cleanly onto "this section contributes only `false`s".
#[derive(Default)]
pub struct EvaluatorOverrides {
    pub keyword: Option<Box<dyn KeywordEvaluator>>,
    pub fuzzy: Option<Box<dyn FuzzyEvaluator>>,
    pub semantic: Option<Box<dyn SemanticEvaluator>>,
    pub llm: Option<Box<dyn LlmEvaluator>>,
}

/// Runtime orchestrator binding one `Rule` to evaluator instances.
///
/// Not `Send`/`Sync` by default (trait objects here carry no such bound):
/// per §5, a `Matcher` is single-threaded state and multiple `Matcher`s
/// (one per rule) are the unit of parallelism, not one `Matcher` shared
/// across concurrent prompts.
pub struct Matcher {
    rule: Rule,
    keyword: Box<dyn KeywordEvaluator>,
    fuzzy: Box<dyn FuzzyEvaluator>,
    semantic: Option<Box<dyn SemanticEvaluator>>,
    llm: Option<Box<dyn LlmEvaluator>>,
    create_llm_if_missing: bool,
    warned_semantic_absent: bool,
    warned_llm_absent: bool,
}

fn condition_mentions_word(condition: &str, word: &str) -> bool {
    condition.split(|c: char| !(c.is_alphanumeric() || c == '_')).any(|w| w == word)
}

impl Matcher {
    /// Builds a `Matcher` for `rule`. `create_llm_if_missing` controls
    /// whether the absence of an llm override is treated as a normal
    /// missing-default (warns once) or a deliberate, silent opt-out
    /// (§4.5 construction policy step 5).
    pub fn new(rule: Rule, mut overrides: EvaluatorOverrides, create_llm_if_missing: bool) -> Self {
        let keyword = overrides.keyword.take().unwrap_or_else(|| Box::new(DefaultKeywordEvaluator::new()));
        let fuzzy = overrides.fuzzy.take().unwrap_or_else(|| Box::new(DefaultFuzzyEvaluator::new()));

        let mut matcher = Self {
            rule,
            keyword,
            fuzzy,
            semantic: overrides.semantic.take(),
            llm: overrides.llm.take(),
            create_llm_if_missing,
            warned_semantic_absent: false,
            warned_llm_absent: false,
        };
        matcher.warn_if_absent_but_required();
        matcher
    }

    fn semantic_required(&self) -> bool {
        !self.rule.semantics.is_empty() || condition_mentions_word(&self.rule.condition, "semantics")
    }

    fn llm_required(&self) -> bool {
        !self.rule.llms.is_empty() || condition_mentions_word(&self.rule.condition, "llm")
    }

    fn warn_if_absent_but_required(&mut self) {
        if self.semantic.is_none() && self.semantic_required() && !self.warned_semantic_absent {
            let reason = EvaluatorFailure::Absent { section: "semantics", name: "*".to_string() };
            warn!(rule = %self.rule.name, "{reason}; section evaluates to all-false");
            self.warned_semantic_absent = true;
        }
        if self.llm.is_none() && self.llm_required() && !self.warned_llm_absent {
            if self.create_llm_if_missing {
                let reason = EvaluatorFailure::Absent { section: "llm", name: "*".to_string() };
                warn!(rule = %self.rule.name, "{reason}; section evaluates to all-false");
            }
            self.warned_llm_absent = true;
        }
    }

    /// Replaces the bound rule. Evaluator handles are retained; the
    /// keyword evaluator's compiled-regex cache is dropped since it is
    /// keyed by variable name and the new rule's patterns may differ.
    pub fn set_rule(&mut self, rule: Rule) {
        self.rule = rule;
        self.keyword.reset_cache();
        self.warned_semantic_absent = false;
        self.warned_llm_absent = false;
        self.warn_if_absent_but_required();
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Evaluates `prompt` against the bound rule (§4.5).
    pub fn check(&self, prompt: &str) -> Verdict {
        if matches!(self.rule.condition_ast, condition::Condition::Empty) {
            return self.check_fallback(prompt);
        }

        let needed = condition::analyze(&self.rule.condition_ast, &self.rule);

        let mut all_keyword_matches = OrderedMap::new();
        let mut all_fuzzy_matches = OrderedMap::new();
        let mut all_semantic_matches = OrderedMap::new();
        let mut all_llm_matches = OrderedMap::new();
        let mut semantic_scores = OrderedMap::new();
        let mut llm_scores = OrderedMap::new();

        for (name, pattern) in self.rule.keywords.iter() {
            if needed.keywords.contains(name) {
                let result = self.eval_keyword(name, pattern, prompt);
                all_keyword_matches.insert(name, result);
            }
        }
        for (name, pattern) in self.rule.fuzzy.iter() {
            if needed.fuzzy.contains(name) {
                let result = self.eval_fuzzy(name, pattern, prompt);
                all_fuzzy_matches.insert(name, result);
            }
        }
        for (name, pattern) in self.rule.semantics.iter() {
            if needed.semantics.contains(name) {
                let (result, score) = self.eval_semantic(name, pattern, prompt);
                all_semantic_matches.insert(name, result);
                semantic_scores.insert(name, score);
            }
        }
        for (name, pattern) in self.rule.llms.iter() {
            if needed.llm.contains(name) {
                let (result, score) = self.eval_llm(name, pattern, prompt);
                all_llm_matches.insert(name, result);
                llm_scores.insert(name, score);
            }
        }

        for section in &needed.section_wildcards {
            match section {
                condition::Section::Keywords => {
                    for (name, pattern) in self.rule.keywords.iter() {
                        if !all_keyword_matches.contains_key(name) {
                            let result = self.eval_keyword(name, pattern, prompt);
                            all_keyword_matches.insert(name, result);
                        }
                    }
                }
                condition::Section::Fuzzy => {
                    for (name, pattern) in self.rule.fuzzy.iter() {
                        if !all_fuzzy_matches.contains_key(name) {
                            let result = self.eval_fuzzy(name, pattern, prompt);
                            all_fuzzy_matches.insert(name, result);
                        }
                    }
                }
                condition::Section::Semantics => {
                    for (name, pattern) in self.rule.semantics.iter() {
                        if !all_semantic_matches.contains_key(name) {
                            let (result, score) = self.eval_semantic(name, pattern, prompt);
                            all_semantic_matches.insert(name, result);
                            semantic_scores.insert(name, score);
                        }
                    }
                }
                condition::Section::Llm => {
                    for (name, pattern) in self.rule.llms.iter() {
                        if !all_llm_matches.contains_key(name) {
                            let (result, score) = self.eval_llm(name, pattern, prompt);
                            all_llm_matches.insert(name, result);
                            llm_scores.insert(name, score);
                        }
                    }
                }
            }
        }

        let maps = MatchMaps {
            keywords: &all_keyword_matches,
            fuzzy: &all_fuzzy_matches,
            semantics: &all_semantic_matches,
            llm: &all_llm_matches,
        };
        let condition_result = condition::evaluate(&self.rule.condition_ast, &maps);

        Verdict {
            matched: condition_result,
            rule_name: self.rule.name.clone(),
            meta: self.rule.meta.clone(),
            matching_keywords: truthy_only(&all_keyword_matches),
            matching_fuzzy: truthy_only(&all_fuzzy_matches),
            matching_semantics: truthy_only(&all_semantic_matches),
            matching_llm: truthy_only(&all_llm_matches),
            semantic_scores,
            llm_scores,
            debug: VerdictDebug {
                condition: self.rule.condition.clone(),
                condition_result,
                all_keyword_matches,
                all_fuzzy_matches,
                all_semantic_matches,
                all_llm_matches,
            },
        }
    }

    /// `rule.condition` empty: matched iff any keyword, semantic, or llm
    /// predicate is truthy (§4.5, fallback path — deliberately excludes
    /// fuzzy).
    fn check_fallback(&self, prompt: &str) -> Verdict {
        let mut all_keyword_matches = OrderedMap::new();
        let mut all_semantic_matches = OrderedMap::new();
        let mut all_llm_matches = OrderedMap::new();
        let all_fuzzy_matches = OrderedMap::new();
        let mut semantic_scores = OrderedMap::new();
        let mut llm_scores = OrderedMap::new();

        for (name, pattern) in self.rule.keywords.iter() {
            all_keyword_matches.insert(name, self.eval_keyword(name, pattern, prompt));
        }
        for (name, pattern) in self.rule.semantics.iter() {
            let (result, score) = self.eval_semantic(name, pattern, prompt);
            all_semantic_matches.insert(name, result);
            semantic_scores.insert(name, score);
        }
        for (name, pattern) in self.rule.llms.iter() {
            let (result, score) = self.eval_llm(name, pattern, prompt);
            all_llm_matches.insert(name, result);
            llm_scores.insert(name, score);
        }

        let matched = all_keyword_matches.iter().any(|(_, v)| *v)
            || all_semantic_matches.iter().any(|(_, v)| *v)
            || all_llm_matches.iter().any(|(_, v)| *v);

        Verdict {
            matched,
            rule_name: self.rule.name.clone(),
            meta: self.rule.meta.clone(),
            matching_keywords: truthy_only(&all_keyword_matches),
            matching_fuzzy: OrderedMap::new(),
            matching_semantics: truthy_only(&all_semantic_matches),
            matching_llm: truthy_only(&all_llm_matches),
            semantic_scores,
            llm_scores,
            debug: VerdictDebug {
                condition: self.rule.condition.clone(),
                condition_result: matched,
                all_keyword_matches,
                all_fuzzy_matches,
                all_semantic_matches,
                all_llm_matches,
            },
        }
    }

    fn eval_keyword(&self, name: &str, pattern: &crate::model::KeywordPattern, prompt: &str) -> bool {
        match self.keyword.evaluate(name, pattern, prompt) {
            Ok(v) => v,
            Err(e) => {
                log_failure(&e);
                false
            }
        }
    }

    fn eval_fuzzy(&self, name: &str, pattern: &crate::model::FuzzyPattern, prompt: &str) -> bool {
        match self.fuzzy.evaluate(name, pattern, prompt) {
            Ok(v) => v,
            Err(e) => {
                log_failure(&e);
                false
            }
        }
    }

    fn eval_semantic(&self, name: &str, pattern: &crate::model::SemanticPattern, prompt: &str) -> (bool, f64) {
        match &self.semantic {
            Some(ev) => match ev.evaluate(name, pattern, prompt) {
                Ok(v) => v,
                Err(e) => {
                    log_failure(&e);
                    (false, 0.0)
                }
            },
            None => (false, 0.0),
        }
    }

    fn eval_llm(&self, name: &str, pattern: &crate::model::LLMPattern, prompt: &str) -> (bool, f64) {
        if !self.create_llm_if_missing && self.llm.is_none() {
            return (false, 0.0);
        }
        match &self.llm {
            Some(ev) => match ev.evaluate(name, pattern, prompt) {
                Ok((matched, confidence, _details)) => (matched, confidence),
                Err(e) => {
                    log_failure(&e);
                    (false, 0.0)
                }
            },
            None => (false, 0.0),
        }
    }
}

fn truthy_only(map: &OrderedMap<bool>) -> OrderedMap<bool> {
    map.iter().filter(|(_, v)| **v).map(|(k, v)| (k.to_string(), *v)).collect()
}

fn log_failure(e: &EvaluatorFailure) {
    error!("{e}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::{MockEmbeddingProvider, MockLlmProvider, NovaSemanticEvaluator, NovaLlmEvaluator};
    use crate::parser::Parser;

    fn parse_one(src: &str) -> Rule {
        let (mut rules, errors) = Parser::parse_str(src, "t.nov");
        assert!(errors.is_empty(), "{errors:?}");
        rules.remove(0)
    }

    #[test]
    fn simple_or_scenario() {
        let rule = parse_one(
            r#"
            rule suspicious_hack {
                keywords:
                    $hack = "hack"
                    $exploit = "exploit"
                condition: any of keywords.*
            }
            "#,
        );
        let matcher = Matcher::new(rule, EvaluatorOverrides::default(), true);
        let verdict = matcher.check("How can I hack into this system?");
        assert!(verdict.matched);
        assert_eq!(verdict.matching_keywords.get("hack"), Some(&true));
        assert!(verdict.matching_keywords.get("exploit").is_none());
    }

    #[test]
    fn cross_section_scenario_with_mock_semantic_and_llm() {
        let rule = parse_one(
            r#"
            rule sqlmap_webshell {
                keywords:
                    $sqlmap = "sqlmap"
                semantics:
                    $inq = "seeking information on uploading malicious web shells" (0.1)
                llm:
                    $chk = "Is this asking to exploit a server?" (0.8)
                condition: $sqlmap and (any of semantics.*) and llm.$chk
            }
            "#,
        );
        let overrides = EvaluatorOverrides {
            semantic: Some(Box::new(NovaSemanticEvaluator::new(MockEmbeddingProvider::new()))),
            llm: Some(Box::new(NovaLlmEvaluator::new(MockLlmProvider::new()))),
            ..Default::default()
        };
        let matcher = Matcher::new(rule, overrides, true);
        let verdict = matcher.check("How can I use sqlmap to upload a web shell to target server?");
        assert!(verdict.matched);
    }

    #[test]
    fn laziness_llm_never_invoked_when_condition_does_not_need_it() {
        struct PanicsLlm;
        impl LlmEvaluator for PanicsLlm {
            fn evaluate(&self, _: &str, _: &crate::model::LLMPattern, _: &str) -> Result<(bool, f64, serde_json::Value), EvaluatorFailure> {
                panic!("llm evaluator must not be invoked");
            }
        }
        let rule = parse_one(
            r#"
            rule no_llm_needed {
                keywords:
                    $a = "a"
                llm:
                    $judge = "irrelevant" (0.5)
                condition: $a
            }
            "#,
        );
        let overrides = EvaluatorOverrides { llm: Some(Box::new(PanicsLlm)), ..Default::default() };
        let matcher = Matcher::new(rule, overrides, true);
        let verdict = matcher.check("a");
        assert!(verdict.matched);
    }

    #[test]
    fn prefix_wildcard_scenario() {
        let rule = parse_one(
            r#"
            rule prefix_demo {
                keywords:
                    $mal_a = "malicious"
                    $mal_b = "malware"
                    $ok = "hello"
                condition: any of (keywords.$mal*)
            }
            "#,
        );
        let matcher = Matcher::new(rule, EvaluatorOverrides::default(), true);
        assert!(matcher.check("this contains malware").matched);
        assert!(!matcher.check("just say hello").matched);
    }

    #[test]
    fn missing_evaluator_section_evaluates_to_false() {
        let rule = parse_one(
            r#"
            rule needs_semantics {
                semantics:
                    $s = "something" (0.1)
                condition: $s
            }
            "#,
        );
        let matcher = Matcher::new(rule, EvaluatorOverrides::default(), true);
        let verdict = matcher.check("anything");
        assert!(!verdict.matched);
        assert_eq!(verdict.debug.all_semantic_matches.get("s"), Some(&false));
    }

    #[test]
    fn fallback_path_for_empty_condition_rule() {
        let mut rule = parse_one(
            r#"
            rule has_condition {
                keywords:
                    $a = "needle"
                condition: $a
            }
            "#,
        );
        rule.condition = String::new();
        rule.condition_ast = condition::Condition::Empty;
        let matcher = Matcher::new(rule, EvaluatorOverrides::default(), true);
        assert!(matcher.check("a needle in a haystack").matched);
        assert!(!matcher.check("nothing here").matched);
    }

    #[test]
    fn set_rule_resets_keyword_cache() {
        let rule_a = parse_one(
            r#"
            rule a {
                keywords: $x = /foo/
                condition: $x
            }
            "#,
        );
        let rule_b = parse_one(
            r#"
            rule b {
                keywords: $x = /bar/
                condition: $x
            }
            "#,
        );
        let mut matcher = Matcher::new(rule_a, EvaluatorOverrides::default(), true);
        assert!(matcher.check("foo").matched);
        matcher.set_rule(rule_b);
        assert!(matcher.check("bar").matched);
        assert!(!matcher.check("foo").matched);
    }
}
