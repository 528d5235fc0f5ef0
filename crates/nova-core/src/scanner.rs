//! Batch facade over `Parser` + `Matcher` (§4.6).
//!
//! A `Scanner` owns one `Matcher` per rule so evaluator construction is
//! amortised across many prompts, and yields deterministic
//! `(input_id, matching_rule_names, per_rule_verdict)` triples in
//! input order × rule file order × rule declaration order.
//!
//! §4.6 doesn't pin whether "batch" means one prompt per file or one
//! prompt per line; `InputMode` resolves that Open Question explicitly
//! rather than guessing a single fixed policy (see DESIGN.md).

use std::path::Path;

use serde::Serialize;

use crate::matcher::{EvaluatorOverrides, Matcher};
use crate::model::{OrderedMap, Rule, Verdict};

/// How `Scanner::scan_file` splits one file into prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// The whole file content is one prompt.
    WholeFile,
    /// Each line is an independent prompt, keyed `"<file>:<line>"`.
    Lines,
}

/// The result of scanning one input against every rule in a `Scanner`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub input_id: String,
    pub matching_rule_names: Vec<String>,
    /// Every rule's verdict, in rule declaration order.
    pub verdicts: OrderedMap<Verdict>,
}

pub struct Scanner {
    matchers: Vec<(String, Matcher)>,
}

impl Scanner {
    /// Builds one `Matcher` per rule, in the order `rules` is given
    /// (file order × declaration order, if `rules` came from `Parser`).
    /// `make_overrides` is called once per rule since evaluator handles
    /// are not `Clone`.
    pub fn new(rules: Vec<Rule>, mut make_overrides: impl FnMut() -> EvaluatorOverrides, create_llm_if_missing: bool) -> Self {
        let matchers = rules
            .into_iter()
            .map(|rule| {
                let name = rule.name.clone();
                (name, Matcher::new(rule, make_overrides(), create_llm_if_missing))
            })
            .collect();
        Self { matchers }
    }

    pub fn rule_count(&self) -> usize {
        self.matchers.len()
    }

    /// Scans one `(id, text)` prompt against every rule.
    pub fn scan_text(&self, input_id: impl Into<String>, text: &str) -> ScanOutcome {
        let mut matching_rule_names = Vec::new();
        let mut verdicts = OrderedMap::new();
        for (name, matcher) in &self.matchers {
            let verdict = matcher.check(text);
            if verdict.matched {
                matching_rule_names.push(name.clone());
            }
            verdicts.insert(name.clone(), verdict);
        }
        ScanOutcome { input_id: input_id.into(), matching_rule_names, verdicts }
    }

    /// Scans a caller-supplied sequence of `(id, text)` prompts, preserving
    /// the iteration order.
    pub fn scan_inputs<'a, I>(&self, inputs: I) -> Vec<ScanOutcome>
    where
        I: IntoIterator<Item = (String, &'a str)>,
    {
        inputs.into_iter().map(|(id, text)| self.scan_text(id, text)).collect()
    }

    /// Reads `path` as UTF-8 and scans it according to `mode`.
    pub fn scan_file(&self, path: impl AsRef<Path>, mode: InputMode) -> std::io::Result<Vec<ScanOutcome>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let file_name = path.as_ref().to_string_lossy().to_string();
        Ok(match mode {
            InputMode::WholeFile => vec![self.scan_text(file_name, &content)],
            InputMode::Lines => content
                .lines()
                .enumerate()
                .map(|(i, line)| self.scan_text(format!("{file_name}:{}", i + 1), line))
                .collect(),
        })
    }
}
