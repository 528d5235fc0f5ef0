//! Pattern and rule data model.
//!
//! `OrderedMap` backs every named-section collection (`meta`, `keywords`,
//! `fuzzy`, `semantics`, `llms`) so that wildcard iteration and parse
//! round-trips are deterministic in declaration order, per the insertion-order
//! invariant on `Rule`.

use serde::{Deserialize, Serialize};

/// A small insertion-ordered string-keyed map.
///
/// `std::collections::HashMap` does not preserve insertion order and
/// `BTreeMap` reorders by key, neither of which satisfies the ordering
/// invariant rule sections require; a plain `Vec<(String, V)>` with linear
/// lookup is the simplest structure that does, and sections are small
/// enough (a handful to a few dozen patterns) that linear lookup is not a
/// concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Inserts `key => value`. Returns `false` without modifying the map if
    /// `key` is already present (callers use this to detect duplicate
    /// variable declarations within a section).
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Every entry whose key starts with `prefix`, in declaration order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a V)> {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A literal or regex keyword pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordPattern {
    pub pattern: String,
    pub is_regex: bool,
    pub case_sensitive: bool,
}

/// An approximate (fuzzy) string pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuzzyPattern {
    pub pattern: String,
    pub case_sensitive: bool,
    /// Minimum partial-similarity score, `0..=100`.
    pub threshold: u8,
}

/// An embedding-similarity pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticPattern {
    pub pattern: String,
    /// Minimum cosine similarity, inclusive, `[0.0, 1.0]`.
    pub threshold: f64,
}

/// An LLM-judged pattern. `pattern` is the judge prompt; `threshold` is
/// reinterpreted as sampling temperature by the LLM evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMPattern {
    pub pattern: String,
    pub threshold: f64,
}

/// A parsed rule: the pattern sections plus the condition that combines them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub name: String,
    pub meta: OrderedMap<String>,
    pub keywords: OrderedMap<KeywordPattern>,
    pub fuzzy: OrderedMap<FuzzyPattern>,
    pub semantics: OrderedMap<SemanticPattern>,
    pub llms: OrderedMap<LLMPattern>,
    pub condition: String,
    /// Parsed once at construction time; never re-scanned per evaluation.
    #[serde(skip)]
    pub(crate) condition_ast: crate::condition::Condition,
}

/// Debug detail accompanying a `Verdict`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerdictDebug {
    pub condition: String,
    pub condition_result: bool,
    pub all_keyword_matches: OrderedMap<bool>,
    pub all_fuzzy_matches: OrderedMap<bool>,
    pub all_semantic_matches: OrderedMap<bool>,
    pub all_llm_matches: OrderedMap<bool>,
}

/// The outcome of matching one rule against one prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub matched: bool,
    pub rule_name: String,
    pub meta: OrderedMap<String>,
    pub matching_keywords: OrderedMap<bool>,
    pub matching_fuzzy: OrderedMap<bool>,
    pub matching_semantics: OrderedMap<bool>,
    pub matching_llm: OrderedMap<bool>,
    pub semantic_scores: OrderedMap<f64>,
    pub llm_scores: OrderedMap<f64>,
    pub debug: VerdictDebug,
}
