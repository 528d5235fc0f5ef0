//! Condition Analyzer: computes the minimal variable set a condition
//! actually needs, so expensive evaluators are never invoked for
//! irrelevant patterns.
//!
//! Implemented as a traversal of the already-parsed `Condition` AST (not a
//! second text scan), so the Analyzer and the parser can never disagree
//! about what the condition contains.

use std::collections::HashSet;

use super::ast::{Condition, Section};
use crate::model::Rule;

/// The minimal set of variables, and whole sections, a condition needs
/// evaluated before it can be decided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Needed {
    pub keywords: HashSet<String>,
    pub fuzzy: HashSet<String>,
    pub semantics: HashSet<String>,
    pub llm: HashSet<String>,
    pub section_wildcards: HashSet<Section>,
}

impl Needed {
    fn set_mut(&mut self, section: Section) -> &mut HashSet<String> {
        match section {
            Section::Keywords => &mut self.keywords,
            Section::Fuzzy => &mut self.fuzzy,
            Section::Semantics => &mut self.semantics,
            Section::Llm => &mut self.llm,
        }
    }

    pub fn set(&self, section: Section) -> &HashSet<String> {
        match section {
            Section::Keywords => &self.keywords,
            Section::Fuzzy => &self.fuzzy,
            Section::Semantics => &self.semantics,
            Section::Llm => &self.llm,
        }
    }
}

/// The cross-section bare-name and cross-section prefix search order:
/// keywords, then semantics, then llm, then fuzzy. The fuzzy-inclusive
/// Matcher is authoritative (design note), and fuzzy — the most expensive
/// pure-CPU evaluator — is checked last.
const SEARCH_ORDER: [Section; 4] = [Section::Keywords, Section::Semantics, Section::Llm, Section::Fuzzy];

fn section_map<'a>(rule: &'a Rule, section: Section) -> Box<dyn Iterator<Item = &'a str> + 'a> {
    match section {
        Section::Keywords => Box::new(rule.keywords.keys()),
        Section::Fuzzy => Box::new(rule.fuzzy.keys()),
        Section::Semantics => Box::new(rule.semantics.keys()),
        Section::Llm => Box::new(rule.llms.keys()),
    }
}

fn section_defines(rule: &Rule, section: Section, name: &str) -> bool {
    section_map(rule, section).any(|k| k == name)
}

pub fn analyze(condition: &Condition, rule: &Rule) -> Needed {
    let mut needed = Needed::default();
    walk(condition, rule, &mut needed);
    needed
}

fn walk(condition: &Condition, rule: &Rule, needed: &mut Needed) {
    match condition {
        Condition::Empty => {}
        Condition::And(a, b) | Condition::Or(a, b) => {
            walk(a, rule, needed);
            walk(b, rule, needed);
        }
        Condition::Not(a) => walk(a, rule, needed),
        Condition::SectionWildcard(section) => {
            needed.section_wildcards.insert(*section);
        }
        Condition::Var { section: Some(section), name } => {
            needed.set_mut(*section).insert(name.clone());
        }
        Condition::Var { section: None, name } => {
            if let Some(section) = SEARCH_ORDER.iter().find(|s| section_defines(rule, **s, name)) {
                needed.set_mut(*section).insert(name.clone());
            }
        }
        Condition::PrefixWildcard { section: Some(section), prefix } => {
            for name in section_map(rule, *section).filter(|n| n.starts_with(prefix.as_str())) {
                needed.set_mut(*section).insert(name.to_string());
            }
        }
        Condition::PrefixWildcard { section: None, prefix } => {
            for section in Section::ALL {
                for name in section_map(rule, section).filter(|n| n.starts_with(prefix.as_str())) {
                    needed.set_mut(section).insert(name.to_string());
                }
            }
        }
    }
}
