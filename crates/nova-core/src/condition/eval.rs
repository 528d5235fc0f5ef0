//! Condition Evaluator: folds a parsed `Condition` and per-section match
//! maps into a single boolean.
//!
//! Missing definitions resolve to `false` (a variable the Analyzer didn't
//! flag, or that no evaluator produced a result for, is simply absent from
//! its map); boolean connectives are ordinary left-to-right short-circuit
//! evaluation — the Analyzer has already decided what was worth computing.

use super::ast::{Condition, Section};
use crate::model::OrderedMap;

/// The per-section boolean match results a Matcher has already computed,
/// handed to the Condition Evaluator for one `check()` call.
pub struct MatchMaps<'a> {
    pub keywords: &'a OrderedMap<bool>,
    pub fuzzy: &'a OrderedMap<bool>,
    pub semantics: &'a OrderedMap<bool>,
    pub llm: &'a OrderedMap<bool>,
}

impl<'a> MatchMaps<'a> {
    fn section(&self, section: Section) -> &'a OrderedMap<bool> {
        match section {
            Section::Keywords => self.keywords,
            Section::Fuzzy => self.fuzzy,
            Section::Semantics => self.semantics,
            Section::Llm => self.llm,
        }
    }
}

const SEARCH_ORDER: [Section; 4] = [Section::Keywords, Section::Semantics, Section::Llm, Section::Fuzzy];

/// Evaluates a condition against the supplied match maps.
pub fn evaluate(condition: &Condition, maps: &MatchMaps<'_>) -> bool {
    match condition {
        Condition::Empty => false,
        Condition::And(a, b) => evaluate(a, maps) && evaluate(b, maps),
        Condition::Or(a, b) => evaluate(a, maps) || evaluate(b, maps),
        Condition::Not(a) => !evaluate(a, maps),
        Condition::Var { section: Some(section), name } => {
            maps.section(*section).get(name).copied().unwrap_or(false)
        }
        Condition::Var { section: None, name } => SEARCH_ORDER
            .iter()
            .find_map(|s| maps.section(*s).get(name).copied())
            .unwrap_or(false),
        Condition::SectionWildcard(section) => maps.section(*section).iter().any(|(_, v)| *v),
        Condition::PrefixWildcard { section: Some(section), prefix } => {
            maps.section(*section).with_prefix(prefix).any(|(_, v)| *v)
        }
        Condition::PrefixWildcard { section: None, prefix } => {
            Section::ALL.iter().any(|s| maps.section(*s).with_prefix(prefix).any(|(_, v)| *v))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps<'a>(
        keywords: &'a OrderedMap<bool>,
        fuzzy: &'a OrderedMap<bool>,
        semantics: &'a OrderedMap<bool>,
        llm: &'a OrderedMap<bool>,
    ) -> MatchMaps<'a> {
        MatchMaps { keywords, fuzzy, semantics, llm }
    }

    fn one(name: &str, v: bool) -> OrderedMap<bool> {
        let mut m = OrderedMap::new();
        m.insert(name, v);
        m
    }

    #[test]
    fn missing_definition_is_false() {
        let empty = OrderedMap::new();
        let m = maps(&empty, &empty, &empty, &empty);
        let cond = Condition::Var { section: Some(Section::Keywords), name: "x".into() };
        assert!(!evaluate(&cond, &m));
    }

    #[test]
    fn double_negation_is_identity() {
        let k = one("a", true);
        let empty = OrderedMap::new();
        let m = maps(&k, &empty, &empty, &empty);
        let a = Condition::Var { section: Some(Section::Keywords), name: "a".into() };
        let not_not_a = Condition::Not(Box::new(Condition::Not(Box::new(a.clone()))));
        assert_eq!(evaluate(&a, &m), evaluate(&not_not_a, &m));
    }

    #[test]
    fn and_is_commutative_over_match_maps() {
        let k = {
            let mut m = OrderedMap::new();
            m.insert("a", true);
            m.insert("b", false);
            m
        };
        let empty = OrderedMap::new();
        let m = maps(&k, &empty, &empty, &empty);
        let a = Condition::Var { section: Some(Section::Keywords), name: "a".into() };
        let b = Condition::Var { section: Some(Section::Keywords), name: "b".into() };
        let ab = Condition::And(Box::new(a.clone()), Box::new(b.clone()));
        let ba = Condition::And(Box::new(b), Box::new(a));
        assert_eq!(evaluate(&ab, &m), evaluate(&ba, &m));
    }

    #[test]
    fn de_morgan_holds() {
        let k = {
            let mut m = OrderedMap::new();
            m.insert("a", true);
            m.insert("b", false);
            m
        };
        let empty = OrderedMap::new();
        let m = maps(&k, &empty, &empty, &empty);
        let a = Condition::Var { section: Some(Section::Keywords), name: "a".into() };
        let b = Condition::Var { section: Some(Section::Keywords), name: "b".into() };
        let not_and = Condition::Not(Box::new(Condition::And(Box::new(a.clone()), Box::new(b.clone()))));
        let or_not = Condition::Or(
            Box::new(Condition::Not(Box::new(a))),
            Box::new(Condition::Not(Box::new(b))),
        );
        assert_eq!(evaluate(&not_and, &m), evaluate(&or_not, &m));
    }

    #[test]
    fn wildcard_closure_true_iff_any_member_true() {
        let k = {
            let mut m = OrderedMap::new();
            m.insert("a", false);
            m.insert("b", false);
            m
        };
        let empty = OrderedMap::new();
        let m = maps(&k, &empty, &empty, &empty);
        assert!(!evaluate(&Condition::SectionWildcard(Section::Keywords), &m));

        let k2 = {
            let mut m = OrderedMap::new();
            m.insert("a", false);
            m.insert("b", true);
            m
        };
        let m2 = maps(&k2, &empty, &empty, &empty);
        assert!(evaluate(&Condition::SectionWildcard(Section::Keywords), &m2));
    }

    #[test]
    fn cross_section_search_order_prefers_keywords_over_fuzzy() {
        let keywords = one("dup", false);
        let fuzzy = one("dup", true);
        let empty = OrderedMap::new();
        let m = maps(&keywords, &fuzzy, &empty, &empty);
        let cond = Condition::Var { section: None, name: "dup".into() };
        assert!(!evaluate(&cond, &m));
    }
}
