//! Crate-level integration test for Testable property 6 (§8): if exactly
//! one predicate raises, its entry in `all_*_matches` is `false` and every
//! other predicate's result is unaffected.

use nova_core::evaluators::KeywordEvaluator;
use nova_core::matcher::{EvaluatorOverrides, Matcher};
use nova_core::model::KeywordPattern;
use nova_core::parser::Parser;
use nova_core::EvaluatorFailure;

/// Delegates to a literal substring match for every variable except
/// `$boom`, which always errors — simulating a single predicate raising
/// mid-evaluation (e.g. a regex compile failure discovered late).
struct ErrorsOnBoom;

impl KeywordEvaluator for ErrorsOnBoom {
    fn evaluate(&self, var_name: &str, pattern: &KeywordPattern, text: &str) -> Result<bool, EvaluatorFailure> {
        if var_name == "boom" {
            return Err(EvaluatorFailure::Failed {
                section: "keywords",
                name: var_name.to_string(),
                message: "deliberate failure for test coverage".to_string(),
            });
        }
        Ok(text.to_lowercase().contains(&pattern.pattern.to_lowercase()))
    }
}

#[test]
fn one_failing_predicate_does_not_affect_the_others() {
    let src = r#"
        rule mixed_outcomes {
            keywords:
                $hack = "hack"
                $boom = "irrelevant"
                $exploit = "exploit"
            condition: any of keywords.*
        }
    "#;
    let (mut rules, errors) = Parser::parse_str(src, "t.nov");
    assert!(errors.is_empty(), "{errors:?}");
    let rule = rules.remove(0);

    let overrides = EvaluatorOverrides { keyword: Some(Box::new(ErrorsOnBoom)), ..Default::default() };
    let matcher = Matcher::new(rule, overrides, true);
    let verdict = matcher.check("let's hack and exploit, but don't boom");

    assert_eq!(verdict.debug.all_keyword_matches.get("boom"), Some(&false));
    assert_eq!(verdict.debug.all_keyword_matches.get("hack"), Some(&true));
    assert_eq!(verdict.debug.all_keyword_matches.get("exploit"), Some(&true));
    assert!(verdict.matched);
}

#[test]
fn failing_predicate_alone_yields_no_match() {
    let src = r#"
        rule only_boom {
            keywords:
                $boom = "anything"
            condition: $boom
        }
    "#;
    let (mut rules, errors) = Parser::parse_str(src, "t.nov");
    assert!(errors.is_empty(), "{errors:?}");
    let rule = rules.remove(0);

    let overrides = EvaluatorOverrides { keyword: Some(Box::new(ErrorsOnBoom)), ..Default::default() };
    let matcher = Matcher::new(rule, overrides, true);
    let verdict = matcher.check("anything at all");

    assert!(!verdict.matched);
    assert_eq!(verdict.debug.all_keyword_matches.get("boom"), Some(&false));
}
