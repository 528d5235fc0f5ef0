//! Default fuzzy evaluator: partial (needle-in-haystack) similarity.
//!
//! Targets the same notion of "partial ratio" that `rapidfuzz.fuzz.partial_ratio`
//! implements: the best Levenshtein similarity between the shorter string
//! and any equal-length window of the longer one. `strsim` has no
//! partial-ratio primitive, so this slides `strsim::normalized_levenshtein`
//! across windows of the longer string and keeps the best score.

use super::FuzzyEvaluator;
use crate::error::EvaluatorFailure;
use crate::model::FuzzyPattern;

/// Best-window partial similarity between `needle` and `haystack`, as an
/// integer percentage `0..=100`.
fn partial_ratio(needle: &str, haystack: &str) -> u8 {
    let needle_chars: Vec<char> = needle.chars().collect();
    let haystack_chars: Vec<char> = haystack.chars().collect();

    let (short, long) = if needle_chars.len() <= haystack_chars.len() {
        (&needle_chars, &haystack_chars)
    } else {
        (&haystack_chars, &needle_chars)
    };

    if short.is_empty() {
        return 0;
    }
    if long.len() == short.len() {
        let a: String = short.iter().collect();
        let b: String = long.iter().collect();
        return (strsim::normalized_levenshtein(&a, &b) * 100.0).round() as u8;
    }

    let short_str: String = short.iter().collect();
    let window_len = short.len();
    let mut best = 0.0f64;
    for start in 0..=(long.len() - window_len) {
        let window: String = long[start..start + window_len].iter().collect();
        let score = strsim::normalized_levenshtein(&short_str, &window);
        if score > best {
            best = score;
        }
    }
    (best * 100.0).round() as u8
}

#[derive(Debug, Default)]
pub struct DefaultFuzzyEvaluator;

impl DefaultFuzzyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl FuzzyEvaluator for DefaultFuzzyEvaluator {
    fn evaluate(&self, _var_name: &str, pattern: &FuzzyPattern, text: &str) -> Result<bool, EvaluatorFailure> {
        if pattern.pattern.is_empty() || text.is_empty() {
            return Ok(false);
        }

        let (needle, haystack) = if pattern.case_sensitive {
            (pattern.pattern.clone(), text.to_string())
        } else {
            (pattern.pattern.to_lowercase(), text.to_lowercase())
        };

        let score = partial_ratio(&needle, &haystack);
        Ok(score >= pattern.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuzzy(pattern: &str, threshold: u8, case_sensitive: bool) -> FuzzyPattern {
        FuzzyPattern { pattern: pattern.into(), case_sensitive, threshold }
    }

    #[test]
    fn exact_substring_scores_at_or_near_100() {
        let ev = DefaultFuzzyEvaluator::new();
        let p = fuzzy("admin", 90, false);
        assert!(ev.evaluate("x", &p, "I am administrator").unwrap());
    }

    #[test]
    fn below_threshold_does_not_match() {
        let ev = DefaultFuzzyEvaluator::new();
        let p = fuzzy("xyzxyz", 80, false);
        assert!(!ev.evaluate("x", &p, "completely unrelated text").unwrap());
    }

    #[test]
    fn respects_case_sensitivity() {
        let ev = DefaultFuzzyEvaluator::new();
        let sensitive = fuzzy("ADMIN", 100, true);
        assert!(!ev.evaluate("x", &sensitive, "i am admin here").unwrap());
        let insensitive = fuzzy("ADMIN", 90, false);
        assert!(ev.evaluate("x", &insensitive, "i am admin here").unwrap());
    }

    #[test]
    fn empty_pattern_or_text_never_matches() {
        let ev = DefaultFuzzyEvaluator::new();
        let p = fuzzy("", 0, false);
        assert!(!ev.evaluate("x", &p, "anything").unwrap());
        let p2 = fuzzy("anything", 0, false);
        assert!(!ev.evaluate("x", &p2, "").unwrap());
    }
}
