//! Default keyword evaluator: literal substring match or regex search.
//!
//! Regex patterns are compiled lazily on first use and cached by variable
//! name in a `RefCell<HashMap<..>>` rather than a fixed set of `'static`
//! literals, since a rule's keyword patterns aren't known until parse time.

use std::cell::RefCell;
use std::collections::HashMap;

use regex::RegexBuilder;

use super::KeywordEvaluator;
use crate::error::EvaluatorFailure;
use crate::model::KeywordPattern;

#[derive(Default)]
pub struct DefaultKeywordEvaluator {
    compiled: RefCell<HashMap<String, regex::Regex>>,
}

impl DefaultKeywordEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled_for<'a>(
        &'a self,
        var_name: &str,
        pattern: &KeywordPattern,
    ) -> Result<std::cell::Ref<'a, regex::Regex>, EvaluatorFailure> {
        if !self.compiled.borrow().contains_key(var_name) {
            let regex = RegexBuilder::new(&pattern.pattern)
                .case_insensitive(!pattern.case_sensitive)
                .build()
                .map_err(|e| EvaluatorFailure::Failed {
                    section: "keywords",
                    name: var_name.to_string(),
                    message: format!("invalid regex: {e}"),
                })?;
            self.compiled.borrow_mut().insert(var_name.to_string(), regex);
        }
        Ok(std::cell::Ref::map(self.compiled.borrow(), |m| &m[var_name]))
    }
}

impl KeywordEvaluator for DefaultKeywordEvaluator {
    fn evaluate(&self, var_name: &str, pattern: &KeywordPattern, text: &str) -> Result<bool, EvaluatorFailure> {
        if pattern.is_regex {
            let re = self.compiled_for(var_name, pattern)?;
            return Ok(re.is_match(text));
        }

        if pattern.case_sensitive {
            Ok(text.contains(&pattern.pattern))
        } else {
            Ok(text.to_lowercase().contains(&pattern.pattern.to_lowercase()))
        }
    }

    fn reset_cache(&self) {
        self.compiled.borrow_mut().clear();
    }
}
