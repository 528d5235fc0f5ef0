//! LLM-judged evaluator.
//!
//! The LLM back-end is an external collaborator (§1, §6.2): it accepts
//! `{judge_prompt, target_text, temperature}` and must return a
//! normalised verdict. Authentication failures are a specialisation of
//! `EvaluatorFailure` (`AuthFailed`) so a caller can distinguish "the
//! prompt didn't match" from "the provider could not be asked" (§7).

use serde_json::Value;

use super::LlmEvaluator;
use crate::error::EvaluatorFailure;
use crate::model::LLMPattern;

/// A provider-normalised judge verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmVerdict {
    pub matched: bool,
    pub confidence: f64,
    pub details: Value,
}

/// An LLM judge back-end. `temperature` is `LLMPattern::threshold`
/// reinterpreted per §3.1.
pub trait LlmProvider: Send + Sync {
    fn judge(&self, judge_prompt: &str, target_text: &str, temperature: f64) -> Result<LlmVerdict, EvaluatorFailure>;
}

pub struct NovaLlmEvaluator<P: LlmProvider> {
    provider: P,
}

impl<P: LlmProvider> NovaLlmEvaluator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: LlmProvider> LlmEvaluator for NovaLlmEvaluator<P> {
    fn evaluate(&self, var_name: &str, pattern: &LLMPattern, text: &str) -> Result<(bool, f64, Value), EvaluatorFailure> {
        let verdict = self
            .provider
            .judge(&pattern.pattern, text, pattern.threshold)
            .map_err(|e| match e {
                EvaluatorFailure::Failed { message, .. } => {
                    EvaluatorFailure::Failed { section: "llm", name: var_name.to_string(), message }
                }
                EvaluatorFailure::AuthFailed { message, .. } => {
                    EvaluatorFailure::AuthFailed { section: "llm", name: var_name.to_string(), message }
                }
                other => other,
            })?;
        Ok((verdict.matched, verdict.confidence, verdict.details))
    }
}

/// Deterministic offline stand-in: judges a prompt "matched" when the
/// target text shares any non-trivial word with the judge prompt.
/// Confidence mirrors `temperature` so the mock's output shape matches a
/// real provider's without requiring network access. Intended for tests
/// and the CLI's `--offline` mode, not as a real safety judgment.
pub struct MockLlmProvider;

impl MockLlmProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

const STOPWORDS: &[&str] = &["the", "a", "an", "is", "to", "of", "and", "or", "in", "on", "for"];

impl LlmProvider for MockLlmProvider {
    fn judge(&self, judge_prompt: &str, target_text: &str, temperature: f64) -> Result<LlmVerdict, EvaluatorFailure> {
        let target_lower = target_text.to_lowercase();
        let matched = judge_prompt
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 3 && !STOPWORDS.contains(w))
            .any(|w| target_lower.contains(w));

        Ok(LlmVerdict {
            matched,
            confidence: temperature,
            details: serde_json::json!({ "provider": "mock", "judge_prompt": judge_prompt }),
        })
    }
}
