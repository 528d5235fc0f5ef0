//! Semantic (embedding-similarity) evaluator.
//!
//! The embedding model itself is an external collaborator pinned only by
//! its input/output contract (§6.2): "accepts a text, returns a float
//! vector of fixed dimension". `NovaSemanticEvaluator` is the thin wrapper
//! that calls it twice (pattern, prompt) and folds the result through
//! `crate::similarity::cosine_similarity`.

use super::SemanticEvaluator;
use crate::error::EvaluatorFailure;
use crate::model::SemanticPattern;
use crate::similarity::cosine_similarity;

/// An embedding back-end: text in, fixed-dimension float vector out.
/// Implementations may batch internally; the evaluator only ever asks for
/// one text at a time.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EvaluatorFailure>;
}

pub struct NovaSemanticEvaluator<P: EmbeddingProvider> {
    provider: P,
}

impl<P: EmbeddingProvider> NovaSemanticEvaluator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: EmbeddingProvider> SemanticEvaluator for NovaSemanticEvaluator<P> {
    fn evaluate(&self, var_name: &str, pattern: &SemanticPattern, text: &str) -> Result<(bool, f64), EvaluatorFailure> {
        let wrap = |e: EvaluatorFailure| match e {
            EvaluatorFailure::Failed { message, .. } => EvaluatorFailure::Failed {
                section: "semantics",
                name: var_name.to_string(),
                message,
            },
            other => other,
        };
        let pattern_vec = self.provider.embed(&pattern.pattern).map_err(wrap)?;
        let text_vec = self.provider.embed(text).map_err(wrap)?;
        let score = cosine_similarity(&pattern_vec, &text_vec) as f64;
        Ok((score >= pattern.threshold, score))
    }
}

/// Deterministic offline stand-in for a real embedding model: a
/// fixed-dimension bag-of-words hash embedding. Same input always
/// produces the same vector within a session (the only contract §6.2
/// requires), which is enough for tests and a `--offline` CLI mode, but
/// it is not a semantically meaningful embedding.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimension: 64 }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EvaluatorFailure> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0f32; self.dimension];
        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}
