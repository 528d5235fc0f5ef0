//! Error types.

use thiserror::Error;

/// Top-level error type for parsing and condition construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NovaError {
    /// Malformed rule source. Fatal to the rule it occurs in; batch parsing
    /// continues with the remaining rules/files.
    #[error("parse error in {file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// Malformed or unevaluable condition expression. Fatal to the rule.
    #[error("condition error: {0}")]
    Condition(String),
}

/// A single predicate failure. Non-fatal: the Matcher records this, logs it,
/// and the predicate's entry becomes `false` (and `0.0` for scored
/// evaluators) rather than aborting `check()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluatorFailure {
    /// A section is required by the condition but no back-end was supplied
    /// for it. Surfaced once per `Matcher` construction.
    #[error("{section} evaluator not installed (${name})")]
    Absent { section: &'static str, name: String },

    /// A predicate raised while evaluating.
    #[error("{section}.${name} failed: {message}")]
    Failed {
        section: &'static str,
        name: String,
        message: String,
    },

    /// Specialisation of `Failed` for provider authentication failures, so a
    /// caller can tell "did not match" apart from "could not ask".
    #[error("{section}.${name} auth failed: {message}")]
    AuthFailed {
        section: &'static str,
        name: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, NovaError>;
