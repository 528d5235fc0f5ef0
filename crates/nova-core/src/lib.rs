//! Nova core: the rule DSL parser, condition language, and lazy matcher
//! for detecting patterns in free-form prompts sent to generative AI
//! systems (§1).
//!
//! ```rust
//! use nova_core::parser::Parser;
//! use nova_core::matcher::{EvaluatorOverrides, Matcher};
//!
//! let src = r#"
//!     rule suspicious_hack {
//!         keywords:
//!             $hack = "hack"
//!             $exploit = "exploit"
//!         condition: any of keywords.*
//!     }
//! "#;
//! let (rules, errors) = Parser::parse_str(src, "demo.nov");
//! assert!(errors.is_empty());
//!
//! let matcher = Matcher::new(rules.into_iter().next().unwrap(), EvaluatorOverrides::default(), true);
//! let verdict = matcher.check("How can I hack into this system?");
//! assert!(verdict.matched);
//! ```

pub mod condition;
pub mod error;
pub mod evaluators;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod parser;
pub mod scanner;
pub mod similarity;

pub use error::{EvaluatorFailure, NovaError, Result};
pub use matcher::{EvaluatorOverrides, Matcher};
pub use model::{FuzzyPattern, KeywordPattern, LLMPattern, OrderedMap, Rule, SemanticPattern, Verdict, VerdictDebug};
pub use parser::Parser;
pub use scanner::{InputMode, ScanOutcome, Scanner};
