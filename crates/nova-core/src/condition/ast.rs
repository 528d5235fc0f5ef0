//! The condition language's abstract syntax tree.

use serde::{Deserialize, Serialize};

/// One of the four pattern sections a condition can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Keywords,
    Fuzzy,
    Semantics,
    Llm,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Keywords, Section::Fuzzy, Section::Semantics, Section::Llm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Keywords => "keywords",
            Section::Fuzzy => "fuzzy",
            Section::Semantics => "semantics",
            Section::Llm => "llm",
        }
    }

    pub fn parse(word: &str) -> Option<Section> {
        match word {
            "keywords" => Some(Section::Keywords),
            "fuzzy" => Some(Section::Fuzzy),
            "semantics" => Some(Section::Semantics),
            "llm" => Some(Section::Llm),
            _ => None,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed boolean condition expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Condition {
    /// The empty condition (no `condition:` text); triggers the permissive
    /// any-truthy fallback in the Matcher rather than being evaluated
    /// directly.
    #[default]
    Empty,
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    /// `section.$name`, or bare `$name` when `section` is `None`.
    Var { section: Option<Section>, name: String },
    /// `section.*` / `any of section.*`.
    SectionWildcard(Section),
    /// `any of (section.$prefix*)` or cross-section `any of ($prefix*)`
    /// when `section` is `None`.
    PrefixWildcard { section: Option<Section>, prefix: String },
}
