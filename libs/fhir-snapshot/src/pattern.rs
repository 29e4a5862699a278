//! Choice-aware element path patterns
//!
//! A base path such as `Observation.value[x]` must match differential paths
//! that name a concrete arm (`Observation.valueQuantity`) as well as the
//! literal `[x]` form.

use crate::error::Result;
use ferrite_schema::primitives::CHOICE_TYPE_SUFFIXES;
use once_cell::sync::Lazy;
use regex::Regex;

static CHOICE_ALTERNATION: Lazy<String> = Lazy::new(|| {
    let mut arms: Vec<&str> = CHOICE_TYPE_SUFFIXES.to_vec();
    // Longest first so `Integer64` is tried before `Integer`
    arms.sort_by_key(|arm| std::cmp::Reverse(arm.len()));
    format!("(?:{}|\\[x\\])", arms.join("|"))
});

/// Matcher for one base element path
#[derive(Debug, Clone)]
pub struct PathPattern {
    exact: Regex,
    subtree: Regex,
}

impl PathPattern {
    pub fn new(path: &str) -> Result<Self> {
        let source = pattern_source(path);
        Ok(Self {
            exact: Regex::new(&format!("^{}$", source))?,
            subtree: Regex::new(&format!(r"^{}(\..*)?$", source))?,
        })
    }

    /// `path` names this element (or one of its choice arms).
    pub fn matches(&self, path: &str) -> bool {
        self.exact.is_match(path)
    }

    /// `path` names this element or anything beneath it.
    pub fn matches_subtree(&self, path: &str) -> bool {
        self.subtree.is_match(path)
    }
}

/// Dots and other metacharacters escaped, `[x]` expanded to every choice suffix.
fn pattern_source(path: &str) -> String {
    path.split("[x]")
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(CHOICE_ALTERNATION.as_str())
}
