//! Substitution rules and the pure text pipeline.

use crate::error::{Error, Result};
use regex::Regex;

/// `doc(db,` with optional whitespace before the comma.
pub const DOC_PATTERN: &str = r"doc\(db\s*,";
pub const DOC_REPLACEMENT: &str = "doc(db!,";

/// `collection(db,` with optional whitespace before the comma.
pub const COLLECTION_PATTERN: &str = r"collection\(db\s*,";
pub const COLLECTION_REPLACEMENT: &str = "collection(db!,";

/// A compiled (pattern, replacement) pair applied as a global find-and-replace.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    replacement: String,
}

impl Rule {
    /// Compile a rule. The replacement follows `regex` expansion syntax (`$1`, `${name}`).
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|e| Error::rewrite_invalid_pattern(pattern, e))?;

        Ok(Rule {
            pattern: regex,
            replacement: replacement.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// The fixed ruleset, in application order.
pub fn default_rules() -> Result<Vec<Rule>> {
    Ok(vec![
        Rule::new(DOC_PATTERN, DOC_REPLACEMENT)?,
        Rule::new(COLLECTION_PATTERN, COLLECTION_REPLACEMENT)?,
    ])
}

/// Result of running text through every rule.
#[derive(Debug, Clone)]
pub struct Applied {
    pub text: String,
    /// Match count per rule, index-aligned with the rule list.
    pub counts: Vec<usize>,
}

impl Applied {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Apply `rules` in order. Each rule replaces every non-overlapping match in
/// the output of the previous rule.
pub fn apply_rules(text: &str, rules: &[Rule]) -> Applied {
    let mut current = text.to_string();
    let mut counts = Vec::with_capacity(rules.len());

    for rule in rules {
        let count = rule.pattern.find_iter(&current).count();
        if count > 0 {
            current = rule
                .pattern
                .replace_all(&current, rule.replacement.as_str())
                .into_owned();
        }
        counts.push(count);
    }

    Applied {
        text: current,
        counts,
    }
}
