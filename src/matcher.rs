// src/matcher.rs

//! Per-command path filtering.
//!
//! Each `[[commands]]` entry may carry a `match` and a `not_match` regex. A
//! path is in scope when `match` is empty or finds a hit, and `not_match`
//! does not. Both are unanchored searches against the full path string.

use std::fmt;

use regex::Regex;

use crate::config::model::CommandRule;
use crate::errors::{Result, RunOnSaveError};

/// Compiled `match` / `not_match` pair for a single command.
#[derive(Clone, Default)]
pub struct RuleMatcher {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleMatcher")
            .field("include", &self.include.as_ref().map(Regex::as_str))
            .field("exclude", &self.exclude.as_ref().map(Regex::as_str))
            .finish()
    }
}

impl RuleMatcher {
    /// Compile both patterns. `label` prefixes the field name in errors,
    /// e.g. `commands[2]` gives `commands[2].not_match`.
    pub fn compile(
        label: &str,
        match_pattern: Option<&str>,
        not_match: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            include: compile_pattern(&format!("{label}.match"), match_pattern)?,
            exclude: compile_pattern(&format!("{label}.not_match"), not_match)?,
        })
    }

    /// Returns true if the command applies to `path`.
    ///
    /// Negation always wins over a positive match.
    pub fn is_match(&self, path: &str) -> bool {
        let is_matched = self.include.as_ref().is_none_or(|re| re.is_match(path));
        let is_negated = self.exclude.as_ref().is_some_and(|re| re.is_match(path));
        is_matched && !is_negated
    }
}

/// Empty patterns compile to `None`, which the matcher treats as "no filter".
fn compile_pattern(field: &str, pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        None | Some("") => Ok(None),
        Some(pat) => Regex::new(pat)
            .map(Some)
            .map_err(|source| RunOnSaveError::InvalidPattern {
                field: field.to_string(),
                pattern: pat.to_string(),
                source,
            }),
    }
}

/// All rules that apply to `path`, in configured order.
pub fn matching_commands<'a>(rules: &'a [CommandRule], path: &str) -> Vec<&'a CommandRule> {
    rules.iter().filter(|rule| rule.matches(path)).collect()
}
