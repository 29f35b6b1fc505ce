// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Continuation predicate deciding whether two adjacent lines belong to the
//! same record.

use crate::errors::Creation;
use regex::Regex;
use std::str::FromStr;

/// Which of the two adjacent lines the continuation pattern is tested on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum GroupWith {
    /// Test the current line: a matching line continues the previous one
    /// (indented stack frames).
    #[default]
    #[display("previous")]
    Previous,
    /// Test the previous line: a matching line announces that the next one
    /// continues it (trailing backslash).
    #[display("next")]
    Next,
}

impl FromStr for GroupWith {
    type Err = Creation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "previous" => Ok(Self::Previous),
            "next" => Ok(Self::Next),
            other => Err(Creation::UnknownGroupWith(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    group_with: GroupWith,
    negate: bool,
}

impl Matcher {
    pub fn new(pattern: &str, group_with: GroupWith, negate: bool) -> Result<Self, Creation> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            group_with,
            negate,
        })
    }

    /// Returns true if `current_text` continues the record ending with
    /// `last_text`.
    #[must_use]
    pub fn matches(&self, last_text: &str, current_text: &str) -> bool {
        let subject = match self.group_with {
            GroupWith::Previous => current_text,
            GroupWith::Next => last_text,
        };
        self.regex.is_match(subject) != self.negate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_with_from_str() {
        assert_eq!("previous".parse::<GroupWith>().unwrap(), GroupWith::Previous);
        assert_eq!("next".parse::<GroupWith>().unwrap(), GroupWith::Next);
        assert!(matches!(
            "Previous".parse::<GroupWith>(),
            Err(Creation::UnknownGroupWith(value)) if value == "Previous"
        ));
    }

    #[test]
    fn test_group_with_display_round_trips() {
        for group_with in [GroupWith::Previous, GroupWith::Next] {
            assert_eq!(group_with.to_string().parse::<GroupWith>().unwrap(), group_with);
        }
    }

    #[test]
    fn test_previous_tests_current_line() {
        let matcher = Matcher::new(r"^\s", GroupWith::Previous, false).unwrap();
        assert!(matcher.matches("line1", "  line1.1"));
        assert!(!matcher.matches("  line1.1", "line2"));
    }

    #[test]
    fn test_next_tests_last_line() {
        let matcher = Matcher::new(r"\\$", GroupWith::Next, false).unwrap();
        assert!(matcher.matches("line1 \\", "line1.1"));
        assert!(!matcher.matches("line1.2", "line2 \\"));
    }

    #[test]
    fn test_negate_inverts_result() {
        let matcher = Matcher::new("^-", GroupWith::Previous, true).unwrap();
        assert!(matcher.matches("-line1", "  - line1.1"));
        assert!(!matcher.matches("  - line1.2", "-line2"));
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        assert!(matches!(
            Matcher::new("(", GroupWith::Previous, false),
            Err(Creation::Pattern(_))
        ));
    }
}
