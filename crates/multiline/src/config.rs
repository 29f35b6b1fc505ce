// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants::{DEFAULT_CACHE_TTL, DEFAULT_MAX_LINES, DEFAULT_PATTERN, DEFAULT_SEPARATOR};
use crate::errors::Creation;
use crate::line_buffer::Policy;
use crate::matcher::{GroupWith, Matcher};
use crate::util::{parse_duration, parse_flag};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Coalescing configuration, fixed for the lifetime of an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultilineConfig {
    /// Regular expression identifying continuation lines
    pub pattern: String,
    /// Which of two adjacent lines `pattern` is tested against
    pub group_with: GroupWith,
    /// Invert the match result
    pub negate: bool,
    /// String placed between lines of one record
    pub separator: String,
    /// Lines kept per record before truncating
    pub max_lines: usize,
    /// Idle time after which a pending record is flushed. Also the sweep
    /// interval.
    pub cache_ttl: Duration,
}

impl Default for MultilineConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            group_with: GroupWith::default(),
            negate: false,
            separator: DEFAULT_SEPARATOR.to_string(),
            max_lines: DEFAULT_MAX_LINES,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl MultilineConfig {
    /// Builds a configuration from string route options (`pattern`,
    /// `group_with`, `negate`, `separator`, `max_lines`, `cache_ttl`).
    ///
    /// Missing options take their defaults. `max_lines` and `cache_ttl` values
    /// that do not parse fall back to their defaults as well; an unknown
    /// `group_with` is an error.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, Creation> {
        let defaults = Self::default();

        let group_with = match options.get("group_with") {
            Some(value) => GroupWith::from_str(value)?,
            None => defaults.group_with,
        };

        let max_lines = match options.get("max_lines").map(|v| v.trim().parse::<i64>()) {
            Some(Ok(value)) if value > 0 => usize::try_from(value).unwrap_or(DEFAULT_MAX_LINES),
            Some(Ok(_)) | None => DEFAULT_MAX_LINES,
            Some(Err(e)) => {
                warn!("Ignoring max_lines option: {e}");
                DEFAULT_MAX_LINES
            }
        };

        let cache_ttl = match options.get("cache_ttl") {
            Some(value) => parse_duration(value).unwrap_or_else(|| {
                warn!("Ignoring unparseable cache_ttl option '{value}'");
                DEFAULT_CACHE_TTL
            }),
            None => DEFAULT_CACHE_TTL,
        };

        let config = Self {
            pattern: options
                .get("pattern")
                .cloned()
                .unwrap_or(defaults.pattern),
            group_with,
            negate: parse_flag(options.get("negate").map(String::as_str)),
            separator: options
                .get("separator")
                .cloned()
                .unwrap_or(defaults.separator),
            max_lines,
            cache_ttl,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Creation> {
        if self.cache_ttl.is_zero() {
            return Err(Creation::ZeroCacheTtl);
        }
        Ok(())
    }

    /// Compiles the pattern into the policy shared by every line buffer.
    pub fn policy(&self) -> Result<Policy, Creation> {
        self.validate()?;
        Ok(Policy::new(
            Matcher::new(&self.pattern, self.group_with, self.negate)?,
            self.max_lines,
            self.separator.as_str(),
        ))
    }
}

/// What the adapter does when the sink rejects a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum EmissionPolicy {
    /// Stop streaming and return the error to the host.
    #[default]
    #[display("abort")]
    Abort,
    /// Log the error and keep streaming.
    #[display("continue")]
    LogAndContinue,
}

impl FromStr for EmissionPolicy {
    type Err = Creation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::LogAndContinue),
            _ => Err(Creation::UnknownEmissionPolicy(s.to_string())),
        }
    }
}
