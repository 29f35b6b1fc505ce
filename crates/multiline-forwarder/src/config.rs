// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ForwarderError;
use multiline::config::{EmissionPolicy, MultilineConfig};
use multiline::constants::DEFAULT_LABEL_PREFIX;
use multiline::transport::TransportKind;
use multiline::util::parse_flag;
use std::collections::HashMap;
use std::env;

/// Environment variables mapped onto multiline route options.
const MULTILINE_OPTIONS: [(&str, &str); 7] = [
    ("MULTILINE_PATTERN", "pattern"),
    ("MULTILINE_GROUP_WITH", "group_with"),
    ("MULTILINE_NEGATE", "negate"),
    ("MULTILINE_SEPARATOR", "separator"),
    ("MULTILINE_MAX_LINES", "max_lines"),
    ("MULTILINE_CACHE_TTL", "cache_ttl"),
    ("LOGSTASH_TRANSPORT", "transport"),
];

const DEFAULT_SOURCE: &str = "stdin";

/// Configuration of the forwarder binary
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Logstash `host:port`
    pub address: String,
    pub transport: TransportKind,
    pub multiline: MultilineConfig,
    /// Prefix of the container labels read into the `app` object
    pub label_prefix: String,
    /// Whether to extract Java exception fields
    pub java_exceptions: bool,
    pub on_emit_error: EmissionPolicy,
    /// Source assigned to plain text input lines
    pub default_source: String,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            transport: TransportKind::default(),
            multiline: MultilineConfig::default(),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            java_exceptions: false,
            on_emit_error: EmissionPolicy::default(),
            default_source: DEFAULT_SOURCE.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ForwarderConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ForwarderError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ForwarderError> {
        let options: HashMap<String, String> = MULTILINE_OPTIONS
            .iter()
            .filter_map(|(var, option)| lookup(var).map(|value| ((*option).to_string(), value)))
            .collect();

        let defaults = Self::default();
        let config = Self {
            address: lookup("LOGSTASH_ADDRESS").unwrap_or_default(),
            transport: TransportKind::from_options(&options)?,
            multiline: MultilineConfig::from_options(&options)?,
            label_prefix: lookup("MULTILINE_LABEL_PREFIX").unwrap_or(defaults.label_prefix),
            java_exceptions: parse_flag(lookup("MULTILINE_JAVA_EXCEPTIONS").as_deref()),
            on_emit_error: match lookup("MULTILINE_ON_EMIT_ERROR") {
                Some(value) => value.parse()?,
                None => defaults.on_emit_error,
            },
            default_source: lookup("MULTILINE_DEFAULT_SOURCE").unwrap_or(defaults.default_source),
            log_level: lookup("LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ForwarderError> {
        if self.address.trim().is_empty() {
            return Err(ForwarderError::InvalidConfig(
                "LOGSTASH_ADDRESS is required".to_string(),
            ));
        }

        if self.default_source.trim().is_empty() {
            return Err(ForwarderError::InvalidConfig(
                "MULTILINE_DEFAULT_SOURCE cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ForwarderError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error, off",
                self.log_level
            )));
        }

        self.multiline.validate()?;
        Ok(())
    }
}
