// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Line and record types flowing through the coalescing pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use ustr::Ustr;

/// Container a log stream belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub hostname: String,
    pub labels: HashMap<String, String>,
}

/// Where a stream of lines comes from: a container and one of its output
/// streams (`stdout`, `stderr`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub container: Container,
    pub source: String,
}

impl Origin {
    #[must_use]
    pub fn new(container: Container, source: impl Into<String>) -> Self {
        Self {
            container,
            source: source.into(),
        }
    }

    /// Cache key for this stream. Each container output stream is buffered
    /// separately so stdout and stderr never interleave inside one record.
    #[must_use]
    pub fn source_key(&self) -> Ustr {
        if self.container.id.is_empty() {
            Ustr::from(self.source.as_str())
        } else {
            Ustr::from(format!("{}:{}", self.container.id, self.source).as_str())
        }
    }
}

/// One raw line as received from a stream.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub source_key: Ustr,
    pub text: String,
    pub arrival_time: SystemTime,
    pub origin: Arc<Origin>,
}

impl LogLine {
    /// Creates a line stamped with the current time.
    #[must_use]
    pub fn new(origin: Arc<Origin>, text: impl Into<String>) -> Self {
        Self::at(origin, text, SystemTime::now())
    }

    #[must_use]
    pub fn at(origin: Arc<Origin>, text: impl Into<String>, arrival_time: SystemTime) -> Self {
        Self {
            source_key: origin.source_key(),
            text: text.into(),
            arrival_time,
            origin,
        }
    }
}

/// A group of lines joined into one logical record.
///
/// The record is attributed to the first line of its group: `origin` and
/// `arrival_time` are copied from that line.
#[derive(Debug, Clone)]
pub struct CoalescedRecord {
    pub source_key: Ustr,
    pub text: String,
    pub arrival_time: SystemTime,
    pub emitted_at: SystemTime,
    pub origin: Arc<Origin>,
}
