// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Extraction of Java stack trace fields from a coalesced record.
//!
//! Runs after coalescing, on the joined text of a record. Records that do
//! not contain both an exception line and at least one `at ...` frame are
//! left alone.

use crate::enrichment::RecordStage;
use crate::errors::Creation;
use crate::message::CoalescedRecord;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Fields extracted from a Java stack trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JavaException {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    pub frames: usize,
}

#[derive(Debug, Clone)]
pub struct JavaExceptionStage {
    header: Regex,
    exception: Regex,
    cause: Regex,
    frame: Regex,
}

impl JavaExceptionStage {
    pub fn new() -> Result<Self, Creation> {
        Ok(Self {
            header: Regex::new(
                r"^(?P<timestamp>\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?\S*)\s+(?P<level>TRACE|DEBUG|INFO|WARN|WARNING|ERROR|FATAL|SEVERE)\s+(?:\[(?P<thread>[^\]]+)\])?",
            )?,
            exception: Regex::new(
                r#"(?:^|\s)(?:Exception in thread "(?P<thread>[^"]+)" )?(?P<class>(?:[a-zA-Z_$][\w$]*\.)+[A-Z][\w$]*(?:Exception|Error|Throwable))(?::\s*(?P<message>.*))?$"#,
            )?,
            cause: Regex::new(
                r"^\s*Caused by:\s*(?P<class>(?:[a-zA-Z_$][\w$]*\.)*[A-Z][\w$]*)",
            )?,
            frame: Regex::new(r"^\s+at\s+\S")?,
        })
    }

    /// Parses `text` as a Java stack trace.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<JavaException> {
        let first = text.lines().next()?;

        let frames = text.lines().filter(|line| self.frame.is_match(line)).count();
        if frames == 0 {
            return None;
        }

        let mut exception = JavaException {
            frames,
            ..Default::default()
        };

        if let Some(header) = self.header.captures(first) {
            exception.timestamp = header.name("timestamp").map(|m| m.as_str().to_string());
            exception.level = header.name("level").map(|m| m.as_str().to_string());
            exception.thread = header.name("thread").map(|m| m.as_str().to_string());
        }

        let thrown = text
            .lines()
            .take_while(|line| !self.frame.is_match(line))
            .find_map(|line| self.exception.captures(line))?;
        exception.class = thrown.name("class")?.as_str().to_string();
        exception.message = thrown
            .name("message")
            .map(|m| m.as_str().trim().to_string())
            .filter(|m| !m.is_empty());
        if exception.thread.is_none() {
            exception.thread = thrown.name("thread").map(|m| m.as_str().to_string());
        }

        exception.causes = text
            .lines()
            .filter_map(|line| self.cause.captures(line))
            .filter_map(|c| c.name("class").map(|m| m.as_str().to_string()))
            .collect();

        Some(exception)
    }
}

impl RecordStage for JavaExceptionStage {
    fn apply(&self, record: &CoalescedRecord, fields: &mut Map<String, Value>) {
        let Some(exception) = self.parse(&record.text) else {
            return;
        };
        match serde_json::to_value(&exception) {
            Ok(value) => {
                fields.insert("exception".to_string(), value);
            }
            Err(e) => debug!("Failed to serialize exception fields: {e}"),
        }
    }
}
