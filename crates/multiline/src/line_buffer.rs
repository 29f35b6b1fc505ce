// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-stream buffer accumulating the lines of one in-progress record.

use crate::constants::{DEFAULT_MAX_LINES, TRUNCATED_MARKER};
use crate::matcher::Matcher;
use crate::message::{CoalescedRecord, LogLine};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Coalescing rules shared by every buffer of one cache.
#[derive(Debug)]
pub struct Policy {
    matcher: Matcher,
    max_lines: usize,
    separator: String,
}

impl Policy {
    /// A `max_lines` of zero falls back to [`DEFAULT_MAX_LINES`].
    #[must_use]
    pub fn new(matcher: Matcher, max_lines: usize, separator: impl Into<String>) -> Self {
        Self {
            matcher,
            max_lines: if max_lines == 0 {
                DEFAULT_MAX_LINES
            } else {
                max_lines
            },
            separator: separator.into(),
        }
    }

    #[must_use]
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }
}

/// What happened to a line handed to [`LineBuffer::admit`].
#[derive(Debug)]
pub enum Admission {
    /// The line was added to the pending record.
    Appended,
    /// The pending record was full; a truncation marker took the line's place.
    Truncated,
    /// The pending record was full and already truncated; the line is gone.
    Dropped,
    /// The line started a new record. The previous one is returned.
    Flushed(CoalescedRecord),
}

impl Admission {
    #[must_use]
    pub fn into_record(self) -> Option<CoalescedRecord> {
        match self {
            Admission::Flushed(record) => Some(record),
            _ => None,
        }
    }
}

/// Result of an expiry check.
#[derive(Debug)]
pub enum Expiry {
    /// The buffer was touched within the TTL and stays cached.
    Alive,
    /// The buffer went stale. Its pending lines, if any, were flushed and the
    /// buffer should be dropped.
    Expired(Option<CoalescedRecord>),
}

#[derive(Debug)]
pub struct LineBuffer {
    policy: Arc<Policy>,
    pending: Vec<LogLine>,
    last_touched: Instant,
}

impl LineBuffer {
    #[must_use]
    pub fn new(policy: Arc<Policy>) -> Self {
        Self {
            policy,
            pending: Vec::new(),
            last_touched: Instant::now(),
        }
    }

    /// Adds a line, flushing the pending record first if the line does not
    /// continue it.
    pub fn admit(&mut self, line: LogLine) -> Admission {
        self.last_touched = Instant::now();
        if self.is_continuation(&line.text) {
            self.add_pending(line)
        } else {
            let flushed = self.flush();
            self.pending.push(line);
            match flushed {
                Some(record) => Admission::Flushed(record),
                None => Admission::Appended,
            }
        }
    }

    /// Flushes the buffer if it has not been touched for more than `ttl`.
    pub fn expire(&mut self, now: Instant, ttl: Duration) -> Expiry {
        if now.saturating_duration_since(self.last_touched) > ttl {
            Expiry::Expired(self.flush())
        } else {
            Expiry::Alive
        }
    }

    /// Flushes whatever is pending. Returns `None` on an empty buffer.
    pub fn drain(&mut self) -> Option<CoalescedRecord> {
        self.flush()
    }

    #[must_use]
    pub fn pending_size(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn last_touched(&self) -> Instant {
        self.last_touched
    }

    fn is_continuation(&self, text: &str) -> bool {
        match self.pending.last() {
            None => true,
            Some(last) => self.policy.matcher.matches(&last.text, text),
        }
    }

    fn add_pending(&mut self, line: LogLine) -> Admission {
        let max_lines = self.policy.max_lines;
        if self.pending.len() < max_lines {
            self.pending.push(line);
            Admission::Appended
        } else if self.pending.len() == max_lines {
            self.pending.push(LogLine {
                text: TRUNCATED_MARKER.to_string(),
                ..line
            });
            Admission::Truncated
        } else {
            Admission::Dropped
        }
    }

    fn flush(&mut self) -> Option<CoalescedRecord> {
        if self.pending.is_empty() {
            return None;
        }
        let lines = std::mem::take(&mut self.pending);
        let text = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<&str>>()
            .join(&self.policy.separator);
        let first = lines.into_iter().next()?;
        Some(CoalescedRecord {
            source_key: first.source_key,
            text,
            arrival_time: first.arrival_time,
            emitted_at: SystemTime::now(),
            origin: first.origin,
        })
    }
}
