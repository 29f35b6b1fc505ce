// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Counters describing what the coalescing pipeline did.
//!
//! The counters are owned by the host and injected into the adapter, so a
//! process can run several adapters with separate or shared counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline counters (all values use relaxed atomics).
#[derive(Debug, Default)]
pub struct MultilineStats {
    lines_received: AtomicU64,
    lines_truncated: AtomicU64,
    lines_dropped: AtomicU64,
    records_emitted: AtomicU64,
    records_expired: AtomicU64,
    emission_errors: AtomicU64,
    cached_lines: AtomicU64,
}

impl MultilineStats {
    /// Captures a point-in-time snapshot of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            lines_truncated: self.lines_truncated.load(Ordering::Relaxed),
            lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            records_expired: self.records_expired.load(Ordering::Relaxed),
            emission_errors: self.emission_errors.load(Ordering::Relaxed),
            cached_lines: self.cached_lines.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_line_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_line_truncated(&self) {
        self.lines_truncated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_line_dropped(&self) {
        self.lines_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_emitted(&self) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self, count: usize) {
        self.records_expired
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_emission_error(&self) {
        self.emission_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_cached_lines(&self, count: usize) {
        self.cached_lines.store(count as u64, Ordering::Relaxed);
    }
}

/// Plain data representation of [`MultilineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Lines handed to the cache.
    pub lines_received: u64,
    /// Lines replaced by a truncation marker.
    pub lines_truncated: u64,
    /// Lines discarded after a record was already truncated.
    pub lines_dropped: u64,
    /// Records successfully written to the sink.
    pub records_emitted: u64,
    /// Records flushed by an expiry sweep.
    pub records_expired: u64,
    /// Records the sink failed to accept.
    pub emission_errors: u64,
    /// Lines currently waiting in buffers, as of the last event.
    pub cached_lines: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lines_received={}, lines_truncated={}, lines_dropped={}, records_emitted={}, records_expired={}, emission_errors={}, cached_lines={}",
            self.lines_received,
            self.lines_truncated,
            self.lines_dropped,
            self.records_emitted,
            self.records_expired,
            self.emission_errors,
            self.cached_lines
        )
    }
}
