// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Keyed set of line buffers, one per source stream.
//!
//! The cache is owned by a single task and is never shared, so buffers are
//! plain values mutated in place. Hosts that want several workers must shard
//! lines by source key (see [`shard_for`]) so one key is only ever seen by
//! one cache.

use crate::line_buffer::{Admission, Expiry, LineBuffer, Policy};
use crate::message::{CoalescedRecord, LogLine};
use crate::stats::MultilineStats;
use fnv::{FnvBuildHasher, FnvHasher};
use hashbrown::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};
use ustr::Ustr;

pub struct BufferCache {
    policy: Arc<Policy>,
    buffers: HashMap<Ustr, LineBuffer, FnvBuildHasher>,
    stats: Arc<MultilineStats>,
}

impl BufferCache {
    #[must_use]
    pub fn new(policy: Arc<Policy>, stats: Arc<MultilineStats>) -> Self {
        Self {
            policy,
            buffers: HashMap::with_hasher(FnvBuildHasher::default()),
            stats,
        }
    }

    /// Hands a line to the buffer of its stream, creating the buffer on first
    /// sight of the key. Returns the record the line completed, if any.
    pub fn route(&mut self, line: LogLine) -> Option<CoalescedRecord> {
        self.stats.record_line_received();
        let policy = &self.policy;
        let buffer = self
            .buffers
            .entry(line.source_key)
            .or_insert_with(|| {
                trace!("Creating line buffer for {}", line.source_key);
                LineBuffer::new(Arc::clone(policy))
            });

        match buffer.admit(line) {
            Admission::Truncated => {
                self.stats.record_line_truncated();
                None
            }
            Admission::Dropped => {
                self.stats.record_line_dropped();
                None
            }
            admission => admission.into_record(),
        }
    }

    /// Flushes and removes every buffer idle for more than `ttl`.
    ///
    /// Records from different keys come back in no particular order.
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> Vec<CoalescedRecord> {
        let mut records = Vec::new();
        self.buffers.retain(|_, buffer| match buffer.expire(now, ttl) {
            Expiry::Alive => true,
            Expiry::Expired(record) => {
                records.extend(record);
                false
            }
        });
        if !records.is_empty() {
            debug!("Expired {} line buffers", records.len());
            self.stats.record_expired(records.len());
        }
        records
    }

    /// Flushes and removes every buffer. Used when the input closes.
    pub fn drain_all(&mut self) -> Vec<CoalescedRecord> {
        let records: Vec<CoalescedRecord> = self
            .buffers
            .drain()
            .filter_map(|(_, mut buffer)| buffer.drain())
            .collect();
        debug!("Drained {} pending records", records.len());
        records
    }

    /// Number of cached buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, source_key: &Ustr) -> bool {
        self.buffers.contains_key(source_key)
    }

    /// Lines waiting across all buffers.
    #[must_use]
    pub fn pending_lines(&self) -> usize {
        self.buffers.values().map(LineBuffer::pending_size).sum()
    }
}

/// Picks the worker responsible for `source_key` among `shards` workers.
#[must_use]
pub fn shard_for(source_key: &Ustr, shards: usize) -> usize {
    if shards <= 1 {
        return 0;
    }
    let mut hasher = FnvHasher::default();
    source_key.as_str().hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{GroupWith, Matcher};
    use crate::message::{Container, Origin};
    use proptest::prelude::*;
    use std::collections::HashMap as StdHashMap;

    fn policy(max_lines: usize) -> Arc<Policy> {
        Arc::new(Policy::new(
            Matcher::new(r"^\s", GroupWith::Previous, false).unwrap(),
            max_lines,
            "\n",
        ))
    }

    fn cache() -> BufferCache {
        BufferCache::new(policy(1024), Arc::new(MultilineStats::default()))
    }

    fn origin(id: &str) -> Arc<Origin> {
        Arc::new(Origin::new(
            Container {
                id: id.to_string(),
                ..Default::default()
            },
            "stdout",
        ))
    }

    #[test]
    fn test_route_creates_buffer_lazily() {
        let mut cache = cache();
        let origin = origin("c1");
        assert!(cache.is_empty());

        assert!(cache.route(LogLine::new(Arc::clone(&origin), "line1")).is_none());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&origin.source_key()));
    }

    #[test]
    fn test_route_returns_completed_record() {
        let mut cache = cache();
        let origin = origin("c1");
        cache.route(LogLine::new(Arc::clone(&origin), "line1"));
        cache.route(LogLine::new(Arc::clone(&origin), "  line1.1"));

        let record = cache
            .route(LogLine::new(Arc::clone(&origin), "line2"))
            .unwrap();
        assert_eq!(record.text, "line1\n  line1.1");
        assert_eq!(cache.pending_lines(), 1);
    }

    #[test]
    fn test_interleaved_keys_do_not_mix() {
        let mut cache = cache();
        let a = origin("a");
        let b = origin("b");
        cache.route(LogLine::new(Arc::clone(&a), "a1"));
        cache.route(LogLine::new(Arc::clone(&b), "b1"));
        cache.route(LogLine::new(Arc::clone(&a), "  a1.1"));
        cache.route(LogLine::new(Arc::clone(&b), "  b1.1"));

        let mut records: Vec<String> = cache.drain_all().into_iter().map(|r| r.text).collect();
        records.sort();
        assert_eq!(records, vec!["a1\n  a1.1", "b1\n  b1.1"]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_drain_all_on_empty_cache() {
        let mut cache = cache();
        assert!(cache.drain_all().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired_buffers() {
        let ttl = Duration::from_millis(5);
        let mut cache = cache();
        let stale = origin("stale");
        let fresh = origin("fresh");

        cache.route(LogLine::new(Arc::clone(&stale), "old"));
        tokio::time::advance(Duration::from_millis(4)).await;
        cache.route(LogLine::new(Arc::clone(&fresh), "new"));
        tokio::time::advance(Duration::from_millis(2)).await;

        let records = cache.sweep_expired(Instant::now(), ttl);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "old");
        assert!(!cache.contains(&stale.source_key()));
        assert!(cache.contains(&fresh.source_key()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_with_nothing_expired() {
        let mut cache = cache();
        cache.route(LogLine::new(origin("c1"), "line"));
        assert!(cache
            .sweep_expired(Instant::now(), Duration::from_secs(1))
            .is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stats_count_truncation() {
        let stats = Arc::new(MultilineStats::default());
        let mut cache = BufferCache::new(policy(1), Arc::clone(&stats));
        let origin = origin("c1");
        for text in ["head", " a", " b", " c"] {
            cache.route(LogLine::new(Arc::clone(&origin), text));
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.lines_received, 4);
        assert_eq!(snapshot.lines_truncated, 1);
        assert_eq!(snapshot.lines_dropped, 2);
    }

    #[test]
    fn test_zero_max_lines_does_not_truncate_groups() {
        let stats = Arc::new(MultilineStats::default());
        let mut cache = BufferCache::new(policy(0), Arc::clone(&stats));
        let origin = origin("c1");
        cache.route(LogLine::new(Arc::clone(&origin), "head"));
        cache.route(LogLine::new(Arc::clone(&origin), "  tail"));

        let records = cache.drain_all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "head\n  tail");
        assert_eq!(stats.snapshot().lines_truncated, 0);
    }

    #[test]
    fn test_shard_for_is_stable_and_bounded() {
        let key = Ustr::from("container:stdout");
        assert_eq!(shard_for(&key, 1), 0);
        assert_eq!(shard_for(&key, 0), 0);
        let shard = shard_for(&key, 8);
        assert!(shard < 8);
        assert_eq!(shard_for(&key, 8), shard);
    }

    /// Coalesces one key's lines on its own cache.
    fn coalesce_alone(id: &str, texts: &[String]) -> Vec<String> {
        let mut cache = cache();
        let origin = origin(id);
        let mut output: Vec<String> = texts
            .iter()
            .filter_map(|text| cache.route(LogLine::new(Arc::clone(&origin), text.clone())))
            .map(|record| record.text)
            .collect();
        output.extend(cache.drain_all().into_iter().map(|record| record.text));
        output
    }

    proptest! {
        #[test]
        fn prop_interleaved_keys_match_isolated_runs(
            events in proptest::collection::vec(
                (0usize..3, prop_oneof!["[a-z]{1,4}", " [a-z]{1,4}"]),
                0..60,
            )
        ) {
            let ids = ["k0", "k1", "k2"];
            let origins: Vec<Arc<Origin>> = ids.iter().map(|id| origin(id)).collect();

            let mut interleaved: StdHashMap<String, Vec<String>> = StdHashMap::new();
            let mut cache = cache();
            for (key, text) in &events {
                if let Some(record) = cache.route(LogLine::new(Arc::clone(&origins[*key]), text.clone())) {
                    interleaved.entry(record.origin.container.id.clone()).or_default().push(record.text);
                }
            }
            for record in cache.drain_all() {
                interleaved.entry(record.origin.container.id.clone()).or_default().push(record.text);
            }

            for (index, id) in ids.iter().enumerate() {
                let texts: Vec<String> = events
                    .iter()
                    .filter(|(key, _)| *key == index)
                    .map(|(_, text)| text.clone())
                    .collect();
                let expected = coalesce_alone(id, &texts);
                let actual = interleaved.remove(*id).unwrap_or_default();
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
