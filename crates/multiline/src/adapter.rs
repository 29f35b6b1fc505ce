// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Event loop driving a [`BufferCache`] from a line channel and an expiry
//! ticker.
//!
//! Each event runs to completion, including emission of every record it
//! produced, before the next event is taken. A tick and a line that are
//! ready at the same time are taken in either order.

use crate::buffer_cache::BufferCache;
use crate::config::{EmissionPolicy, MultilineConfig};
use crate::errors::{Creation, Emission};
use crate::message::{CoalescedRecord, LogLine};
use crate::sink::Sink;
use crate::stats::MultilineStats;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

#[derive(Debug)]
pub enum Event {
    Line(LogLine),
    /// Expiry sweep at the given time.
    Tick(Instant),
    /// The line source is closed. Everything pending is flushed.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    Continue,
    Quit,
}

pub struct MultilineAdapter<S> {
    cache: BufferCache,
    cache_ttl: Duration,
    sink: S,
    emission_policy: EmissionPolicy,
    stats: Arc<MultilineStats>,
}

impl<S: Sink> MultilineAdapter<S> {
    pub fn new(
        config: &MultilineConfig,
        sink: S,
        stats: Arc<MultilineStats>,
    ) -> Result<Self, Creation> {
        let policy = Arc::new(config.policy()?);
        Ok(Self {
            cache: BufferCache::new(policy, Arc::clone(&stats)),
            cache_ttl: config.cache_ttl,
            sink,
            emission_policy: EmissionPolicy::default(),
            stats,
        })
    }

    #[must_use]
    pub fn with_emission_policy(mut self, emission_policy: EmissionPolicy) -> Self {
        self.emission_policy = emission_policy;
        self
    }

    /// Processes one event and emits the records it completed.
    ///
    /// Under [`EmissionPolicy::Abort`] an emission failure is returned once
    /// every record of the event has been attempted. Under
    /// [`EmissionPolicy::LogAndContinue`] it is logged instead.
    pub async fn handle(&mut self, event: Event) -> Result<ControlCode, Emission> {
        let (records, control) = match event {
            Event::Line(line) => (
                self.cache.route(line).into_iter().collect(),
                ControlCode::Continue,
            ),
            Event::Tick(now) => (
                self.cache.sweep_expired(now, self.cache_ttl),
                ControlCode::Continue,
            ),
            Event::Closed => (self.cache.drain_all(), ControlCode::Quit),
        };

        let result = self.send_records(records).await;
        self.stats.set_cached_lines(self.cache.pending_lines());

        match (result, self.emission_policy) {
            (Ok(()), _) => Ok(control),
            (Err(e), EmissionPolicy::LogAndContinue) => {
                error!("Failed to emit records: {e}");
                Ok(control)
            }
            (Err(e), EmissionPolicy::Abort) => Err(e),
        }
    }

    /// Runs until `lines` is closed and everything pending has been emitted,
    /// or until an emission fails under [`EmissionPolicy::Abort`].
    pub async fn stream(mut self, mut lines: mpsc::Receiver<LogLine>) -> Result<(), Emission> {
        debug!(
            "Multiline adapter started, cache_ttl={:?}, on_emit_error={}",
            self.cache_ttl, self.emission_policy
        );
        let mut ticker = interval_at(Instant::now() + self.cache_ttl, self.cache_ttl);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                line = lines.recv() => line.map_or(Event::Closed, Event::Line),
                _ = ticker.tick() => Event::Tick(Instant::now()),
            };
            if self.handle(event).await? == ControlCode::Quit {
                break;
            }
        }

        debug!("Multiline adapter stopped: {}", self.stats.snapshot());
        Ok(())
    }

    async fn send_records(&mut self, records: Vec<CoalescedRecord>) -> Result<(), Emission> {
        let attempted = records.len();
        let mut failed = 0;
        let mut first_error = None;

        for mut record in records {
            record.emitted_at = SystemTime::now();
            match self.sink.emit(&record).await {
                Ok(()) => self.stats.record_emitted(),
                Err(e) => {
                    self.stats.record_emission_error();
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(first) if attempted == 1 => Err(first),
            Some(first) => Err(Emission::Batch {
                failed,
                attempted,
                first: Box::new(first),
            }),
        }
    }
}
