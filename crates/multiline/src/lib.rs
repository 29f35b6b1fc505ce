// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Multi-line log coalescing for line-oriented container log streams.
//!
//! Lines arrive tagged with the stream they belong to. Consecutive lines of
//! the same stream that match a continuation pattern (stack traces, lines
//! ending in a backslash, ...) are buffered per stream and shipped as a single
//! record once the group ends, the buffer goes stale, or the input closes.
//!
//! ```text
//!   LogLine ──> BufferCache ──(route)──> LineBuffer[source_key]
//!                   ^                          │ CoalescedRecord
//!   ticker ─(sweep)─┘                          v
//!                                   Sink (Enricher + Transport)
//! ```
//!
//! [`adapter::MultilineAdapter`] owns the cache and merges line arrival with
//! the expiry ticker into a single event loop.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod adapter;
pub mod buffer_cache;
pub mod config;
pub mod constants;
pub mod enrichment;
pub mod errors;
pub mod java_exception;
pub mod line_buffer;
pub mod matcher;
pub mod message;
pub mod sink;
pub mod stats;
pub mod transport;
pub mod util;
