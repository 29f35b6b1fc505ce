// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for multi-line coalescing.

/// Invalid configuration, raised while building a matcher, buffer policy or
/// transport. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum Creation {
    #[error("unknown matcher type: {0}")]
    UnknownGroupWith(String),
    #[error("invalid continuation pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("unknown transport: {0}")]
    UnknownTransport(String),
    #[error("unknown emission policy: {0}")]
    UnknownEmissionPolicy(String),
    #[error("cache_ttl must be greater than zero")]
    ZeroCacheTtl,
}

/// Failure to serialize or deliver a coalesced record.
#[derive(Debug, thiserror::Error)]
pub enum Emission {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write record: {0}")]
    Write(#[from] std::io::Error),
    /// Some records of one event's batch failed. The remaining records of the
    /// batch were still attempted.
    #[error("{failed} of {attempted} records failed to emit, first error: {first}")]
    Batch {
        failed: usize,
        attempted: usize,
        first: Box<Emission>,
    },
}
