// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Continuation pattern used when none is configured: indented lines and
/// Java `Caused by:` lines belong to the previous line.
pub const DEFAULT_PATTERN: &str = r"(^\s)|(^Caused by:)";

/// Maximum number of lines buffered for one record.
pub const DEFAULT_MAX_LINES: usize = 1 << 10;

pub const DEFAULT_SEPARATOR: &str = "\n";

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

/// Text of the line appended in place of the first line past `max_lines`.
pub const TRUNCATED_MARKER: &str = "[Truncated]";

/// Label namespace read for the `app` section of shipped documents.
pub const DEFAULT_LABEL_PREFIX: &str = "com.logspout";

/// Capacity of the channel between the line producer and the adapter.
pub const LINE_CHANNEL_CAPACITY: usize = 1000;
