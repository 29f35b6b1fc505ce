// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Line reader turning stdin into [`LogLine`]s.
//!
//! Each input line is either a JSON envelope
//!
//! ```json
//! {"container": {"id": "...", "name": "...", "labels": {...}}, "source": "stderr", "data": "..."}
//! ```
//!
//! or plain text, attributed to the default origin.

use multiline::message::{Container, LogLine, Origin};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    #[serde(default)]
    container: Container,
    #[serde(default = "default_stream")]
    source: String,
    data: String,
}

fn default_stream() -> String {
    "stdout".to_string()
}

/// Parses one raw input line.
pub fn parse_line(raw: &str, default_origin: &Arc<Origin>) -> LogLine {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    if raw.starts_with('{') {
        if let Ok(envelope) = serde_json::from_str::<Envelope>(raw) {
            let data = envelope.data.trim_end_matches(['\n', '\r']).to_string();
            return LogLine::new(
                Arc::new(Origin::new(envelope.container, envelope.source)),
                data,
            );
        }
    }
    LogLine::new(Arc::clone(default_origin), raw)
}

/// Forwards lines from `reader` into `lines` until the reader is exhausted,
/// the receiver goes away, or `cancel` fires. Returns the number of lines
/// forwarded. Dropping the sender on return closes the line channel.
///
/// Input is treated as bytes: invalid UTF-8 sequences are replaced with
/// U+FFFD and the line is still forwarded.
pub async fn read_lines<R>(
    mut reader: R,
    lines: mpsc::Sender<LogLine>,
    default_origin: Arc<Origin>,
    cancel: CancellationToken,
) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut forwarded = 0;
    loop {
        buf.clear();
        let read = tokio::select! {
            () = cancel.cancelled() => {
                debug!("Input reader cancelled after {forwarded} lines");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            debug!("Input closed after {forwarded} lines");
            break;
        }
        let bytes = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let raw = String::from_utf8_lossy(bytes);
        if matches!(raw, Cow::Owned(_)) {
            debug!("Replaced invalid UTF-8 in input line {}", forwarded + 1);
        }
        let line = parse_line(&raw, &default_origin);
        trace!("Read line for {}", line.source_key);
        if lines.send(line).await.is_err() {
            debug!("Line receiver dropped, stopping input reader");
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}
