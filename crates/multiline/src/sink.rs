// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::enrichment::Enricher;
use crate::errors::Emission;
use crate::message::CoalescedRecord;
use crate::transport::Transport;
use async_trait::async_trait;
use tracing::trace;

/// Destination of coalesced records. Called once per record, in the order
/// records are produced.
#[async_trait]
pub trait Sink: Send {
    async fn emit(&mut self, record: &CoalescedRecord) -> Result<(), Emission>;
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn emit(&mut self, record: &CoalescedRecord) -> Result<(), Emission> {
        (**self).emit(record).await
    }
}

/// Serializes records as Logstash JSON and writes them to a transport.
pub struct LogstashSink {
    enricher: Enricher,
    transport: Box<dyn Transport>,
}

impl LogstashSink {
    #[must_use]
    pub fn new(enricher: Enricher, transport: Box<dyn Transport>) -> Self {
        Self {
            enricher,
            transport,
        }
    }
}

#[async_trait]
impl Sink for LogstashSink {
    async fn emit(&mut self, record: &CoalescedRecord) -> Result<(), Emission> {
        let document = self.enricher.serialize(record)?;
        trace!(
            "Writing {} byte record for {}",
            document.len(),
            record.source_key
        );
        self.transport.write(&document).await?;
        Ok(())
    }
}
