// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod config;
mod error;
mod input;

use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use multiline::{
    adapter::MultilineAdapter,
    constants::LINE_CHANNEL_CAPACITY,
    enrichment::Enricher,
    java_exception::JavaExceptionStage,
    message::{Container, Origin},
    sink::LogstashSink,
    stats::MultilineStats,
    transport,
};

use crate::config::ForwarderConfig;
use crate::error::ForwarderError;

pub fn main() -> ExitCode {
    let config = match ForwarderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet.
            eprintln!("multiline-forwarder: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("multiline-forwarder: {e}");
        return ExitCode::FAILURE;
    }
    debug!("Logging subsystem enabled");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(config));
    // A pending stdin read holds a blocking thread that never finishes on its own.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Forwarder stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) -> Result<(), ForwarderError> {
    let env_filter = EnvFilter::try_new(log_level)
        .map_err(|e| ForwarderError::InvalidConfig(format!("could not parse log level: {e}")))?;
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ForwarderError::Runtime(format!("setting default subscriber failed: {e}")))
}

async fn run(config: ForwarderConfig) -> Result<(), ForwarderError> {
    let transport = transport::connect(config.transport, &config.address)
        .await
        .map_err(|source| ForwarderError::Connect {
            address: config.address.clone(),
            source,
        })?;
    info!(
        "Forwarding to {} over {}, cache_ttl={:?}",
        config.address, config.transport, config.multiline.cache_ttl
    );

    let mut enricher = Enricher::new(config.label_prefix.clone());
    if config.java_exceptions {
        enricher = enricher.with_stage(JavaExceptionStage::new()?);
    }

    let stats = Arc::new(MultilineStats::default());
    let adapter = MultilineAdapter::new(
        &config.multiline,
        LogstashSink::new(enricher, transport),
        Arc::clone(&stats),
    )?
    .with_emission_policy(config.on_emit_error);

    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let default_origin = Arc::new(Origin::new(Container::default(), config.default_source));

    let reader = tokio::spawn(input::read_lines(
        BufReader::new(tokio::io::stdin()),
        tx,
        default_origin,
        cancel.clone(),
    ));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, draining pending records");
            shutdown.cancel();
        }
    });

    let streamed = adapter.stream(rx).await;
    // Unblocks the reader if the adapter stopped first.
    cancel.cancel();

    let read = reader
        .await
        .map_err(|e| ForwarderError::Runtime(format!("input reader failed: {e}")))?;
    info!("Forwarder finished: {}", stats.snapshot());

    streamed?;
    read.map_err(ForwarderError::Input)?;
    Ok(())
}
