// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use multiline::errors::{Creation, Emission};

/// Errors that stop the forwarder
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid multiline configuration: {0}")]
    Multiline(#[from] Creation),

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("Failed to read input: {0}")]
    Input(std::io::Error),

    #[error(transparent)]
    Emission(#[from] Emission),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
