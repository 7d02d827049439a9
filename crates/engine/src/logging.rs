// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide tracing setup

use crate::capture::CaptureRegistry;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console output filtered by `RUST_LOG` (default `info`), plus job log capture.
///
/// The capture layer is unfiltered so a verbose job still sees its debug
/// and trace records when the console does not.
pub fn subscriber(capture: &CaptureRegistry) -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(capture.layer())
}

/// Install [`subscriber`] as the global default
pub fn install(capture: &CaptureRegistry) -> Result<(), TryInitError> {
    subscriber(capture).try_init()
}
