// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level startup errors. Every variant here is fatal (spec §6 "Exit
//! codes"): the daemon prints the error and exits non-zero rather than
//! trying to run in a half-initialised state.

use thiserror::Error;

use crate::env::ConfigError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to set up logging: {0}")]
    Logging(#[source] std::io::Error),
    #[error("failed to start the artifact watcher: {0}")]
    Watcher(#[from] vili_adapters::WatcherError),
    #[error("failed to bind the proxy listener: {0}")]
    Listener(#[from] vili_proxy::error::ProxyError),
    #[error("failed to start a slot at boot: {0}")]
    Controller(#[from] vili_engine::ControllerError),
    #[error("failed to resolve a startup source from the working directory: {0}")]
    Layout(#[from] vili_engine::LayoutError),
    #[error("no running instance could be started at boot")]
    NoRunningInstance,
}
