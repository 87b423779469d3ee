// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine crate.

use std::path::PathBuf;

use thiserror::Error;
use vili_core::{FsError, PortPoolError, SlotKind};

/// Errors raised launching or tearing down a single child process.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("failed to spawn java -jar {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("spawned child exposed no pid")]
    NoPid,
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised materialising the on-disk layout for a version or instance.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("artifact path has no usable file name: {0}")]
    InvalidArtifactName(PathBuf),
}

/// Errors surfaced by the controller's command handlers. These never
/// indicate a panic-worthy bug; a failed command is reported to its
/// caller and the controller keeps serving.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("port pool error: {0}")]
    PortPool(#[from] PortPoolError),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("instance error: {0}")]
    Instance(#[from] InstanceError),
    #[error("{0:?} slot is empty")]
    SlotEmpty(SlotKind),
    #[error("controller command channel closed")]
    Closed,
}
