// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact watcher — watches the working directory for newly-dropped
//! `.jar` artifacts and, after a settle delay, dispatches an adoption
//! event. Filtering rules per spec §4.7: lowercase basename must end in
//! `.jar`, start with the configured identifier, and be neither the
//! `<identifier>.jar` sentinel nor the name of the currently running
//! version.

use std::path::PathBuf;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How long a freshly-seen artifact is left alone before being reported,
/// giving a slow upload time to finish writing the file.
pub const SETTLE_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Returns `true` if `name` (a file's basename) should be treated as a
/// newly-dropped artifact worth adopting.
pub fn is_adoptable(name: &str, identifier: &str, current_running: Option<&str>) -> bool {
    let lower = name.to_lowercase();
    if !lower.ends_with(".jar") {
        return false;
    }
    if !lower.starts_with(&identifier.to_lowercase()) {
        return false;
    }
    let sentinel = format!("{}.jar", identifier.to_lowercase());
    if lower == sentinel {
        return false;
    }
    if let Some(current) = current_running {
        if lower == current.to_lowercase() {
            return false;
        }
    }
    true
}

/// Start watching `working_dir` for new artifacts. `current_running` is
/// read fresh for every event via the provided closure, so the watcher
/// always compares against the live value rather than a snapshot taken at
/// start time.
pub fn watch_artifacts(
    working_dir: PathBuf,
    identifier: String,
    current_running: impl Fn() -> Option<String> + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Result<mpsc::Receiver<PathBuf>, WatcherError> {
    let (out_tx, out_rx) = mpsc::channel(20);
    let (fs_tx, mut fs_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = fs_tx.send(event);
            }
        })
        .map_err(|source| WatcherError::Watch { path: working_dir.clone(), source })?;
    watcher
        .watch(&working_dir, RecursiveMode::NonRecursive)
        .map_err(|source| WatcherError::Watch { path: working_dir.clone(), source })?;

    tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                event = fs_rx.recv() => {
                    let Some(event) = event else { return };
                    if !matches!(event.kind, EventKind::Create(_)) {
                        continue;
                    }
                    for path in event.paths {
                        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
                        if !is_adoptable(name, &identifier, current_running().as_deref()) {
                            continue;
                        }
                        let out_tx = out_tx.clone();
                        let cancel = cancel.clone();
                        let path = path.clone();
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = cancel.cancelled() => {}
                                _ = tokio::time::sleep(SETTLE_DELAY) => {
                                    let _ = out_tx.send(path).await;
                                }
                            }
                        });
                    }
                }
            }
        }
    });

    Ok(out_rx)
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
