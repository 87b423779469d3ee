// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log tailer — follows a file that may be rotated or recreated,
//! streaming newly appended lines on a bounded channel. Grounded on the
//! original `tail.File` inotify loop: watch the containing directory for
//! `MOVED_FROM`/`CREATE` of the target basename, and the file itself for
//! `MODIFY`, reopening at offset 0 whenever the file is replaced or
//! truncated.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lines are buffered at least 20-deep, matching the original channel
/// capacity, so a burst of log lines never blocks the writer waiting on a
/// slow consumer.
pub const LINE_BUFFER: usize = 20;

#[derive(Debug, Error)]
pub enum TailerError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

struct OpenFile {
    reader: BufReader<std::fs::File>,
    read_so_far: u64,
}

impl OpenFile {
    fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self { reader: BufReader::new(std::fs::File::open(path)?), read_so_far: 0 })
    }

    /// Drain whatever is newly available, returning each complete line.
    /// A final unterminated line is held back until a newline arrives.
    fn drain(&mut self) -> std::io::Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        loop {
            let mut buf = Vec::new();
            let n = self.reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            if buf.last() != Some(&b'\n') {
                // Incomplete line: rewind so the next drain re-reads it
                // once more data (and the newline) has arrived.
                self.reader.seek_relative(-(buf.len() as i64))?;
                break;
            }
            self.read_so_far += buf.len() as u64;
            lines.push(buf);
        }
        Ok(lines)
    }

    fn is_truncated(&self, path: &Path) -> bool {
        let Ok(meta) = std::fs::metadata(path) else { return false };
        meta.len() < self.read_so_far
    }
}

/// Start tailing `path`. Returns a receiver of raw (newline-stripped-free)
/// line bytes; the background task exits and drops the sender when
/// `cancel` fires.
pub fn tail_file(path: PathBuf, cancel: CancellationToken) -> Result<mpsc::Receiver<Vec<u8>>, TailerError> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let target = path.clone();

    let (fs_tx, mut fs_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = fs_tx.send(event);
            }
        })
        .map_err(|source| TailerError::Watch { path: dir.clone(), source })?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|source| TailerError::Watch { path: dir.clone(), source })?;

    tokio::spawn(async move {
        let _watcher = watcher;
        let mut open = OpenFile::open(&target).ok();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(path = %target.display(), "tailer cancelled");
                    return;
                }
                event = fs_rx.recv() => {
                    let Some(event) = event else { return };
                    if !event.paths.iter().any(|p| p == &target) {
                        continue;
                    }
                    match event.kind {
                        EventKind::Remove(RemoveKind::File) => {
                            open = None;
                        }
                        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                            open = None;
                        }
                        EventKind::Create(CreateKind::File) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                            open = OpenFile::open(&target).ok();
                        }
                        EventKind::Modify(_) => {
                            let Some(file) = open.as_mut() else {
                                open = OpenFile::open(&target).ok();
                                continue;
                            };
                            if file.is_truncated(&target) {
                                open = OpenFile::open(&target).ok();
                                continue;
                            }
                            match file.drain() {
                                Ok(lines) => {
                                    for line in lines {
                                        if tx.send(line).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, path = %target.display(), "tailer read error");
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    });

    Ok(rx)
}

/// A parsed structured log line: `{"level": "WARN", ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Error,
    Other,
}

/// Parse a line's `level` field. Unparseable lines or levels other than
/// `WARN`/`ERROR` are [`LogLevel::Other`] and never affect counters.
pub fn parse_level(line: &[u8]) -> LogLevel {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(line) else {
        return LogLevel::Other;
    };
    match value.get("level").and_then(|v| v.as_str()) {
        Some("WARN") => LogLevel::Warn,
        Some("ERROR") => LogLevel::Error,
        _ => LogLevel::Other,
    }
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
