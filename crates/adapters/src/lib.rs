// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! vili-adapters: external I/O the core consumes through traits — the
//! log tailer, the artifact watcher, the zip archiver, the notifier, and
//! the whydah-authenticated remote control client.

pub mod archiver;
pub mod notify;
pub mod remote;
pub mod tailer;
pub mod watcher;
pub mod whydah;

pub use archiver::{Archiver, ArchiverError, MAX_ARCHIVE_BYTES};
pub use notify::{NoOpNotifyAdapter, NotifyAdapter, NotifyError, SlackNotifyAdapter};
pub use remote::{poll_remote_control, RemoteControlError, RemoteDirective, RemoteSlot};
pub use tailer::{parse_level, tail_file, LogLevel, TailerError};
pub use watcher::{is_adoptable, watch_artifacts, WatcherError};
pub use whydah::{WhydahClient, WhydahCredential, WhydahError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
