// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic request counters and the reliability score derived from them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-instance traffic counters, updated from the proxy's mirror path as
/// responses come back. All four counters only ever increase; `reset`
/// replaces them wholesale rather than decrementing, so a caller holding an
/// `Arc<Counters>` from before a reset still observes a consistent (if
/// stale) snapshot instead of a value mutating underneath it mid-read.
#[derive(Debug, Default)]
pub struct Counters {
    requests: AtomicU64,
    warnings: AtomicU64,
    errors: AtomicU64,
    breaking: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_breaking(&self) {
        self.breaking.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn breaking(&self) -> u64 {
        self.breaking.load(Ordering::Relaxed)
    }

    /// Zero every counter. Used when an instance's measurement window
    /// restarts (e.g. a testing instance is promoted and starts a fresh
    /// `running` window).
    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.breaking.store(0, Ordering::Relaxed);
    }

    /// Reliability score: `log2(max(1, requests - (100*breaking + 10*errors + warnings)))`.
    ///
    /// Breaking changes are weighted 100x and errors 10x relative to plain
    /// warnings, so a handful of breaking responses swamp a large request
    /// count. The `max(1, ..)` floor keeps the log from going negative or
    /// NaN when the penalty exceeds the request count.
    pub fn score(&self) -> f64 {
        let requests = self.requests() as i64;
        let penalty = 100 * self.breaking() as i64 + 10 * self.errors() as i64 + self.warnings() as i64;
        let remaining = std::cmp::max(1, requests - penalty);
        (remaining as f64).log2()
    }
}

#[cfg(test)]
#[path = "counters_tests.rs"]
mod tests;
