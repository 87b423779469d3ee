// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port pool — ports drawn from a configured closed interval, checked out
//! atomically and returned on instance teardown.

use std::collections::VecDeque;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortPoolError {
    #[error("port pool exhausted")]
    Exhausted,
    #[error("port {0} is not on loan from this pool")]
    NotOnLoan(u16),
}

/// A fixed set of ports drawn from a closed interval `[low, high]`. Only
/// the controller touches this pool (spec §4 "Invariants"), so the
/// locking here is for interior mutability behind a shared reference, not
/// for arbitrating concurrent callers.
pub struct PortPool {
    free: Mutex<VecDeque<u16>>,
    on_loan: Mutex<std::collections::HashSet<u16>>,
}

impl PortPool {
    /// Build a pool covering the closed range `low..=high`, highest port
    /// acquired first (spec §8 scenario 1; the original pushed the range
    /// onto a `container/list` front-first so `Front()` always yielded
    /// the top of the range).
    pub fn new(low: u16, high: u16) -> Self {
        let free = (low..=high).rev().collect::<VecDeque<_>>();
        Self {
            free: Mutex::new(free),
            on_loan: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Parse a `"N-M"` range string (spec's `port_range` config format).
    pub fn from_range_str(range: &str) -> Option<Self> {
        let (low, high) = range.split_once('-')?;
        let low: u16 = low.trim().parse().ok()?;
        let high: u16 = high.trim().parse().ok()?;
        if low > high {
            return None;
        }
        Some(Self::new(low, high))
    }

    /// Check out the highest free port. Fails when the pool is empty.
    pub fn acquire(&self) -> Result<u16, PortPoolError> {
        let mut free = self.free.lock();
        let port = free.pop_front().ok_or(PortPoolError::Exhausted)?;
        self.on_loan.lock().insert(port);
        Ok(port)
    }

    /// Return a previously acquired port. Releasing a port not currently
    /// on loan is a programming error and is refused rather than silently
    /// accepted, so a double-release surfaces immediately instead of
    /// corrupting the free list with a duplicate entry.
    pub fn release(&self, port: u16) -> Result<(), PortPoolError> {
        let mut on_loan = self.on_loan.lock();
        if !on_loan.remove(&port) {
            return Err(PortPoolError::NotOnLoan(port));
        }
        self.free.lock().push_back(port);
        Ok(())
    }

    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    pub fn outstanding(&self) -> usize {
        self.on_loan.lock().len()
    }
}

#[cfg(test)]
#[path = "portpool_tests.rs"]
mod tests;
