// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot and lifecycle state — the two named holders (`running`, `testing`)
//! a controller mutates, and the per-instance state machine each holder
//! cycles through.

use std::fmt;

/// Which of the two slots an instance occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SlotKind {
    Running,
    Testing,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Running => "running",
            SlotKind::Testing => "testing",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-instance lifecycle state. Transitions: Starting -> Ready -> Dying -> Dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LifecycleState {
    Starting,
    Ready,
    Dying,
    Dead,
}

/// A slot holds at most one instance of type `T`, plus the `isDying` bit
/// that gates Deploy/Restart thrash per spec.md §4.5.
///
/// `T` is generic so `vili-core` can describe the slot shape without
/// depending on `vili-engine`'s concrete `Instance` type.
#[derive(Debug, Default)]
pub struct Slot<T> {
    occupant: Option<T>,
    is_dying: bool,
}

impl<T> Slot<T> {
    pub fn empty() -> Self {
        Self {
            occupant: None,
            is_dying: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn get(&self) -> Option<&T> {
        self.occupant.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.occupant.as_mut()
    }

    pub fn is_dying(&self) -> bool {
        self.is_dying
    }

    pub fn mark_dying(&mut self) {
        self.is_dying = true;
    }

    /// Replace the occupant, returning whatever was there before and
    /// clearing the `isDying` bit for the new occupant.
    pub fn replace(&mut self, occupant: T) -> Option<T> {
        self.is_dying = false;
        self.occupant.replace(occupant)
    }

    /// Remove and return the occupant, if any.
    pub fn take(&mut self) -> Option<T> {
        self.is_dying = false;
        self.occupant.take()
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
