// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_slot_has_no_occupant() {
    let slot: Slot<&'static str> = Slot::empty();
    assert!(slot.is_empty());
    assert!(slot.get().is_none());
}

#[test]
fn replace_clears_dying_bit_for_new_occupant() {
    let mut slot = Slot::empty();
    slot.replace("v1");
    slot.mark_dying();
    assert!(slot.is_dying());

    let old = slot.replace("v2");
    assert_eq!(old, Some("v1"));
    assert_eq!(slot.get(), Some(&"v2"));
    assert!(!slot.is_dying());
}

#[test]
fn take_empties_slot_and_clears_dying_bit() {
    let mut slot = Slot::empty();
    slot.replace("v1");
    slot.mark_dying();

    let taken = slot.take();
    assert_eq!(taken, Some("v1"));
    assert!(slot.is_empty());
    assert!(!slot.is_dying());
}
