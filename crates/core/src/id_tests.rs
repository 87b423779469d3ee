// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::slot::SlotKind;

#[test]
fn instance_id_displays_raw_string() {
    let id = InstanceId::new("1700000000_running");
    assert_eq!(id.to_string(), "1700000000_running");
    assert_eq!(id.as_str(), "1700000000_running");
}

#[test]
fn instance_id_for_slot_formats_timestamp_and_slot() {
    let id = InstanceId::for_slot(1700000000, SlotKind::Testing);
    assert_eq!(id, "1700000000_testing");
}

#[test]
fn version_name_equality_against_str() {
    let v = VersionName::new("app-1.2.3");
    assert_eq!(v, "app-1.2.3");
}
