// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_notify_records_calls_in_order() {
    let adapter = FakeNotifyAdapter::new();
    adapter.notify("first").await.unwrap();
    adapter.notify("second").await.unwrap();

    let calls = adapter.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].message, "first");
    assert_eq!(calls[1].message, "second");
}

#[tokio::test]
async fn fake_notify_clones_share_recorded_calls() {
    let adapter = FakeNotifyAdapter::new();
    let clone = adapter.clone();
    clone.notify("via clone").await.unwrap();
    assert_eq!(adapter.calls().len(), 1);
}
