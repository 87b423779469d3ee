// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn noop_notify_always_succeeds() {
    let adapter = NoOpNotifyAdapter::new();
    adapter.notify("foo-2 promoted to running").await.unwrap();
}
