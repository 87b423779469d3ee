// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use yare::parameterized;

use super::*;

#[parameterized(
    fresh_artifact = { "foo-2.jar", "foo", None, true },
    case_insensitive_suffix = { "FOO-2.JAR", "foo", None, true },
    wrong_prefix = { "bar-2.jar", "foo", None, false },
    wrong_suffix = { "foo-2.war", "foo", None, false },
    sentinel_excluded = { "foo.jar", "foo", None, false },
    matches_current_running = { "foo-2.jar", "foo", Some("foo-2.jar"), false },
)]
fn adoptability_filter(name: &str, identifier: &str, current_running: Option<&str>, expected: bool) {
    assert_eq!(is_adoptable(name, identifier, current_running), expected);
}

#[tokio::test]
async fn watch_artifacts_reports_new_jar_after_settle_delay() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();

    let mut rx = watch_artifacts(
        dir.path().to_path_buf(),
        "foo".to_string(),
        || None,
        cancel.clone(),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(dir.path().join("foo-2.jar"), b"binary").unwrap();

    let reported = tokio::time::timeout(SETTLE_DELAY + Duration::from_secs(5), rx.recv())
        .await
        .expect("artifact not reported in time")
        .expect("channel closed");

    assert_eq!(reported, dir.path().join("foo-2.jar"));
    cancel.cancel();
}

#[tokio::test]
async fn watch_artifacts_ignores_sentinel_and_non_jar_files() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();

    let mut rx = watch_artifacts(
        dir.path().to_path_buf(),
        "foo".to_string(),
        || None,
        cancel.clone(),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(dir.path().join("foo.jar"), b"binary").unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"notes").unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
    assert!(result.is_err(), "no artifact should have been reported");
    cancel.cancel();
}
