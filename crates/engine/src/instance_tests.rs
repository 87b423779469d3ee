// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::{Duration, Instant};

use tempfile::tempdir;
use vili_core::SlotKind;

use super::*;

fn config(instance_dir: std::path::PathBuf) -> InstanceConfig {
    InstanceConfig {
        id: vili_core::InstanceId::new("1700000000_running"),
        slot: SlotKind::Running,
        instance_dir,
        identifier: "foo".to_string(),
        port: 9000,
        port_identifier: Some("server.port".to_string()),
        has_properties_file: false,
    }
}

#[tokio::test]
async fn spawn_records_pid_and_becomes_ready() {
    let dir = tempdir().unwrap();
    let instance = Instance::spawn_with_program(config(dir.path().to_path_buf()), "sleep", vec!["5".to_string()])
        .await
        .unwrap();

    assert_eq!(instance.state(), LifecycleState::Ready);
    assert!(instance.is_running());

    let pid_contents = std::fs::read_to_string(dir.path().join("pid")).unwrap();
    assert_eq!(pid_contents.trim().parse::<i32>().unwrap(), instance.pid);

    assert!(dir.path().join("stdOut").exists());
    assert!(dir.path().join("stdErr").exists());

    instance.kill().await;
}

#[tokio::test]
async fn kill_is_idempotent_and_reaps_the_child() {
    let dir = tempdir().unwrap();
    let instance = Instance::spawn_with_program(config(dir.path().to_path_buf()), "sleep", vec!["30".to_string()])
        .await
        .unwrap();

    instance.kill().await;
    assert_eq!(instance.state(), LifecycleState::Dead);
    assert!(!instance.is_running());

    // second call must not panic or hang
    instance.kill().await;
    assert_eq!(instance.state(), LifecycleState::Dead);
}

#[tokio::test]
async fn is_running_false_once_child_exits_on_its_own() {
    let dir = tempdir().unwrap();
    let instance = Instance::spawn_with_program(config(dir.path().to_path_buf()), "true", vec![])
        .await
        .unwrap();

    // give the already-exited child a moment to be reaped by the OS
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!instance.is_running());

    instance.kill().await;
}

#[tokio::test]
async fn measurement_elapsed_tracks_stamped_window() {
    let dir = tempdir().unwrap();
    let instance = Instance::spawn_with_program(config(dir.path().to_path_buf()), "sleep", vec!["5".to_string()])
        .await
        .unwrap();

    assert!(instance.measurement_elapsed(Instant::now()).is_none());

    let start = Instant::now();
    instance.reset_measurement(start);
    let later = start + Duration::from_secs(90);
    assert_eq!(instance.measurement_elapsed(later), Some(Duration::from_secs(90)));

    instance.kill().await;
}
