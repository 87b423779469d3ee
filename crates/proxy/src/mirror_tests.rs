// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tempfile::tempdir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use vili_adapters::{Archiver, NoOpNotifyAdapter};
use vili_core::{FakeClock, PortPool, RealFs, SlotKind};
use vili_engine::{layout, ControllerConfig, ControllerHandle, TestLauncher};

use super::*;

struct Harness {
    handle: ControllerHandle,
    _tempdir: tempfile::TempDir,
}

fn spawn_harness() -> Harness {
    let tempdir = tempdir().unwrap();
    let working_dir = tempdir.path().to_path_buf();
    std::fs::write(working_dir.join("foo.jar"), b"stub").unwrap();

    let fs = Arc::new(RealFs);
    let clock = FakeClock::new();
    let notifier = Arc::new(NoOpNotifyAdapter);
    let port_pool = Arc::new(PortPool::new(9100, 9110));
    let archiver = Arc::new(Archiver::new(working_dir.join("archive")));
    let cancel = CancellationToken::new();
    let launcher = Arc::new(TestLauncher { program: "sleep".to_string(), args: vec!["30".to_string()] });

    let config = ControllerConfig {
        working_dir: working_dir.clone(),
        identifier: "foo".to_string(),
        port_identifier: Some("server.port".to_string()),
        properties_file_name: None,
    };

    let handle = vili_engine::spawn(config, fs, notifier, clock, launcher, port_pool, archiver, cancel);
    Harness { handle, _tempdir: tempdir }
}

fn materialise_version(working_dir: &std::path::Path, version_name: &str) -> PathBuf {
    let fs = RealFs;
    layout::materialise_version(&fs, working_dir, "foo", &working_dir.join("foo.jar"), version_name).unwrap()
}

/// Bind a bare hyper server on `port` that answers every request with
/// `status`/`content_type`, regardless of method or path.
async fn spawn_stub_server(port: u16, status: StatusCode, content_type: &'static str) {
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { return };
            let io = TokioIo::new(stream);
            let service = service_fn(move |_req: Request<Incoming>| async move {
                Ok::<_, Infallible>(
                    Response::builder()
                        .status(status)
                        .header(hyper::header::CONTENT_TYPE, content_type)
                        .body(Full::new(Bytes::new()))
                        .unwrap(),
                )
            });
            tokio::spawn(hyper::server::conn::http1::Builder::new().serve_connection(io, service));
        }
    });
    // give the listener a moment to start accepting
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn matching_response_leaves_breaking_count_untouched() {
    let harness = spawn_harness();
    let running_version = materialise_version(&harness_working_dir(&harness), "foo-1");
    let testing_version = materialise_version(&harness_working_dir(&harness), "foo-2");
    harness.handle.start_existing(SlotKind::Running, running_version).await.unwrap();
    harness.handle.start_existing(SlotKind::Testing, testing_version).await.unwrap();

    let testing = harness.handle.testing_instance().unwrap();
    spawn_stub_server(testing.port, StatusCode::OK, "application/json").await;

    let cancel = CancellationToken::new();
    let client = forward::new_client();
    let tx = spawn_mirror_worker(harness.handle.clone(), client, "http".to_string(), "127.0.0.1".to_string(), cancel.clone());

    let job = MirrorJob {
        method: hyper::Method::GET,
        uri: "/health".parse().unwrap(),
        headers: hyper::HeaderMap::new(),
        body: Bytes::new(),
        trailers: None,
        running_summary: ResponseSummary { status: StatusCode::OK, content_type: Some("application/json".to_string()) },
    };
    tx.send(job).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(testing.counters.requests(), 1);
    assert_eq!(testing.counters.breaking(), 0);

    cancel.cancel();
    harness.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_endpoint_on_testing_increments_breaking_count() {
    let harness = spawn_harness();
    let running_version = materialise_version(&harness_working_dir(&harness), "foo-1");
    let testing_version = materialise_version(&harness_working_dir(&harness), "foo-2");
    harness.handle.start_existing(SlotKind::Running, running_version).await.unwrap();
    harness.handle.start_existing(SlotKind::Testing, testing_version).await.unwrap();

    let testing = harness.handle.testing_instance().unwrap();
    spawn_stub_server(testing.port, StatusCode::NOT_FOUND, "text/plain").await;

    let cancel = CancellationToken::new();
    let client = forward::new_client();
    let tx = spawn_mirror_worker(harness.handle.clone(), client, "http".to_string(), "127.0.0.1".to_string(), cancel.clone());

    let job = MirrorJob {
        method: hyper::Method::GET,
        uri: "/orders".parse().unwrap(),
        headers: hyper::HeaderMap::new(),
        body: Bytes::new(),
        trailers: None,
        running_summary: ResponseSummary { status: StatusCode::OK, content_type: Some("application/json".to_string()) },
    };
    tx.send(job).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(testing.counters.breaking(), 1);

    cancel.cancel();
    harness.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn no_testing_instance_is_a_silent_no_op() {
    let harness = spawn_harness();
    let running_version = materialise_version(&harness_working_dir(&harness), "foo-1");
    harness.handle.start_existing(SlotKind::Running, running_version).await.unwrap();

    let cancel = CancellationToken::new();
    let client = forward::new_client();
    let tx = spawn_mirror_worker(harness.handle.clone(), client, "http".to_string(), "127.0.0.1".to_string(), cancel.clone());

    let job = MirrorJob {
        method: hyper::Method::GET,
        uri: "/".parse().unwrap(),
        headers: hyper::HeaderMap::new(),
        body: Bytes::new(),
        trailers: None,
        running_summary: ResponseSummary { status: StatusCode::OK, content_type: None },
    };
    // no testing instance exists; the worker must not panic
    tx.send(job).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    cancel.cancel();
    harness.handle.shutdown().await.unwrap();
}

fn harness_working_dir(harness: &Harness) -> PathBuf {
    harness._tempdir.path().to_path_buf()
}
