// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirror worker — replays a safe request against *testing* after the
//! client has already received its response from *running*, compares
//! the two responses, and updates *testing*'s counters. Runs on its own
//! task reading from a bounded channel (capacity 10, spec §4.6), so a
//! burst of mirrored traffic never competes with the client-facing
//! forward path for a thread.

use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use vili_core::SlotKind;
use vili_engine::ControllerHandle;

use crate::compare::{self, Comparison, ResponseSummary};
use crate::forward::{self, HttpClient};

/// Capacity of the mirror job channel (spec §4.6: "buffered channel,
/// capacity 10").
pub const MIRROR_CHANNEL_CAPACITY: usize = 10;

/// One client request replayed against *testing*, carrying everything
/// the worker needs to redo the call and compare it against what
/// *running* already answered.
pub struct MirrorJob {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub trailers: Option<HeaderMap>,
    pub running_summary: ResponseSummary,
}

/// Spawn the mirror worker task and return the sender client handlers
/// enqueue onto. The worker exits once `cancel` fires.
pub fn spawn_mirror_worker(
    controller: ControllerHandle,
    client: HttpClient,
    scheme: String,
    endpoint: String,
    cancel: CancellationToken,
) -> mpsc::Sender<MirrorJob> {
    let (tx, mut rx) = mpsc::channel(MIRROR_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                job = rx.recv() => {
                    let Some(job) = job else { return };
                    process_job(&controller, &client, &scheme, &endpoint, job).await;
                }
            }
        }
    });

    tx
}

async fn process_job(controller: &ControllerHandle, client: &HttpClient, scheme: &str, endpoint: &str, job: MirrorJob) {
    let Some(testing) = controller.testing_instance() else {
        // Testing was torn down (e.g. promoted) between enqueue and
        // processing; nothing to compare against.
        return;
    };

    let result =
        forward::send_request(client, scheme, endpoint, testing.port, &job.method, &job.uri, &job.headers, job.body, job.trailers)
            .await;

    match result {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            let summary = ResponseSummary { status: parts.status, content_type: compare::content_type_of(&parts.headers) };
            // Body content is never compared (spec §4.6); drain it so the
            // connection is released back to the client pool.
            let _ = forward::collect_body(body).await;

            testing.counters.record_request();
            match compare::compare(&job.running_summary, &summary) {
                Comparison::Match => {}
                Comparison::MissingEndpoint => {
                    tracing::warn!(status = %summary.status, "mirror: testing is missing an endpoint running serves");
                    testing.counters.record_breaking();
                }
                Comparison::OtherMismatch => {
                    tracing::info!(
                        running_status = %job.running_summary.status,
                        testing_status = %summary.status,
                        "mirror: response status mismatch"
                    );
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "mirror request to testing failed");
            if !testing.is_running() {
                let _ = controller.restart(SlotKind::Testing).await;
            }
        }
    }

    // Reliability is (re-)evaluated after every mirrored request, in
    // addition to the periodic tick (spec §4.5).
    let _ = controller.evaluate_reliability().await;
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
