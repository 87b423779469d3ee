// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vili-proxy: the client-facing HTTP reverse proxy. Forwards every
//! request to *running*, streams the response back, and — for
//! idempotent methods — replays the original request against *testing*
//! on a background worker that never adds client-visible latency
//! (spec §4.6).
//!
//! Built directly on `hyper` + `hyper-util`: a bare `TcpListener` accept
//! loop feeding `hyper::server::conn::http1`, and
//! `hyper_util::client::legacy::Client` for both the forward and mirror
//! hops. Vili has no routing or JSON surface of its own, so a router
//! crate would add a layer with nothing to route.

pub mod body;
pub mod compare;
pub mod error;
pub mod forward;
pub mod mirror;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use vili_engine::ControllerHandle;

use crate::body::{buffered, StdError};
use crate::compare::{content_type_of, is_mirror_safe, ResponseSummary};
use crate::error::ProxyError;
use crate::forward::HttpClient;
use crate::mirror::MirrorJob;

/// Header buffer cap the server enforces per connection (spec §6: "header
/// cap is 1 MiB").
pub const HEADER_CAP_BYTES: usize = 1024 * 1024;
/// Read/write timeout applied to the lifetime of one connection (spec §5:
/// "HTTP server read/write timeouts are 10 s").
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
/// How often reliability is re-evaluated even absent mirrored traffic
/// (spec §4.5: "invoked ... after each mirrored request (and
/// periodically)").
pub const RELIABILITY_TICK: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub scheme: String,
    pub endpoint: String,
    pub listen_port: u16,
}

/// The reverse proxy. Cheap to clone (everything behind an `Arc`
/// internally or already-`Clone` handles), so each accepted connection
/// gets its own handle into the same controller, client, and mirror
/// queue.
pub struct Proxy {
    config: ProxyConfig,
    controller: ControllerHandle,
    client: HttpClient,
    mirror_tx: tokio::sync::mpsc::Sender<MirrorJob>,
}

impl Proxy {
    /// Build a proxy and spawn its mirror worker and periodic
    /// reliability ticker. Does not bind a listener yet; call
    /// [`Proxy::serve`] for that.
    pub fn new(config: ProxyConfig, controller: ControllerHandle, cancel: CancellationToken) -> Arc<Self> {
        let client = forward::new_client();
        let mirror_tx =
            mirror::spawn_mirror_worker(controller.clone(), client.clone(), config.scheme.clone(), config.endpoint.clone(), cancel.clone());
        spawn_reliability_ticker(controller.clone(), cancel);
        Arc::new(Self { config, controller, client, mirror_tx })
    }

    /// Bind the listener and accept connections until `cancel` fires.
    pub async fn serve(self: Arc<Self>, cancel: CancellationToken) -> Result<(), ProxyError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.listen_port));
        let listener = TcpListener::bind(addr).await.map_err(|source| ProxyError::Bind { addr, source })?;
        tracing::info!(%addr, "proxy listening");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, _peer) = accepted.map_err(ProxyError::Accept)?;
                    let proxy = self.clone();
                    tokio::spawn(proxy.serve_connection(stream));
                }
            }
        }
    }

    async fn serve_connection(self: Arc<Self>, stream: tokio::net::TcpStream) {
        let io = TokioIo::new(stream);
        let proxy = self.clone();
        let service = service_fn(move |req| {
            let proxy = proxy.clone();
            async move { proxy.handle(req).await }
        });

        let conn = hyper::server::conn::http1::Builder::new().max_buf_size(HEADER_CAP_BYTES).serve_connection(io, service);

        if tokio::time::timeout(CONNECTION_TIMEOUT, conn).await.is_err() {
            tracing::debug!("connection exceeded read/write timeout, dropping");
        }
    }

    /// Top-level per-request entry point. Never fails: transport and
    /// upstream errors become a synthesised non-2xx response rather than
    /// propagating out of the connection future (spec §7: "the proxy
    /// reports a proxy error upstream to the client").
    async fn handle(&self, req: Request<Incoming>) -> Result<Response<BoxBody<Bytes, StdError>>, std::convert::Infallible> {
        match self.forward(req).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                tracing::warn!(error = %e, "forward to running failed");
                Ok(bad_gateway())
            }
        }
    }

    async fn forward(&self, req: Request<Incoming>) -> Result<Response<BoxBody<Bytes, StdError>>, ProxyError> {
        let (parts, body) = req.into_parts();
        let (body_bytes, trailers) = forward::collect_body(body).await?;

        let running = self.controller.running_instance().ok_or(ProxyError::NoRunningInstance)?;

        let result = forward::send_request(
            &self.client,
            &self.config.scheme,
            &self.config.endpoint,
            running.port,
            &parts.method,
            &parts.uri,
            &parts.headers,
            body_bytes.clone(),
            trailers.clone(),
        )
        .await;

        let upstream = match result {
            Ok(resp) => resp,
            Err(e) => {
                if !running.is_running() {
                    let controller = self.controller.clone();
                    tokio::spawn(async move {
                        let _ = controller.restart(vili_core::SlotKind::Running).await;
                    });
                }
                return Err(e);
            }
        };

        // Client-visible latency is independent of mirroring: the
        // response is fully assembled and handed back to hyper before
        // the mirror job is ever enqueued (spec §5, §8 invariant 6).
        let (resp_parts, resp_body) = upstream.into_parts();
        let (resp_bytes, resp_trailers) = forward::collect_body(resp_body).await?;
        let running_summary = ResponseSummary { status: resp_parts.status, content_type: content_type_of(&resp_parts.headers) };

        running.counters.record_request();

        if is_mirror_safe(&parts.method) && self.controller.testing_instance().is_some() {
            let job = MirrorJob {
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                headers: parts.headers.clone(),
                body: body_bytes,
                trailers,
                running_summary: running_summary.clone(),
            };
            let tx = self.mirror_tx.clone();
            tokio::spawn(async move {
                if tx.try_send(job).is_err() {
                    tracing::warn!("mirror channel full, dropping a mirrored request");
                }
            });
        }

        let mut builder = Response::builder().status(resp_parts.status);
        for (name, value) in resp_parts.headers.iter() {
            builder = builder.header(name, value);
        }
        builder.body(buffered(resp_bytes, resp_trailers)).map_err(ProxyError::BuildRequest)
    }
}

fn bad_gateway() -> Response<BoxBody<Bytes, StdError>> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .body(buffered(Bytes::new(), None))
        .unwrap_or_else(|_| Response::new(buffered(Bytes::new(), None)))
}

fn spawn_reliability_ticker(controller: ControllerHandle, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RELIABILITY_TICK);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = interval.tick() => {
                    let _ = controller.evaluate_reliability().await;
                }
            }
        }
    });
}
