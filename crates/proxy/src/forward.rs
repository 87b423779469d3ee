// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream request construction and dispatch, shared by the live
//! forward-to-running path and the mirror-to-testing path.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming;
use hyper::header::{self, HeaderMap};
use hyper::{Method, Request, Response, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;

use crate::body::{buffered, StdError};
use crate::error::ProxyError;

/// Upstream calls are internal, same-host hops; ten seconds is generous
/// for a JVM instance that hasn't wedged.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

pub type HttpClient = Client<HttpConnector, BoxBody<Bytes, StdError>>;

pub fn new_client() -> HttpClient {
    Client::builder(hyper_util::rt::TokioExecutor::new()).build_http()
}

/// Send `method uri` (with `headers`/`body`/`trailers` carried over
/// verbatim, including `Host`) to `scheme://endpoint:port`, forcing
/// `Connection: close` the way the original always dialled a fresh
/// connection per hop.
#[allow(clippy::too_many_arguments)]
pub async fn send_request(
    client: &HttpClient,
    scheme: &str,
    endpoint: &str,
    port: u16,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
    trailers: Option<HeaderMap>,
) -> Result<Response<Incoming>, ProxyError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target: Uri = format!("{scheme}://{endpoint}:{port}{path_and_query}").parse()?;

    let mut builder = Request::builder().method(method.clone()).uri(target.clone());
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder = builder.header(header::CONNECTION, "close");

    let request = builder.body(buffered(body, trailers)).map_err(ProxyError::BuildRequest)?;

    match tokio::time::timeout(UPSTREAM_TIMEOUT, client.request(request)).await {
        Ok(result) => result.map_err(ProxyError::Send),
        Err(_) => Err(ProxyError::Timeout),
    }
}

/// Buffer an incoming body down to `(Bytes, trailers)`. Both the live
/// forward path and the mirror replay need the body intact, and a
/// streaming `Incoming` can only be drained once — so the first reader
/// always collects it fully rather than trying to tee the stream.
pub async fn collect_body(body: Incoming) -> Result<(Bytes, Option<HeaderMap>), ProxyError> {
    use http_body_util::BodyExt;

    let collected = body.collect().await.map_err(ProxyError::ReadBody)?;
    let trailers = collected.trailers().cloned();
    Ok((collected.to_bytes(), trailers))
}
