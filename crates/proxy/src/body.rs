// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single buffered body type both the server and client halves of the
//! proxy speak, carrying an already-known `Bytes` payload plus whatever
//! trailers accompanied it. Both request and response bodies are fully
//! collected before they're re-emitted (see `forward::send_request`),
//! so the proxy never needs more than one concrete body type.

use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::HeaderMap;

pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Box up a fully-buffered payload (and its optional trailers) as the one
/// body type used for every request/response the proxy constructs.
pub fn buffered(bytes: Bytes, trailers: Option<HeaderMap>) -> BoxBody<Bytes, StdError> {
    let body = Full::new(bytes).with_trailers(async move { trailers.map(Ok) });
    body.map_err(|never: Infallible| -> StdError { match never {} }).boxed()
}
