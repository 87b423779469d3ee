// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no running instance to forward to")]
    NoRunningInstance,
    #[error("no testing instance to mirror to")]
    NoTestingInstance,
    #[error("failed to read request body: {0}")]
    ReadBody(hyper::Error),
    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] hyper::http::uri::InvalidUri),
    #[error("failed to build upstream request: {0}")]
    BuildRequest(hyper::http::Error),
    #[error("upstream request failed: {0}")]
    Send(hyper_util::client::legacy::Error),
    #[error("upstream request timed out")]
    Timeout,
    #[error("failed to bind listener on {addr}: {source}")]
    Bind { addr: std::net::SocketAddr, #[source] source: std::io::Error },
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),
}
