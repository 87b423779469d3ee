// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response comparison for the mirror path. Pure and synchronous so it
//! can be unit tested without a live pair of instances.

use hyper::{HeaderMap, Method, StatusCode};

/// Methods the mirror path treats as safe to re-execute against
/// *testing* (spec §4.6). `PUT`/`PATCH` are included on the assumption
/// that the target application is idempotent per request — an operator
/// contract, not an invariant this crate can enforce (spec §9).
pub fn is_mirror_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::PUT | Method::PATCH)
}

/// Extract the `content-type` header as an owned string, if present and
/// valid UTF-8.
pub fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers.get(hyper::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// The slice of a response the comparison cares about. Body content is
/// never compared (spec §4.6).
#[derive(Debug, Clone)]
pub struct ResponseSummary {
    pub status: StatusCode,
    pub content_type: Option<String>,
}

/// Outcome of comparing a running response against its mirrored testing
/// counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Match,
    MissingEndpoint,
    OtherMismatch,
}

pub fn compare(running: &ResponseSummary, testing: &ResponseSummary) -> Comparison {
    if running.status == testing.status {
        return Comparison::Match;
    }

    let testing_is_plain_error_page = testing
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("text/plain") || ct.starts_with("text/html"));

    if testing.status == StatusCode::NOT_FOUND
        && running.status != StatusCode::NOT_FOUND
        && testing_is_plain_error_page
        && testing.content_type != running.content_type
    {
        return Comparison::MissingEndpoint;
    }

    Comparison::OtherMismatch
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
