// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn summary(status: StatusCode, content_type: Option<&str>) -> ResponseSummary {
    ResponseSummary { status, content_type: content_type.map(str::to_string) }
}

#[test]
fn identical_status_codes_match_regardless_of_body() {
    let running = summary(StatusCode::OK, Some("application/json"));
    let testing = summary(StatusCode::OK, Some("text/plain"));
    assert_eq!(compare(&running, &testing), Comparison::Match);
}

#[test]
fn testing_404_plain_text_against_running_200_json_is_missing_endpoint() {
    let running = summary(StatusCode::OK, Some("application/json"));
    let testing = summary(StatusCode::NOT_FOUND, Some("text/plain"));
    assert_eq!(compare(&running, &testing), Comparison::MissingEndpoint);
}

#[test]
fn testing_404_html_against_running_200_is_missing_endpoint() {
    let running = summary(StatusCode::OK, Some("application/json"));
    let testing = summary(StatusCode::NOT_FOUND, Some("text/html; charset=utf-8"));
    assert_eq!(compare(&running, &testing), Comparison::MissingEndpoint);
}

#[test]
fn both_404_with_same_content_type_is_not_missing_endpoint() {
    let running = summary(StatusCode::NOT_FOUND, Some("text/plain"));
    let testing = summary(StatusCode::NOT_FOUND, Some("text/plain"));
    assert_eq!(compare(&running, &testing), Comparison::Match);
}

#[test]
fn testing_404_with_matching_content_type_is_not_missing_endpoint() {
    let running = summary(StatusCode::OK, Some("text/plain"));
    let testing = summary(StatusCode::NOT_FOUND, Some("text/plain"));
    assert_eq!(compare(&running, &testing), Comparison::OtherMismatch);
}

#[test]
fn other_status_mismatches_are_logged_not_breaking() {
    let running = summary(StatusCode::OK, Some("application/json"));
    let testing = summary(StatusCode::INTERNAL_SERVER_ERROR, Some("application/json"));
    assert_eq!(compare(&running, &testing), Comparison::OtherMismatch);
}

#[test]
fn running_404_is_never_missing_endpoint() {
    let running = summary(StatusCode::NOT_FOUND, Some("application/json"));
    let testing = summary(StatusCode::NOT_FOUND, Some("text/plain"));
    assert_eq!(compare(&running, &testing), Comparison::Match);
}

#[test]
fn mirror_safe_methods_are_get_put_patch_only() {
    assert!(is_mirror_safe(&hyper::Method::GET));
    assert!(is_mirror_safe(&hyper::Method::PUT));
    assert!(is_mirror_safe(&hyper::Method::PATCH));
    assert!(!is_mirror_safe(&hyper::Method::POST));
    assert!(!is_mirror_safe(&hyper::Method::DELETE));
}

#[test]
fn content_type_of_reads_the_header() {
    let mut headers = hyper::HeaderMap::new();
    headers.insert(hyper::header::CONTENT_TYPE, "application/json".parse().unwrap());
    assert_eq!(content_type_of(&headers), Some("application/json".to_string()));
}

#[test]
fn content_type_of_is_none_when_absent() {
    let headers = hyper::HeaderMap::new();
    assert_eq!(content_type_of(&headers), None);
}
