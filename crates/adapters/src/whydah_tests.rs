// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credential(whydah_uri: String) -> WhydahCredential {
    WhydahCredential {
        whydah_uri,
        application_id: "app-id".into(),
        application_name: "vili".into(),
        application_secret: "shh".into(),
    }
}

#[tokio::test]
async fn post_auth_logs_on_then_attaches_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokenservice/logon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "applicationtokenID": "token-123"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/slack/api/message"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = WhydahClient::new(reqwest::Client::new(), credential(server.uri()));
    client
        .post_auth(&format!("{}/slack/api/message", server.uri()), &serde_json::json!({"message": "hi"}))
        .await
        .unwrap();

    assert_eq!(client.cached_token().as_deref(), Some("token-123"));
}

#[tokio::test]
async fn post_auth_reuses_cached_token_without_relogging_on() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokenservice/logon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "applicationtokenID": "token-abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/slack/api/message"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = WhydahClient::new(reqwest::Client::new(), credential(server.uri()));
    let uri = format!("{}/slack/api/message", server.uri());
    client.post_auth(&uri, &serde_json::json!({"message": "one"})).await.unwrap();
    client.post_auth(&uri, &serde_json::json!({"message": "two"})).await.unwrap();
}

#[tokio::test]
async fn post_auth_relogs_on_after_401() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokenservice/logon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "applicationtokenID": "stale-token"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tokenservice/logon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "applicationtokenID": "fresh-token"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/slack/api/message"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/slack/api/message"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = WhydahClient::new(reqwest::Client::new(), credential(server.uri()));
    let uri = format!("{}/slack/api/message", server.uri());
    client.post_auth(&uri, &serde_json::json!({"message": "hi"})).await.unwrap();

    assert_eq!(client.cached_token().as_deref(), Some("fresh-token"));
}
