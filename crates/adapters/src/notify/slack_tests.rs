// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::whydah::WhydahCredential;

#[tokio::test]
async fn notify_formats_message_with_icons_and_posts_through_whydah() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokenservice/logon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "applicationtokenID": "token-xyz"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/slack/api/message"))
        .and(body_partial_json(serde_json::json!({
            "recepientId": "#vili-alerts",
            "message": "🚀[🟢prod-vili]foo-2 promoted to running",
            "pinned": false,
        })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let whydah = Arc::new(WhydahClient::new(
        reqwest::Client::new(),
        WhydahCredential {
            whydah_uri: server.uri(),
            application_id: "app".into(),
            application_name: "vili".into(),
            application_secret: "secret".into(),
        },
    ));

    let adapter = SlackNotifyAdapter::new(
        whydah,
        server.uri(),
        "#vili-alerts",
        "🚀",
        "🟢",
        "prod",
        "vili",
    );

    adapter.notify("foo-2 promoted to running").await.unwrap();
}
