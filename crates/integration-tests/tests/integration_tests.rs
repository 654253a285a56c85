mod auth;
mod files;
mod legacy;
mod protocol;

use indoc::indoc;
use integration_tests::{MockDealpath, TestServer};
use serde_json::{Value, json};

#[tokio::test]
async fn mcp_endpoint_info() {
    let server = TestServer::start("").await;

    let response = server.client.get("/mcp").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "message": "Dealpath MCP HTTP endpoint",
      "ok": true,
      "protocolVersion": "2025-06-18"
    }
    "#);
}

#[tokio::test]
async fn health_endpoint_enabled_by_default() {
    let server = TestServer::start("").await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"status":"healthy"}"#);

    let response = server.client.get("/health/live").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"status":"alive"}"#);
}

#[tokio::test]
async fn health_endpoint_disabled() {
    let config = indoc! {r#"
        [server.health]
        enabled = false
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn health_endpoint_custom_path() {
    let config = indoc! {r#"
        [server.health]
        enabled = true
        path = "/status"
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/status").await;
    assert_eq!(response.status(), 200);

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn readiness_reports_checks() {
    let server = TestServer::start("").await;

    let response = server.client.get("/health/ready").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "checks": {
        "storage": true,
        "tools": true
      },
      "status": "ready"
    }
    "#);
}

#[tokio::test]
async fn version_endpoint() {
    let server = TestServer::start("").await;

    let body: Value = server.client.get("/version").await.json().await.unwrap();

    assert_eq!(body["name"], "dealpath-mcp");
    assert_eq!(body["protocolVersion"], "2025-06-18");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn metrics_count_sessions_and_tool_calls() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;

    let session = server.initialize(Some("session-key")).await;
    server.call_tool(&session, "get_deal", json!({ "deal_id": "7" })).await;
    server.call_tool(&session, "get_deal", json!({ "deal_id": "404" })).await;

    let body: Value = server.client.get("/metrics").await.json().await.unwrap();

    assert_eq!(body["sessions"], 1);
    assert_eq!(body["tools"]["get_deal"]["calls"], 2);
    assert_eq!(body["tools"]["get_deal"]["errors"], 1);
    assert!(body["uptimeSeconds"].is_u64());
}
