use indoc::formatdoc;
use integration_tests::{MockDealpath, TestServer};
use reqwest::Method;
use serde_json::{Value, json};

#[tokio::test]
async fn initialize_returns_session_header() {
    let server = TestServer::start("").await;

    let response = server
        .rpc(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
        .await;

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("mcp-session-id"));

    let body: Value = response.json().await.unwrap();

    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["protocolVersion"], "2025-06-18");
    assert_eq!(body["result"]["serverInfo"]["name"], "dealpath-mcp");
}

#[tokio::test]
async fn tools_list_includes_static_and_generated_tools() {
    let server = TestServer::start("").await;
    let session = server.initialize(None).await;

    let body: Value = server
        .client
        .request(Method::POST, "/mcp")
        .header("mcp-session-id", &session)
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();

    for expected in ["get_deals", "get_deal", "search_deals", "get_file_by_id", "get_deal_files"] {
        assert!(names.contains(&expected), "{expected} missing from {names:?}");
    }
}

#[tokio::test]
async fn missing_required_argument() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(Some("session-key")).await;

    let body = server.call_tool(&session, "get_deal", json!({})).await;

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "code": 400,
        "message": "deal_id is required"
      },
      "id": 2,
      "jsonrpc": "2.0"
    }
    "#);

    assert!(dealpath.requests().is_empty());
}

#[tokio::test]
async fn session_credential_is_forwarded() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(Some("session-key")).await;

    let body = server.call_tool(&session, "get_deal", json!({ "deal_id": 12 })).await;

    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let deal: Value = serde_json::from_str(text).unwrap();

    assert_eq!(deal["deal"]["data"]["name"], "Deal 12 Tower");
    assert_eq!(dealpath.authorizations(), vec!["Bearer session-key"]);
    assert_eq!(dealpath.requests(), vec!["/deal/12"]);
}

#[tokio::test]
async fn header_credential_and_default_key() {
    let dealpath = MockDealpath::spawn().await;

    let config = formatdoc! {r#"
        {}
        api_key = "default-key"
    "#, dealpath.config_section()};

    let server = TestServer::start(&config).await;
    let call = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": "get_deal", "arguments": { "deal_id": "3" } },
    });

    let response = server
        .client
        .request(Method::POST, "/mcp")
        .header("X-Dealpath-Api-Key", "header-key")
        .json(&call)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    // Served from the cache, so the upstream sees only the first call.
    server.rpc(call).await;

    let call = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "get_deals", "arguments": { "status": "Active" } },
    });

    server.rpc(call).await;

    assert_eq!(dealpath.authorizations(), vec!["Bearer header-key", "Bearer default-key"]);
    assert_eq!(dealpath.requests(), vec!["/deal/3", "/deals?status=Active"]);
}

#[tokio::test]
async fn missing_credential() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(None).await;

    let body = server.call_tool(&session, "get_deals", json!({})).await;

    assert_eq!(body["error"]["code"], 401);
    assert!(dealpath.requests().is_empty());
}

#[tokio::test]
async fn upstream_status_becomes_error_code() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(Some("session-key")).await;

    let body = server.call_tool(&session, "get_deal", json!({ "deal_id": "404" })).await;

    assert_eq!(body["error"]["code"], 404);
}

#[tokio::test]
async fn parse_error() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(Method::POST, "/mcp")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();

    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn notifications_only_is_accepted() {
    let server = TestServer::start("").await;

    let response = server
        .rpc(json!([{"jsonrpc": "2.0", "method": "notifications/initialized"}]))
        .await;

    assert_eq!(response.status(), 202);
}

#[tokio::test]
async fn batch_keeps_request_order() {
    let server = TestServer::start("").await;

    let response = server
        .rpc(json!([
            {"jsonrpc": "2.0", "id": "a", "method": "ping"},
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "id": "b", "method": "does/not/exist"},
        ]))
        .await;

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    [
      {
        "id": "a",
        "jsonrpc": "2.0",
        "result": {
          "ok": true
        }
      },
      {
        "error": {
          "code": -32601,
          "message": "Method not found: does/not/exist"
        },
        "id": "b",
        "jsonrpc": "2.0"
      }
    ]
    "#);
}

#[tokio::test]
async fn required_sessions_reject_unknown_ids() {
    let config = indoc::indoc! {r#"
        [mcp.session]
        required = true
    "#};

    let server = TestServer::start(config).await;

    let body: Value = server
        .client
        .request(Method::POST, "/mcp")
        .header("mcp-session-id", "nope")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["error"]["code"], -32001);
}

#[tokio::test]
async fn deal_resource_and_prompt() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(Some("session-key")).await;

    let read = |id: u32, method: &str, params: Value| {
        server
            .client
            .request(Method::POST, "/mcp")
            .header("mcp-session-id", &session)
            .json(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .send()
    };

    let body: Value = read(1, "resources/read", json!({ "uri": "dealpath://deal/5.md" }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let contents = &body["result"]["contents"][0];

    assert_eq!(contents["mimeType"], "text/markdown");
    assert!(contents["text"].as_str().unwrap().starts_with("# Deal 5 Tower"));

    let body: Value = read(2, "prompts/get", json!({ "name": "deal_brief", "arguments": { "deal_id": "5" } }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let text = body["result"]["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("dealpath://deal/5.md"));
}
