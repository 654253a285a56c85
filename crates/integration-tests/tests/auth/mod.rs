use indoc::indoc;
use integration_tests::TestServer;
use reqwest::Method;
use serde_json::{Value, json};

const CONFIG: &str = indoc! {r#"
    [server.auth]
    token = "s3cret"
    allowed_origins = ["http://localhost:3000"]
"#};

fn ping() -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let server = TestServer::start(CONFIG).await;

    let response = server.rpc(ping()).await;

    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "code": "unauthorized",
        "message": "Missing or invalid bearer token."
      }
    }
    "#);
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let server = TestServer::start(CONFIG).await;

    let response = server
        .client
        .request(Method::POST, "/mcp")
        .bearer_auth("wrong")
        .json(&ping())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn valid_token_is_accepted() {
    let server = TestServer::start(CONFIG).await;

    let response = server
        .client
        .request(Method::POST, "/mcp")
        .bearer_auth("s3cret")
        .header("origin", "http://localhost:3000")
        .json(&ping())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn foreign_origin_is_forbidden_before_token_check() {
    let server = TestServer::start(CONFIG).await;

    let response = server
        .client
        .request(Method::POST, "/mcp")
        .header("origin", "https://evil.example")
        .json(&ping())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "forbidden_origin");
}

#[tokio::test]
async fn get_probe_stays_open() {
    let server = TestServer::start(CONFIG).await;

    let response = server.client.get("/mcp").await;
    assert_eq!(response.status(), 200);

    // The REST endpoints below the path are protected.
    let response = server.client.get("/mcp/getDeals").await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn open_without_token() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(Method::POST, "/mcp")
        .header("origin", "https://anywhere.example")
        .json(&ping())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn cors_preflight_for_allowed_origin() {
    let server = TestServer::start(CONFIG).await;

    let response = server
        .client
        .request(Method::OPTIONS, "/mcp")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization,content-type,mcp-session-id")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
}
