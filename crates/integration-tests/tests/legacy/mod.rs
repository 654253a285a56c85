use indoc::formatdoc;
use integration_tests::{MockDealpath, TestServer};
use reqwest::Method;
use serde_json::Value;

async fn server_with_default_key(dealpath: &MockDealpath) -> TestServer {
    let config = formatdoc! {r#"
        {}
        api_key = "default-key"
    "#, dealpath.config_section()};

    TestServer::start(&config).await
}

#[tokio::test]
async fn list_deals_with_filters() {
    let dealpath = MockDealpath::spawn().await;
    let server = server_with_default_key(&dealpath).await;

    let response = server.client.get("/mcp/getDeals?status=Active").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();

    assert_eq!(body["deals"]["data"].as_array().unwrap().len(), 2);
    assert_eq!(dealpath.requests(), vec!["/deals?status=Active"]);
    assert_eq!(dealpath.authorizations(), vec!["Bearer default-key"]);
}

#[tokio::test]
async fn path_id_binds_static_tool_argument() {
    let dealpath = MockDealpath::spawn().await;
    let server = server_with_default_key(&dealpath).await;

    let body: Value = server.client.get("/mcp/getDeal/21").await.json().await.unwrap();

    assert_eq!(body["deal"]["data"]["id"], "21");
    assert_eq!(dealpath.requests(), vec!["/deal/21"]);
}

#[tokio::test]
async fn path_id_binds_generated_tool_parameter() {
    let dealpath = MockDealpath::spawn().await;
    let server = server_with_default_key(&dealpath).await;

    let body: Value = server.client.get("/mcp/getDealFiles/8").await.json().await.unwrap();

    assert_eq!(body["files"]["data"][0]["deal_id"], "8");
    assert_eq!(dealpath.requests(), vec!["/files/deal/8"]);
}

#[tokio::test]
async fn header_credential_wins_over_default() {
    let dealpath = MockDealpath::spawn().await;
    let server = server_with_default_key(&dealpath).await;

    let response = server
        .client
        .request(Method::GET, "/mcp/getDeal/5")
        .header("X-Dealpath-Api-Key", "header-key")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(dealpath.authorizations(), vec!["Bearer header-key"]);
}

#[tokio::test]
async fn errors_use_http_status_and_detail() {
    let dealpath = MockDealpath::spawn().await;
    let server = server_with_default_key(&dealpath).await;

    let response = server.client.get("/mcp/getDeal/404").await;
    assert_eq!(response.status(), 404);

    let response = server.client.get("/mcp/launchRockets").await;
    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "detail": "Unknown tool: launch_rockets"
    }
    "#);
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;

    let response = server.client.get("/mcp/getDeals").await;

    assert_eq!(response.status(), 401);
    assert!(dealpath.requests().is_empty());
}
