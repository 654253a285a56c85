use integration_tests::{BROKEN_SIGNED_FILE, FILE_CONTENTS, MockDealpath, TestServer, UNSIGNED_FILE_PREFIX};
use serde_json::{Value, json};

fn local_prefix(server: &TestServer) -> String {
    format!("{}/local-files/", server.client.base_url())
}

#[tokio::test]
async fn signed_download_links_local_copy_and_remote_url_last() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(Some("session-key")).await;

    let body = server.call_tool(&session, "get_file_by_id", json!({ "file_id": "f-1" })).await;

    let content = body["result"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 3);

    let signed_url = format!("http://{}/signed/f-1?expires=3600", dealpath.address());

    assert_eq!(content[0]["type"], "text");
    assert!(content[0]["text"].as_str().unwrap().contains(&signed_url));

    let local = &content[1];
    assert_eq!(local["type"], "resource_link");
    assert_eq!(local["name"], "report.pdf");
    assert_eq!(local["mimeType"], "application/pdf");

    let uri = local["uri"].as_str().unwrap();
    assert!(uri.starts_with(&local_prefix(&server)), "{uri} is not served locally");
    assert!(uri.ends_with("/f-1/report.pdf"));

    let remote = &content[2];
    assert_eq!(remote["type"], "resource_link");
    assert_eq!(remote["name"], "report.pdf");
    assert_eq!(remote["uri"], signed_url.as_str());

    assert_eq!(dealpath.requests(), vec!["/file/f-1/download_url", "/signed/f-1"]);

    // The signed URL carries its own authorization.
    assert_eq!(dealpath.authorizations(), vec!["Bearer session-key", ""]);

    let response = server.client.get_url(uri).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), FILE_CONTENTS);
}

#[tokio::test]
async fn failed_signed_fetch_returns_remote_link_only() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(Some("session-key")).await;

    let body = server
        .call_tool(&session, "get_file_by_id", json!({ "file_id": BROKEN_SIGNED_FILE }))
        .await;

    assert!(body["error"].is_null(), "{body}");

    let content = body["result"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);

    assert_eq!(content[0]["type"], "resource_link");
    assert_eq!(content[0]["name"], "report.pdf");
    assert_eq!(
        content[0]["uri"],
        format!("http://{}/signed/{BROKEN_SIGNED_FILE}?expires=3600", dealpath.address()).as_str()
    );

    // No fallback to the file host once a signed URL exists.
    assert_eq!(
        dealpath.requests(),
        vec![
            format!("/file/{BROKEN_SIGNED_FILE}/download_url"),
            format!("/signed/{BROKEN_SIGNED_FILE}"),
        ]
    );
}

#[tokio::test]
async fn download_without_signed_url_links_local_copy() {
    let dealpath = MockDealpath::spawn().await;
    let server = TestServer::start(&dealpath.config_section()).await;
    let session = server.initialize(Some("session-key")).await;

    let file_id = format!("{UNSIGNED_FILE_PREFIX}1");
    let body = server.call_tool(&session, "get_file_by_id", json!({ "file_id": &file_id })).await;

    let content = body["result"]["content"].as_array().unwrap();
    let links: Vec<&Value> = content
        .iter()
        .filter(|part| part["type"] == "resource_link")
        .collect();

    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["name"], "Q3 report.pdf");
    assert_eq!(links[0]["mimeType"], "application/pdf");

    let uri = links[0]["uri"].as_str().unwrap();

    assert!(uri.starts_with(&local_prefix(&server)), "{uri} is not served locally");
    assert!(uri.ends_with(&format!("/{file_id}/Q3_report.pdf")));

    assert_eq!(
        dealpath.requests(),
        vec![format!("/file/{file_id}/download_url"), format!("/files/file/{file_id}")]
    );

    let response = server.client.get_url(uri).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), FILE_CONTENTS);
}

#[tokio::test]
async fn traversal_is_not_served() {
    let server = TestServer::start("").await;

    std::fs::write(server.storage_root().join("secret.txt"), "secret").unwrap();

    let response = server
        .client
        .get("/local-files/20250101/..%2F..%2F/..%2Fsecret.txt")
        .await;

    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "detail": "File not found"
    }
    "#);
}

#[tokio::test]
async fn unknown_file_is_not_found() {
    let server = TestServer::start("").await;

    let response = server.client.get("/local-files/20250101/f-9/missing.pdf").await;

    assert_eq!(response.status(), 404);
}
