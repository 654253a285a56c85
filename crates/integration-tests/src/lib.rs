mod dealpath;

pub use dealpath::{BROKEN_SIGNED_FILE, FILE_CONTENTS, MockDealpath, UNSIGNED_FILE_PREFIX};

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use config::Config;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use server::ServeConfig;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::timeout;

static INIT: Once = Once::new();

fn init_crypto_provider() {
    INIT.call_once(|| {
        rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .expect("Failed to install default crypto provider");
    });
}

/// Test client for making HTTP requests to the test server
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// The URL the server is reachable at, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request to the given path, for tests that need extra headers
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.request(Method::POST, path).json(body).send().await.unwrap()
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(Method::GET, path).send().await.unwrap()
    }

    /// Send a GET request to an absolute URL, such as a resource link
    pub async fn get_url(&self, url: &str) -> reqwest::Response {
        self.client.get(url).send().await.unwrap()
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    storage: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with the given TOML configuration.
    ///
    /// Downloaded files go to a temporary directory owned by the server.
    pub async fn start(config_toml: &str) -> Self {
        init_crypto_provider();

        let mut config: Config = toml::from_str(config_toml).unwrap();

        let storage = tempfile::tempdir().unwrap();
        config.storage.root = storage.path().to_path_buf();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
        };

        let (tx, mut rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            // Drop the listener so the server can bind to the address
            drop(listener);

            let result = server::serve(serve_config).await;
            let _ = tx.send(result);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        if let Ok(Err(e)) = rx.try_recv() {
            eprintln!("Server failed to start: {e}");
            std::process::exit(1);
        }

        let client = TestClient::new(format!("http://{address}"));

        let mut retries = 10;
        while retries > 0 {
            if timeout(Duration::from_millis(100), client.get("/version")).await.is_ok() {
                break;
            }
            retries -= 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestServer {
            client,
            address,
            storage,
            _handle: handle,
        }
    }

    /// Directory the server stores downloaded files in
    pub fn storage_root(&self) -> &std::path::Path {
        self.storage.path()
    }

    /// Send a JSON-RPC payload to the MCP endpoint
    pub async fn rpc(&self, payload: Value) -> reqwest::Response {
        self.client.post("/mcp", &payload).await
    }

    /// Open a session with the given Dealpath API key and return its id
    pub async fn initialize(&self, api_key: Option<&str>) -> String {
        let mut params = serde_json::json!({ "protocolVersion": "2025-06-18" });

        if let Some(key) = api_key {
            params["dealpathApiKey"] = Value::from(key);
        }

        let response = self
            .rpc(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": params,
            }))
            .await;

        assert_eq!(response.status(), 200);

        response
            .headers()
            .get("mcp-session-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .expect("initialize must return a session id")
    }

    /// Call a tool within a session and return the JSON-RPC response body
    pub async fn call_tool(&self, session_id: &str, name: &str, arguments: Value) -> Value {
        self.client
            .request(Method::POST, "/mcp")
            .header("mcp-session-id", session_id)
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments },
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}
