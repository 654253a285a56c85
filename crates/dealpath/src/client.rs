use std::time::Duration;

use async_trait::async_trait;
use config::DealpathConfig;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::{DealpathApi, DownloadUrl, FileStream, Query, UpstreamError, disposition};

const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Upstream client bound to one credential.
pub struct DealpathClient {
    api: Client,
    plain: Client,
    base_url: String,
    files_base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl DealpathClient {
    /// Creates a client authenticating with `credential`.
    pub fn new(config: &DealpathConfig, credential: &SecretString) -> Result<Self, UpstreamError> {
        Self::with_plain_client(config, credential, plain_client(config)?)
    }

    /// Creates a client reusing `plain` for requests that must not carry the credential.
    pub(crate) fn with_plain_client(
        config: &DealpathConfig,
        credential: &SecretString,
        plain: Client,
    ) -> Result<Self, UpstreamError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", credential.expose_secret()))
            .map_err(|_| UpstreamError::InvalidCredential)?;

        authorization.set_sensitive(true);

        let accept = HeaderValue::from_str(&config.accept)
            .map_err(|_| UpstreamError::InvalidResponse(format!("invalid accept header: {}", config.accept)))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, accept);

        let api = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            api,
            plain,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            files_base_url: config.files_base_url.as_str().trim_end_matches('/').to_string(),
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        })
    }

    /// Sends the request built by `build`, retrying on transport errors and gateway statuses.
    async fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, UpstreamError> {
        let mut attempt = 0;

        loop {
            let result = build().send().await;

            let retryable = match &result {
                Ok(response) => RETRYABLE_STATUSES.contains(&response.status()),
                Err(error) => !error.is_builder(),
            };

            if !retryable || attempt >= self.max_retries {
                return ensure_success(result?).await;
            }

            let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));

            match &result {
                Ok(response) => log::debug!("Upstream answered {}, retrying in {delay:?}", response.status()),
                Err(error) => log::debug!("Upstream request failed ({error}), retrying in {delay:?}"),
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// File bodies are streamed without a total deadline, so a stalled read is what ends them.
pub(crate) fn plain_client(config: &DealpathConfig) -> Result<Client, UpstreamError> {
    let client = Client::builder()
        .connect_timeout(config.timeout)
        .read_timeout(config.timeout)
        .build()?;

    Ok(client)
}

async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("Upstream returned {status}");

    Err(UpstreamError::status(status, &body))
}

fn file_stream(response: Response) -> FileStream {
    let headers = response.headers();

    let filename = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(disposition::filename);

    let mime_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    FileStream {
        filename,
        mime_type,
        body: response.bytes_stream().map_err(UpstreamError::from).boxed(),
    }
}

#[async_trait]
impl DealpathApi for DealpathClient {
    async fn get(&self, path: &str, query: &Query) -> Result<Value, UpstreamError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("GET {url}");

        let response = self
            .send(|| self.api.get(&url).query(query).timeout(self.timeout))
            .await?;

        let body = response.bytes().await?;

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }

    async fn file_download_url(&self, file_id: &str) -> Result<DownloadUrl, UpstreamError> {
        let path = format!("/file/{}/download_url", urlencoding::encode(file_id));
        let body = self.get(&path, &Query::new()).await?;

        serde_json::from_value(body).map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }

    async fn fetch_signed(&self, url: &str) -> Result<FileStream, UpstreamError> {
        let response = self.send(|| self.plain.get(url).header(ACCEPT, "*/*")).await?;

        Ok(file_stream(response))
    }

    async fn download_file(&self, file_id: &str) -> Result<FileStream, UpstreamError> {
        let url = format!("{}/file/{}", self.files_base_url, urlencoding::encode(file_id));
        log::debug!("GET {url}");

        let response = self.send(|| self.api.get(&url).header(ACCEPT, "*/*")).await?;

        Ok(file_stream(response))
    }
}
