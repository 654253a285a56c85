//! Client for the Dealpath REST API.
//!
//! [`DealpathApi`] is the seam the gateway talks to; [`DealpathClient`] implements it over
//! `reqwest`, and [`ClientPool`] hands out one client per credential.

#![deny(missing_docs)]

mod client;
mod disposition;
mod error;
mod pool;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::Deserialize;
use serde_json::Value;

pub use client::DealpathClient;
pub use error::UpstreamError;
pub use pool::{ClientFactory, ClientPool};

/// Query parameters of an upstream request. Keys may repeat.
pub type Query = Vec<(String, String)>;

/// A temporary, signed download location for a file.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadUrl {
    /// The signed URL. Absent when the upstream cannot produce one.
    pub url: Option<String>,
    /// The file's display name.
    pub name: Option<String>,
}

/// A file body being streamed from the upstream.
pub struct FileStream {
    /// Filename announced by the response, if any.
    pub filename: Option<String>,
    /// Value of the response `Content-Type`.
    pub mime_type: Option<String>,
    /// The body, chunk by chunk.
    pub body: BoxStream<'static, Result<Bytes, UpstreamError>>,
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Operations the gateway needs from the upstream API.
///
/// Implementations are bound to a single credential.
#[async_trait]
pub trait DealpathApi: Send + Sync {
    /// Issues an authenticated `GET {base_url}{path}` and returns the JSON body.
    async fn get(&self, path: &str, query: &Query) -> Result<Value, UpstreamError>;

    /// Asks the upstream for a signed download URL of a file.
    async fn file_download_url(&self, file_id: &str) -> Result<DownloadUrl, UpstreamError>;

    /// Streams the body behind a signed URL. No credential is sent.
    async fn fetch_signed(&self, url: &str) -> Result<FileStream, UpstreamError>;

    /// Streams a file directly from the file host, authenticated.
    async fn download_file(&self, file_id: &str) -> Result<FileStream, UpstreamError>;
}
