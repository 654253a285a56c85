//! Local persistence of downloaded files.
//!
//! Files land under `{root}/{YYYYMMDD}/{id}/{filename}` (UTC date). Every path component is
//! sanitized on write and again on read, so a served path can never leave the root.

use std::{
    io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use bytes::Bytes;
use dealpath::UpstreamError;
use futures_util::{Stream, StreamExt};
use regex::Regex;
use tokio::{fs, io::AsyncWriteExt};

static UNSAFE_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("pattern must compile"));

/// Errors of the local file store.
#[derive(Debug, thiserror::Error)]
pub enum LocalFileError {
    /// Nothing servable under the requested path.
    #[error("File not found")]
    NotFound,

    /// Reading or writing the file system failed.
    #[error("Failed to store file: {0}")]
    Io(#[from] io::Error),

    /// The upstream body broke off.
    #[error(transparent)]
    Download(#[from] UpstreamError),
}

/// Directory holding downloaded files.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if needed.
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Streams `body` to disk and returns the path relative to the root, with `/` separators.
    ///
    /// A partially written file is removed when the body fails.
    pub async fn store_stream<S>(&self, file_id: &str, filename: &str, body: S) -> Result<String, LocalFileError>
    where
        S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
    {
        let relative = relative_path(&today(), file_id, filename);
        let destination = self.root.join(&relative);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        match write_stream(&destination, body).await {
            Ok(bytes) => {
                log::debug!("Stored {bytes} bytes at {}", destination.display());
                Ok(relative)
            }
            Err(error) => {
                let _ = fs::remove_file(&destination).await;
                Err(error)
            }
        }
    }

    /// Maps the components of a `/local-files/...` request to a file under the root.
    pub async fn resolve(&self, date: &str, file_id: &str, filename: &str) -> Result<PathBuf, LocalFileError> {
        let date: String = date.chars().filter(char::is_ascii_digit).take(8).collect();

        if date.is_empty() {
            return Err(LocalFileError::NotFound);
        }

        let base = fs::canonicalize(&self.root).await.map_err(|_| LocalFileError::NotFound)?;

        let candidate = base
            .join(date)
            .join(sanitize_id(file_id))
            .join(sanitize_filename(filename));

        let path = fs::canonicalize(&candidate)
            .await
            .map_err(|_| LocalFileError::NotFound)?;

        if !path.starts_with(&base) {
            log::warn!("Rejected local file request escaping the storage root");
            return Err(LocalFileError::NotFound);
        }

        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(path),
            _ => Err(LocalFileError::NotFound),
        }
    }
}

async fn write_stream<S>(destination: &Path, mut body: S) -> Result<u64, LocalFileError>
where
    S: Stream<Item = Result<Bytes, UpstreamError>> + Unpin,
{
    let mut file = fs::File::create(destination).await?;
    let mut written = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;

    Ok(written)
}

fn today() -> String {
    jiff::Timestamp::now().strftime("%Y%m%d").to_string()
}

/// `{date}/{id}/{filename}` with both the id and the filename sanitized.
pub(crate) fn relative_path(date: &str, file_id: &str, filename: &str) -> String {
    format!("{date}/{}/{}", sanitize_id(file_id), sanitize_filename(filename))
}

/// Public URL of a stored file.
pub(crate) fn public_url(base_url: &str, relative: &str) -> String {
    format!("{}/local-files/{}", base_url.trim_end_matches('/'), relative.replace('\\', "/"))
}

/// Keeps the last path segment and replaces anything outside `[A-Za-z0-9._-]`.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    let last = normalized.rsplit('/').next().unwrap_or_default();

    let cleaned = UNSAFE_CHARACTERS.replace_all(last, "_");

    if cleaned.is_empty() || is_dots(&cleaned) {
        return "file.bin".to_string();
    }

    cleaned.into_owned()
}

/// Replaces anything outside `[A-Za-z0-9._-]`.
pub(crate) fn sanitize_id(value: &str) -> String {
    let cleaned = UNSAFE_CHARACTERS.replace_all(value, "_");

    if cleaned.is_empty() || is_dots(&cleaned) {
        return "id".to_string();
    }

    cleaned.into_owned()
}

fn is_dots(value: &str) -> bool {
    value.chars().all(|c| c == '.')
}
