use http::StatusCode;

/// Upstream bodies longer than this are cut before they end up in error messages.
const MAX_BODY_CHARS: usize = 500;

/// Errors returned by the upstream REST API client.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-success status.
    #[error("Dealpath error ({status}): {body}")]
    Status {
        /// HTTP status returned by the upstream.
        status: StatusCode,
        /// Response body, truncated.
        body: String,
    },

    /// The request could not be sent or its response could not be read.
    #[error("Request to Dealpath failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a body we could not interpret.
    #[error("Invalid response from Dealpath: {0}")]
    InvalidResponse(String),

    /// The credential cannot be used as a header value.
    #[error("Credential contains characters not allowed in an HTTP header")]
    InvalidCredential,
}

impl UpstreamError {
    pub(crate) fn status(status: StatusCode, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate(body),
        }
    }

    /// The upstream status, if the upstream answered at all.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(error) => error.status(),
            Self::InvalidResponse(_) | Self::InvalidCredential => None,
        }
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_string(),
    }
}
