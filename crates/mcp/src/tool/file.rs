use std::borrow::Cow;

use dealpath::FileStream;
use indoc::formatdoc;
use rmcp::model::Content;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{Tool, ToolContext, string_or_number};
use crate::{
    content::{ToolOutput, resource_link},
    error::McpError,
    files,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct GetFileByIdParameters {
    /// Identifier of the file.
    #[serde(deserialize_with = "string_or_number")]
    #[schemars(with = "String")]
    file_id: String,
}

/// Downloads a file to local storage and links to it.
///
/// The signed-URL route is preferred: its result ends with the remote link, since some clients
/// only display the last part. When no signed URL is available the file host is used directly.
pub(crate) struct GetFileById;

impl Tool for GetFileById {
    type Parameters = GetFileByIdParameters;

    fn name() -> &'static str {
        "get_file_by_id"
    }

    fn title(&self) -> &'static str {
        "Get File"
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed("Download the file to this server and return a local link.")
    }

    async fn call(&self, context: ToolContext<'_>, parameters: Self::Parameters) -> Result<ToolOutput, McpError> {
        let file_id = parameters.file_id;

        match context.api.file_download_url(&file_id).await {
            Ok(info) => {
                if let Some(url) = info.url.filter(|url| !url.is_empty()) {
                    let filename = info.name.unwrap_or_else(|| file_id.clone());
                    return Ok(ToolOutput::Content(via_signed_url(&context, &file_id, filename, url).await));
                }

                log::debug!("No signed URL for file {file_id}, downloading directly");
            }
            Err(error) => log::debug!("Signed URL unavailable for file {file_id} ({error}), downloading directly"),
        }

        direct_download(&context, &file_id).await.map(ToolOutput::Content)
    }
}

async fn via_signed_url(context: &ToolContext<'_>, file_id: &str, filename: String, url: String) -> Vec<Content> {
    let stored = match context.api.fetch_signed(&url).await {
        Ok(stream) => store(context, file_id, &filename, stream).await,
        Err(error) => Err(McpError::from(error)),
    };

    match stored {
        Ok((local_uri, mime_type)) => {
            let summary = formatdoc! {"
                Links for file '{filename}' (id {file_id}):
                - Local: {local_uri}
                - Remote (expires): {url}"
            };

            vec![
                Content::text(summary),
                resource_link(filename.clone(), local_uri, mime_type),
                resource_link(filename, url, None),
            ]
        }
        Err(error) => {
            log::warn!("Could not save file {file_id} locally, returning the remote link only: {error}");
            vec![resource_link(filename, url, None)]
        }
    }
}

async fn direct_download(context: &ToolContext<'_>, file_id: &str) -> Result<Vec<Content>, McpError> {
    let stream = context.api.download_file(file_id).await.map_err(|error| {
        if error.upstream_status().is_some() {
            McpError::Upstream(error)
        } else {
            McpError::FileFetch(error.to_string())
        }
    })?;

    let filename = stream.filename.clone().unwrap_or_else(|| file_id.to_string());
    let (local_uri, mime_type) = store(context, file_id, &filename, stream).await?;

    let summary = formatdoc! {"
        Links for file '{filename}' (id {file_id}):
        - Local: {local_uri}"
    };

    Ok(vec![
        Content::text(summary),
        resource_link(filename, local_uri, mime_type),
    ])
}

async fn store(
    context: &ToolContext<'_>,
    file_id: &str,
    filename: &str,
    stream: FileStream,
) -> Result<(String, Option<String>), McpError> {
    let FileStream { mime_type, body, .. } = stream;

    let relative = context.files.store_stream(file_id, filename, body).await?;

    Ok((files::public_url(context.base_url, &relative), mime_type))
}
