//! `GET /local-files/{date}/{id}/{filename}`: files stored by `get_file_by_id`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use mcp::{AppContext, LocalFileError};
use serde_json::json;
use tower::ServiceExt;
use tower_http::services::ServeFile;

pub(crate) async fn serve(
    State(context): State<Arc<AppContext>>,
    Path((date, file_id, filename)): Path<(String, String, String)>,
    request: Request,
) -> Response {
    let path = match context.files().resolve(&date, &file_id, &filename).await {
        Ok(path) => path,
        Err(LocalFileError::NotFound) => return not_found(),
        Err(error) => {
            log::debug!("Cannot serve local file {date}/{file_id}/{filename}: {error}");
            return not_found();
        }
    };

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(error) => {
            log::error!("Failed to stream local file: {error}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "File not found" }))).into_response()
}
