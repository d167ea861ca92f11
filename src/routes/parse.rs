//! EPUB upload and alignment endpoint
//!
//! Accepts a multipart form with a `file` part, decodes the EPUB and returns
//! the aligned sections, chunks, section blocks and images as one JSON
//! document.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::align::{self, ParseResponse};
use crate::document::DocumentError;
use crate::epub::EpubBook;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Name of the multipart part carrying the document
const FILE_FIELD: &str = "file";

/// Create the parse router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(parse_epub).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Parse an uploaded EPUB
async fn parse_epub(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ParseResponse>> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload: {}", e);
        AppError::BadRequest("invalid multipart form".to_string())
    })?;
    let limit = state.config().server.max_upload_bytes;

    let (file_name, data) = read_file_field(&mut multipart, limit)
        .await?
        .ok_or_else(|| AppError::BadRequest("missing file".to_string()))?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("parse", %request_id, file_name = %file_name);
    let options = state.config().chunking;
    let max_unpacked = state.config().server.max_unpacked_bytes;
    let file_size = data.len() as u64;

    tracing::debug!(parent: &span, bytes = file_size, "Received upload");

    let response = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        let book = EpubBook::from_bytes_with_limit(&data, max_unpacked)?;
        Ok::<_, DocumentError>(align::build_response(&book, &file_name, file_size, &options))
    })
    .await
    .map_err(|e| AppError::Internal(format!("parse task failed: {}", e)))??;

    Ok(Json(response))
}

/// Read the first `file` part, skipping any other fields
async fn read_file_field(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<Option<(String, Bytes)>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_multipart(e, limit))?
    {
        let name = field.name().unwrap_or("").to_string();
        tracing::debug!(
            "Received field: name='{}', filename={:?}, content_type={:?}",
            name,
            field.file_name(),
            field.content_type()
        );

        if name != FILE_FIELD {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::from_multipart(e, limit))?;
        return Ok(Some((file_name, data)));
    }

    Ok(None)
}
