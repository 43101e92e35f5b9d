use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .route("/uploads/{file}", get(serve))
}

/// Store a single uploaded file and return its URL. The surrounding
/// form stays usable when this fails; nothing else depends on the result.
async fn upload(
    State(state): State<AppState>,
    _current: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<serde_json::Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".into()));
        }

        let stored = format!("{}-{}", uuid::Uuid::now_v7(), sanitize_filename(&original));
        let path = state.config.uploads_path().join(&stored);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {e}")))?;

        tracing::info!("Stored upload {} ({} bytes)", stored, bytes.len());
        return Ok(Json(json!({ "url": format!("/uploads/{stored}") })));
    }

    Err(AppError::Validation("No file in upload".into()))
}

/// Serve a stored file with a guessed content type.
async fn serve(State(state): State<AppState>, Path(file): Path<String>) -> AppResult<Response> {
    if file.contains("..") || file.contains('/') || file.contains('\\') {
        return Err(AppError::NotFound);
    }

    let path = state.config.uploads_path().join(&file);
    let bytes = tokio::fs::read(&path).await.map_err(|_| AppError::NotFound)?;
    let mime = mime_guess::from_path(&file).first_or_octet_stream();

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        bytes,
    )
        .into_response())
}

/// Flatten a client-supplied filename to a safe single path segment.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
