//! Blob container handlers, mounted once per container.
//!
//! The container a request targets is carried as a `ContainerKind` request
//! extension set by the router.

use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, Multipart, Path, State};
use axum::http::header;
use axum::response::Response;
use tracing::info;

use manic_core::error::AppError;
use manic_core::traits::storage::BlobInfo;
use manic_storage::ContainerKind;

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying uploaded files.
const UPLOAD_FIELD: &str = "files";

/// GET /api/{container}
pub async fn list_files(
    State(state): State<AppState>,
    Extension(kind): Extension<ContainerKind>,
) -> Result<Json<Vec<BlobInfo>>, ApiError> {
    let files = state.storage.container(kind).list().await?;
    Ok(Json(files))
}

/// GET /api/{container}/{name}
pub async fn download_file(
    State(state): State<AppState>,
    Extension(kind): Extension<ContainerKind>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    info!(container = %kind, name = %name, "Handling download request");
    let stream = state.storage.container(kind).download_stream(&name).await?;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={name}"),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;

    Ok(response)
}

/// POST /api/{container}: multipart upload of one or more `files` fields.
pub async fn upload_files(
    State(state): State<AppState>,
    Extension(kind): Extension<ContainerKind>,
    mut multipart: Multipart,
) -> Result<Json<Vec<String>>, ApiError> {
    let store = state.storage.container(kind);
    let mut uploaded = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Could not parse multipart form: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(String::from)
            .ok_or_else(|| AppError::validation("Uploaded file has no file name"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Could not read file: {e}")))?;

        store.upload(&file_name, data).await?;
        uploaded.push(file_name);
    }

    if uploaded.is_empty() {
        return Err(AppError::validation("No files provided").into());
    }

    info!(container = %kind, count = uploaded.len(), "Uploaded files");
    Ok(Json(uploaded))
}

/// DELETE /api/{container}/{name}
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(kind): Extension<ContainerKind>,
    Path(name): Path<String>,
) -> Result<Json<String>, ApiError> {
    state.storage.container(kind).delete(&name).await?;
    Ok(Json(format!("{name} deleted successfully")))
}

/// DELETE /api/{container}
pub async fn clear_container(
    State(state): State<AppState>,
    Extension(kind): Extension<ContainerKind>,
) -> Result<Json<String>, ApiError> {
    let store = state.storage.container(kind);
    let removed = store.clear().await?;
    info!(container = %kind, removed, "Cleared container");
    Ok(Json(format!("{} cleared successfully", store.container())))
}
