//! HTTP handlers for résumé upload and management.

use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::ResumeResponse;
use crate::resume::{parser, store};
use crate::state::AppState;

/// POST /api/resume/upload
///
/// Accepts a multipart form with a single file field. PDF and plain-text
/// uploads are supported; the stored résumé replaces any previous one.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeResponse>, AppError> {
    let mut upload: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") || field.file_name().is_some() {
            let filename = field
                .file_name()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "resume.txt".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
            upload = Some((filename, data));
            break;
        }
    }

    let Some((filename, data)) = upload else {
        return Err(AppError::Validation(
            "No file field found in upload".to_string(),
        ));
    };

    let text = parser::extract_text(&filename, &data)?;
    let content = parser::clean_content(&text)?;
    let row = store::replace(&state.db, &filename, &content).await?;

    info!(
        "Uploaded resume '{}' ({} characters)",
        row.filename,
        row.content.chars().count()
    );

    Ok(Json(ResumeResponse::from(row)))
}

/// GET /api/resume/current
pub async fn handle_current(
    State(state): State<AppState>,
) -> Result<Json<ResumeResponse>, AppError> {
    let row = store::current(&state.db).await?.ok_or_else(|| {
        AppError::NotFound("No resume found. Please upload a resume first.".to_string())
    })?;

    Ok(Json(ResumeResponse::from(row)))
}

/// DELETE /api/resume/delete
pub async fn handle_delete(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    if !store::delete(&state.db).await? {
        return Err(AppError::NotFound("No resume found to delete.".to_string()));
    }

    info!("Resume deleted");
    Ok(Json(json!({ "message": "Resume deleted successfully" })))
}
