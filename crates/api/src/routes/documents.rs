//! Document routes: uploads, review, versions, sharing and search.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::multipart::UploadForm;
use crate::error::{ApiError, ApiResult};
use crate::{AppState, middleware::AuthUser};
use clubdocs_core::document::{
    BulkItem, BulkOutcome, Document, DocumentContent, DocumentShare, DocumentVersion,
    PermissionLevel, SearchFilters, ShareRequest, SharedDocument,
};

/// Creates the document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/documents", post(upload_document))
        .route("/documents/bulk", post(bulk_upload))
        .route("/documents/search", get(search_documents))
        .route("/documents/pending", get(pending_documents))
        .route("/documents/expiring", get(expiring_documents))
        .route("/documents/expired", get(expired_documents))
        .route("/documents/mine", get(my_documents))
        .route("/documents/shared", get(shared_with_me))
        .route("/athletes/{athlete_id}/documents", get(athlete_documents))
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/documents/{id}/download", get(download_document))
        .route("/documents/{id}/preview", get(preview_document))
        .route("/documents/{id}/validate", post(validate_document))
        .route("/documents/{id}/reject", post(reject_document))
        .route(
            "/documents/{id}/versions",
            get(list_versions).post(upload_version),
        )
        .route("/documents/{id}/shares", get(list_shares).post(share_document))
        .route("/documents/{id}/shares/{user_id}", delete(unshare_document))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for rejecting a document.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Why the document was refused.
    #[serde(default)]
    pub reason: String,
}

/// Request body for sharing a document.
#[derive(Debug, Deserialize)]
pub struct ShareDocumentRequest {
    /// Grantee user ID.
    pub shared_with: i32,
    /// `view`, `edit` or `manage`; defaults to `view`.
    #[serde(default)]
    pub permission_level: Option<String>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// End of the grant.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response for a bulk upload.
#[derive(Debug, Serialize)]
pub struct BulkUploadResponse {
    /// Number of items that were stored.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Per-athlete outcomes in request order.
    pub results: Vec<BulkOutcome>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/documents`
/// Upload one document. Athletes may omit `athlete_id`.
async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let form = UploadForm::read(multipart).await?;
    let actor = auth.actor();

    let athlete_id = match form.id("athlete_id")? {
        Some(id) => id,
        None => actor
            .athlete_id
            .ok_or_else(|| ApiError::validation("athlete_id is required"))?,
    };
    let metadata = form.metadata()?;
    let file = form
        .file("file")
        .ok_or_else(|| ApiError::validation("file is required"))?;

    let document = state
        .documents
        .upload(actor, athlete_id, &metadata, file)
        .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

/// POST `/documents/bulk`
/// Upload one file per athlete; parts are named `file_{athlete_id}`.
async fn bulk_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<BulkUploadResponse>> {
    let form = UploadForm::read(multipart).await?;

    let athlete_ids = form.ids("athlete_ids")?;
    let metadata = form.metadata()?;
    let items = athlete_ids
        .into_iter()
        .map(|athlete_id| BulkItem {
            athlete_id,
            file: form.file(&format!("file_{athlete_id}")),
        })
        .collect();

    let results = state.bulk.upload_all(auth.actor(), items, metadata).await?;
    let succeeded = results.iter().filter(|r| r.is_success()).count();

    Ok(Json(BulkUploadResponse {
        succeeded,
        failed: results.len() - succeeded,
        results,
    }))
}

/// GET `/documents/search`
async fn search_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Document>>> {
    let filters = SearchFilters::from_params(&params)?;
    Ok(Json(state.documents.search(auth.actor(), filters).await?))
}

/// GET `/documents/pending`
async fn pending_documents(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.documents.pending(auth.actor()).await?))
}

/// GET `/documents/expiring`
async fn expiring_documents(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.documents.expiring(auth.actor()).await?))
}

/// GET `/documents/expired`
async fn expired_documents(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.documents.expired(auth.actor()).await?))
}

/// GET `/documents/mine`
async fn my_documents(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(state.documents.my_documents(auth.actor()).await?))
}

/// GET `/documents/shared`
async fn shared_with_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<SharedDocument>>> {
    Ok(Json(state.documents.shared_with_me(auth.actor()).await?))
}

/// GET `/athletes/{athlete_id}/documents`
async fn athlete_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(athlete_id): Path<i32>,
) -> ApiResult<Json<Vec<Document>>> {
    Ok(Json(
        state
            .documents
            .list_for_athlete(auth.actor(), athlete_id)
            .await?,
    ))
}

/// GET `/documents/{id}`
async fn get_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.documents.get(auth.actor(), id).await?))
}

/// DELETE `/documents/{id}`
async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.documents.delete(auth.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/documents/{id}/download`
/// Redirects to remote files and streams local ones as an attachment.
async fn download_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    serve_document(&state, &auth, id, "attachment").await
}

/// GET `/documents/{id}/preview`
/// Same as download, but rendered inline by the browser.
async fn preview_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    serve_document(&state, &auth, id, "inline").await
}

async fn serve_document(
    state: &AppState,
    auth: &AuthUser,
    id: i32,
    disposition: &str,
) -> ApiResult<Response> {
    let (document, content) = state.documents.open(auth.actor(), id).await?;

    Ok(match content {
        DocumentContent::Redirect(url) => Redirect::temporary(&url).into_response(),
        DocumentContent::Inline(bytes) => {
            let file_name = document.file_name.replace('"', "");
            (
                [
                    (header::CONTENT_TYPE, document.mime_type),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("{disposition}; filename=\"{file_name}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
    })
}

/// POST `/documents/{id}/validate`
async fn validate_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Document>> {
    Ok(Json(state.documents.validate(auth.actor(), id).await?))
}

/// POST `/documents/{id}/reject`
async fn reject_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<Json<Document>> {
    Ok(Json(
        state
            .documents
            .reject(auth.actor(), id, &payload.reason)
            .await?,
    ))
}

/// GET `/documents/{id}/versions`
async fn list_versions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<DocumentVersion>>> {
    Ok(Json(state.documents.versions(auth.actor(), id).await?))
}

/// POST `/documents/{id}/versions`
async fn upload_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<DocumentVersion>)> {
    let form = UploadForm::read(multipart).await?;
    let file = form
        .file("file")
        .ok_or_else(|| ApiError::validation("file is required"))?;
    let notes = form.text("notes").map(str::to_string);

    let version = state
        .documents
        .upload_version(auth.actor(), id, file, notes)
        .await?;

    Ok((StatusCode::CREATED, Json(version)))
}

/// GET `/documents/{id}/shares`
async fn list_shares(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<DocumentShare>>> {
    Ok(Json(state.documents.shares(auth.actor(), id).await?))
}

/// POST `/documents/{id}/shares`
async fn share_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ShareDocumentRequest>,
) -> ApiResult<Json<DocumentShare>> {
    let permission_level = match payload.permission_level.as_deref().map(str::trim) {
        None | Some("") => PermissionLevel::View,
        Some(raw) => raw.parse()?,
    };

    let share = state
        .documents
        .share(
            auth.actor(),
            id,
            ShareRequest {
                shared_with: payload.shared_with,
                permission_level,
                notes: payload.notes,
                expires_at: payload.expires_at,
            },
        )
        .await?;

    Ok(Json(share))
}

/// DELETE `/documents/{id}/shares/{user_id}`
async fn unshare_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> ApiResult<StatusCode> {
    state.documents.unshare(auth.actor(), id, user_id).await?;
    info!(document_id = id, user_id, "Share revoked");
    Ok(StatusCode::NO_CONTENT)
}
