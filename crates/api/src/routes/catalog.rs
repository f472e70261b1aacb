//! Category and tag reference data routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::error::ApiResult;
use crate::{AppState, middleware::AuthUser};
use clubdocs_core::document::{Category, NewCategory, NewTag, Tag};

/// Creates the catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/document-categories",
            get(list_categories).post(create_category),
        )
        .route("/document-tags", get(list_tags).post(create_tag))
}

/// GET `/document-categories`
async fn list_categories(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// POST `/document-categories`
async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    auth.actor().require_admin()?;
    let category = state.catalog.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET `/document-tags`
async fn list_tags(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.catalog.list_tags().await?))
}

/// POST `/document-tags`
async fn create_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<NewTag>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    auth.actor().require_admin()?;
    let tag = state.catalog.create_tag(payload).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}
