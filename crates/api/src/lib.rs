//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for documents, categories and tags
//! - Authentication middleware
//! - Error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use clubdocs_core::document::{BulkUploadOrchestrator, DocumentService};
use clubdocs_core::storage::StorageService;
use clubdocs_db::{CatalogRepository, DocumentRepository};
use clubdocs_shared::JwtService;
use clubdocs_shared::config::DocumentSettings;

/// Document service wired to the database and object storage.
pub type Documents = DocumentService<DocumentRepository, StorageService>;

/// Bulk uploader over [`Documents`].
pub type BulkUploads = BulkUploadOrchestrator<DocumentRepository, StorageService>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Document operations.
    pub documents: Arc<Documents>,
    /// Concurrent multi-athlete uploads.
    pub bulk: Arc<BulkUploads>,
    /// Categories and tags.
    pub catalog: Arc<CatalogRepository>,
    /// Upper bound for a request body in bytes.
    pub max_request_size: usize,
}

impl AppState {
    /// Wire the document stack over one connection pool and storage backend.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        jwt_service: JwtService,
        storage: StorageService,
        settings: DocumentSettings,
        max_request_size: usize,
    ) -> Self {
        let repo = DocumentRepository::new(db.clone())
            .with_version_retry_attempts(settings.version_retry_attempts);
        let documents = Arc::new(DocumentService::new(
            Arc::new(repo),
            Arc::new(storage),
            settings,
        ));

        Self {
            catalog: Arc::new(CatalogRepository::new(db.clone())),
            bulk: Arc::new(BulkUploadOrchestrator::new(Arc::clone(&documents))),
            documents,
            db: Arc::new(db),
            jwt_service: Arc::new(jwt_service),
            max_request_size,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(DefaultBodyLimit::max(state.max_request_size))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
