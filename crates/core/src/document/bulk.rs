//! Concurrent bulk upload with per-item failure isolation.
//!
//! Every (athlete, file) pair runs in its own task. The orchestrator waits
//! for all of them and reports one outcome per input item, in input order.
//! A failing item never affects the others and nothing is rolled back.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::access::Actor;
use super::error::DocumentError;
use super::repository::DocumentRepository;
use super::service::DocumentService;
use super::types::{Document, DocumentMetadata, FilePayload};
use crate::storage::ObjectStore;

/// One requested upload.
#[derive(Debug, Clone)]
pub struct BulkItem {
    /// Target athlete.
    pub athlete_id: i32,
    /// File for the athlete; `None` when the request carried none.
    pub file: Option<FilePayload>,
}

/// Result for one requested upload.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    /// Target athlete, echoed for correlation.
    pub athlete_id: i32,
    /// Created document, if the item succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    /// Failure message, if the item failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkOutcome {
    fn from_result(athlete_id: i32, result: Result<Document, String>) -> Self {
        match result {
            Ok(document) => Self {
                athlete_id,
                document: Some(document),
                error: None,
            },
            Err(error) => Self {
                athlete_id,
                document: None,
                error: Some(error),
            },
        }
    }

    /// True when the item produced a document.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.document.is_some()
    }
}

/// Fans bulk uploads out over the document service.
pub struct BulkUploadOrchestrator<R: DocumentRepository, S: ObjectStore> {
    service: Arc<DocumentService<R, S>>,
}

impl<R, S> BulkUploadOrchestrator<R, S>
where
    R: DocumentRepository + 'static,
    S: ObjectStore + 'static,
{
    /// Create an orchestrator over a shared document service.
    #[must_use]
    pub fn new(service: Arc<DocumentService<R, S>>) -> Self {
        Self { service }
    }

    /// Upload one file per athlete concurrently. Admin only.
    ///
    /// The returned list has one entry per item, in input order.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins and `Validation` for an empty
    /// request. Item failures are reported inside the outcomes.
    pub async fn upload_all(
        &self,
        actor: &Actor,
        items: Vec<BulkItem>,
        metadata: DocumentMetadata,
    ) -> Result<Vec<BulkOutcome>, DocumentError> {
        actor.require_admin()?;
        if items.is_empty() {
            return Err(DocumentError::validation("no athlete ids provided"));
        }

        let metadata = Arc::new(metadata);
        let athlete_ids: Vec<i32> = items.iter().map(|item| item.athlete_id).collect();

        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let service = Arc::clone(&self.service);
                let metadata = Arc::clone(&metadata);
                tokio::spawn(async move {
                    let file = item.file.ok_or_else(|| {
                        DocumentError::validation(format!(
                            "no file provided for athlete {}",
                            item.athlete_id
                        ))
                    })?;
                    service
                        .store_document(item.athlete_id, &metadata, file)
                        .await
                })
            })
            .collect();

        let outcomes: Vec<BulkOutcome> = join_all(handles)
            .await
            .into_iter()
            .zip(athlete_ids)
            .map(|(joined, athlete_id)| {
                let result = match joined {
                    Ok(Ok(document)) => Ok(document),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(join_error) => Err(format!("upload task failed: {join_error}")),
                };
                if let Err(error) = &result {
                    warn!(athlete_id, %error, "Bulk upload item failed");
                }
                BulkOutcome::from_result(athlete_id, result)
            })
            .collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            admin_id = actor.user_id,
            total = outcomes.len(),
            succeeded,
            "Bulk upload finished"
        );
        Ok(outcomes)
    }
}
