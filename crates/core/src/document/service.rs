//! Document service: storage plus persistence with access checks.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Days, Utc};
use clubdocs_shared::config::DocumentSettings;
use tracing::{debug, info, warn};

use super::access::{Actor, Role};
use super::error::DocumentError;
use super::repository::DocumentRepository;
use super::search::SearchFilters;
use super::types::{
    Document, DocumentMetadata, DocumentShare, DocumentVersion, FilePayload, NewDocument, NewShare,
    NewVersion, PermissionLevel, SharedDocument, non_blank,
};
use crate::storage::{ObjectStore, ObjectUpload, StorageLocation};

/// Storage folder for an athlete's documents.
#[must_use]
pub fn athlete_folder(athlete_id: i32) -> String {
    format!("documents/athlete_{athlete_id}")
}

/// Storage folder for the versions of one document.
#[must_use]
pub fn version_folder(athlete_id: i32, document_id: i32) -> String {
    format!("documents/athlete_{athlete_id}/document_{document_id}/versions")
}

/// Share request as received from the caller.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    /// Grantee user ID.
    pub shared_with: i32,
    /// Requested access.
    pub permission_level: PermissionLevel,
    /// Free-text notes.
    pub notes: Option<String>,
    /// End of the grant.
    pub expires_at: Option<DateTime<Utc>>,
}

/// How a document's content is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
    /// Client should fetch from this URL.
    Redirect(String),
    /// Bytes read from local storage.
    Inline(Bytes),
}

/// Document service for uploads, review, versions and sharing.
pub struct DocumentService<R: DocumentRepository, S: ObjectStore> {
    repo: Arc<R>,
    storage: Arc<S>,
    settings: DocumentSettings,
}

impl<R: DocumentRepository, S: ObjectStore> DocumentService<R, S> {
    /// Create a new document service.
    #[must_use]
    pub fn new(repo: Arc<R>, storage: Arc<S>, settings: DocumentSettings) -> Self {
        Self {
            repo,
            storage,
            settings,
        }
    }

    /// Upload one file for one athlete.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` unless the actor acts for the athlete, and
    /// storage or store errors as they occur.
    pub async fn upload(
        &self,
        actor: &Actor,
        athlete_id: i32,
        metadata: &DocumentMetadata,
        file: FilePayload,
    ) -> Result<Document, DocumentError> {
        if !actor.acts_for(athlete_id) {
            return Err(DocumentError::forbidden(format!(
                "cannot upload documents for athlete {athlete_id}"
            )));
        }
        self.store_document(athlete_id, metadata, file).await
    }

    /// Put the file in storage, then record it. The blob is removed again
    /// if the record cannot be written.
    pub(crate) async fn store_document(
        &self,
        athlete_id: i32,
        metadata: &DocumentMetadata,
        file: FilePayload,
    ) -> Result<Document, DocumentError> {
        let file_size_bytes = file.size();
        let location = self
            .storage
            .upload(ObjectUpload {
                data: file.data,
                file_name: file.file_name.clone(),
                folder: athlete_folder(athlete_id),
                content_type: file.content_type.clone(),
            })
            .await?;

        let input = NewDocument {
            athlete_id,
            document_type: metadata.document_type().to_string(),
            category_id: metadata.category_id,
            tag_ids: metadata.tag_ids.clone(),
            file_name: file.file_name,
            file_location: location.clone(),
            file_size_bytes,
            mime_type: file.content_type,
            expiry_date: metadata.expiry_date,
            notes: non_blank(metadata.notes.clone()),
        };

        match self.repo.create(input).await {
            Ok(document) => {
                info!(
                    document_id = document.id,
                    athlete_id,
                    location = %document.file_location,
                    "Document uploaded"
                );
                Ok(document)
            }
            Err(e) => {
                self.discard_blob(&location).await;
                Err(e)
            }
        }
    }

    /// Upload a new version of an existing document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing document and `Forbidden` without
    /// edit permission.
    pub async fn upload_version(
        &self,
        actor: &Actor,
        document_id: i32,
        file: FilePayload,
        notes: Option<String>,
    ) -> Result<DocumentVersion, DocumentError> {
        let document = self.authorize(actor, document_id, PermissionLevel::Edit).await?;

        let file_size_bytes = file.size();
        let location = self
            .storage
            .upload(ObjectUpload {
                data: file.data,
                file_name: file.file_name.clone(),
                folder: version_folder(document.athlete_id, document.id),
                content_type: file.content_type.clone(),
            })
            .await?;

        let input = NewVersion {
            document_id,
            file_name: file.file_name,
            file_location: location.clone(),
            file_size_bytes,
            mime_type: file.content_type,
            notes: non_blank(notes),
            uploaded_by: Some(actor.user_id),
        };

        match self.repo.create_version(input).await {
            Ok(version) => {
                info!(
                    document_id,
                    version_number = version.version_number,
                    "Document version uploaded"
                );
                Ok(version)
            }
            Err(e) => {
                self.discard_blob(&location).await;
                Err(e)
            }
        }
    }

    async fn discard_blob(&self, location: &StorageLocation) {
        match self.storage.remove(location).await {
            Ok(()) => debug!(%location, "Removed blob after failed store write"),
            Err(e) => warn!(%location, error = %e, "Orphaned blob: compensating delete failed"),
        }
    }

    /// Load a document and check the actor's permission on it.
    async fn authorize(
        &self,
        actor: &Actor,
        document_id: i32,
        needed: PermissionLevel,
    ) -> Result<Document, DocumentError> {
        let document = self
            .repo
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| DocumentError::document_not_found(document_id))?;

        if actor.acts_for(document.athlete_id)
            || (actor.role == Role::Coach && needed == PermissionLevel::View)
        {
            return Ok(document);
        }

        let shares = self.repo.list_shares(document_id).await?;
        actor.require(needed, &document, &shares, Utc::now())?;
        Ok(document)
    }

    /// Get a document by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing id and `Forbidden` without view permission.
    pub async fn get(&self, actor: &Actor, id: i32) -> Result<Document, DocumentError> {
        self.authorize(actor, id, PermissionLevel::View).await
    }

    /// Resolve how to deliver a document's file.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`], plus storage read errors for local files.
    pub async fn open(
        &self,
        actor: &Actor,
        id: i32,
    ) -> Result<(Document, DocumentContent), DocumentError> {
        let document = self.authorize(actor, id, PermissionLevel::View).await?;
        let content = match &document.file_location {
            StorageLocation::Remote(url) => DocumentContent::Redirect(url.clone()),
            local @ StorageLocation::Local(_) => {
                DocumentContent::Inline(self.storage.read(local).await?)
            }
        };
        Ok((document, content))
    }

    /// Documents of one athlete.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for athletes asking about someone else.
    pub async fn list_for_athlete(
        &self,
        actor: &Actor,
        athlete_id: i32,
    ) -> Result<Vec<Document>, DocumentError> {
        if actor.role != Role::Coach && !actor.acts_for(athlete_id) {
            return Err(DocumentError::forbidden(format!(
                "cannot list documents of athlete {athlete_id}"
            )));
        }
        self.repo.list_by_athlete(athlete_id).await
    }

    /// Documents of the actor's own athlete profile.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when no athlete profile is linked.
    pub async fn my_documents(&self, actor: &Actor) -> Result<Vec<Document>, DocumentError> {
        let athlete_id = actor.own_athlete_id()?;
        self.repo.list_by_athlete(athlete_id).await
    }

    /// Documents awaiting review. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins.
    pub async fn pending(&self, actor: &Actor) -> Result<Vec<Document>, DocumentError> {
        actor.require_admin()?;
        self.repo.list_pending().await
    }

    /// Documents expiring within the configured window. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins.
    pub async fn expiring(&self, actor: &Actor) -> Result<Vec<Document>, DocumentError> {
        actor.require_admin()?;
        let today = Utc::now().date_naive();
        let until = today
            .checked_add_days(Days::new(u64::from(self.settings.expiring_window_days)))
            .unwrap_or(today);
        self.repo.list_expiring(today, until).await
    }

    /// Documents past their expiry date. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins.
    pub async fn expired(&self, actor: &Actor) -> Result<Vec<Document>, DocumentError> {
        actor.require_admin()?;
        self.repo.list_expired(Utc::now().date_naive()).await
    }

    /// Search documents. Athletes are confined to their own documents.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for athletes without a linked profile.
    pub async fn search(
        &self,
        actor: &Actor,
        mut filters: SearchFilters,
    ) -> Result<Vec<Document>, DocumentError> {
        if actor.role == Role::Athlete {
            filters.athlete_id = Some(actor.own_athlete_id()?);
        }
        self.repo.search(&filters).await
    }

    /// Approve a document.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins, `NotFound` for a missing id and
    /// `InvalidTransition` for a rejected document.
    pub async fn validate(&self, actor: &Actor, id: i32) -> Result<Document, DocumentError> {
        actor.require_admin()?;
        let document = self.repo.validate(id, actor.user_id).await?;
        info!(document_id = id, admin_id = actor.user_id, "Document approved");
        Ok(document)
    }

    /// Reject a document.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins, `NotFound` for a missing id and
    /// `InvalidTransition` for an approved document.
    pub async fn reject(
        &self,
        actor: &Actor,
        id: i32,
        reason: &str,
    ) -> Result<Document, DocumentError> {
        actor.require_admin()?;
        let document = self.repo.reject(id, actor.user_id, reason).await?;
        info!(document_id = id, admin_id = actor.user_id, "Document rejected");
        Ok(document)
    }

    /// Delete a document, its relations, and its stored files.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing id and `Forbidden` without manage permission.
    pub async fn delete(&self, actor: &Actor, id: i32) -> Result<(), DocumentError> {
        let document = self.authorize(actor, id, PermissionLevel::Manage).await?;
        let versions = self.repo.list_versions(id).await?;

        self.repo.delete(id).await?;
        info!(document_id = id, actor_id = actor.user_id, "Document deleted");

        let locations = std::iter::once(document.file_location)
            .chain(versions.into_iter().map(|v| v.file_location));
        for location in locations {
            if let Err(e) = self.storage.remove(&location).await {
                warn!(document_id = id, %location, error = %e, "Failed to remove stored file");
            }
        }
        Ok(())
    }

    /// Versions of a document, highest number first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing document and `Forbidden` without view permission.
    pub async fn versions(
        &self,
        actor: &Actor,
        document_id: i32,
    ) -> Result<Vec<DocumentVersion>, DocumentError> {
        self.authorize(actor, document_id, PermissionLevel::View).await?;
        self.repo.list_versions(document_id).await
    }

    /// Share a document, overwriting any existing grant for the same user.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing document and `Forbidden` without manage permission.
    pub async fn share(
        &self,
        actor: &Actor,
        document_id: i32,
        request: ShareRequest,
    ) -> Result<DocumentShare, DocumentError> {
        self.authorize(actor, document_id, PermissionLevel::Manage).await?;
        let share = self
            .repo
            .share(NewShare {
                document_id,
                shared_by: actor.user_id,
                shared_with: request.shared_with,
                permission_level: request.permission_level,
                notes: non_blank(request.notes),
                expires_at: request.expires_at,
            })
            .await?;
        info!(
            document_id,
            shared_with = share.shared_with,
            permission = %share.permission_level,
            "Document shared"
        );
        Ok(share)
    }

    /// Revoke a share. Revoking a missing share is not an error.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing document and `Forbidden` without manage permission.
    pub async fn unshare(
        &self,
        actor: &Actor,
        document_id: i32,
        user_id: i32,
    ) -> Result<(), DocumentError> {
        self.authorize(actor, document_id, PermissionLevel::Manage).await?;
        let removed = self.repo.unshare(document_id, user_id).await?;
        debug!(document_id, user_id, removed, "Document unshared");
        Ok(())
    }

    /// Shares of a document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing document and `Forbidden` without manage permission.
    pub async fn shares(
        &self,
        actor: &Actor,
        document_id: i32,
    ) -> Result<Vec<DocumentShare>, DocumentError> {
        self.authorize(actor, document_id, PermissionLevel::Manage).await?;
        self.repo.list_shares(document_id).await
    }

    /// Documents currently shared with the actor, newest share first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn shared_with_me(
        &self,
        actor: &Actor,
    ) -> Result<Vec<SharedDocument>, DocumentError> {
        let now = Utc::now();
        let shared = self.repo.list_shared_with(actor.user_id).await?;
        Ok(shared
            .into_iter()
            .filter(|entry| entry.share.is_active(now))
            .collect())
    }
}
