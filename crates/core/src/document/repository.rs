//! Persistence contract for the document aggregate.

use std::future::Future;

use chrono::NaiveDate;

use super::error::DocumentError;
use super::search::SearchFilters;
use super::types::{
    Document, DocumentShare, DocumentVersion, NewDocument, NewShare, NewVersion, SharedDocument,
};

/// Repository trait for document persistence.
///
/// Implemented by the db crate. Every returned [`Document`] carries its
/// resolved category and full tag list.
pub trait DocumentRepository: Send + Sync {
    /// Insert a document and its tag relations as one unit.
    fn create(
        &self,
        input: NewDocument,
    ) -> impl Future<Output = Result<Document, DocumentError>> + Send;

    /// Append a version with the next free number for the document.
    fn create_version(
        &self,
        input: NewVersion,
    ) -> impl Future<Output = Result<DocumentVersion, DocumentError>> + Send;

    /// Find a document by ID.
    fn find_by_id(
        &self,
        id: i32,
    ) -> impl Future<Output = Result<Option<Document>, DocumentError>> + Send;

    /// Documents of one athlete, newest first.
    fn list_by_athlete(
        &self,
        athlete_id: i32,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents awaiting review, oldest first.
    fn list_pending(&self) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents expiring within `[from, until]`, soonest first.
    fn list_expiring(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents that expired before `today`, oldest expiry first.
    fn list_expired(
        &self,
        today: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Documents matching all present filters.
    fn search(
        &self,
        filters: &SearchFilters,
    ) -> impl Future<Output = Result<Vec<Document>, DocumentError>> + Send;

    /// Approve a document.
    ///
    /// Fails with `NotFound` for a missing id and `InvalidTransition` when
    /// the current status does not allow approval.
    fn validate(
        &self,
        id: i32,
        admin_id: i32,
    ) -> impl Future<Output = Result<Document, DocumentError>> + Send;

    /// Reject a document with a reason. Same failure rules as `validate`.
    fn reject(
        &self,
        id: i32,
        admin_id: i32,
        reason: &str,
    ) -> impl Future<Output = Result<Document, DocumentError>> + Send;

    /// Delete shares, versions and tag relations, then the document row.
    ///
    /// Relation cleanup is best-effort; a missing document row is `NotFound`.
    fn delete(&self, id: i32) -> impl Future<Output = Result<(), DocumentError>> + Send;

    /// Versions of a document, highest number first.
    fn list_versions(
        &self,
        document_id: i32,
    ) -> impl Future<Output = Result<Vec<DocumentVersion>, DocumentError>> + Send;

    /// Create or overwrite the share for `(document_id, shared_with)`.
    fn share(
        &self,
        input: NewShare,
    ) -> impl Future<Output = Result<DocumentShare, DocumentError>> + Send;

    /// Remove a share. Returns whether a row was removed.
    fn unshare(
        &self,
        document_id: i32,
        user_id: i32,
    ) -> impl Future<Output = Result<bool, DocumentError>> + Send;

    /// Shares of a document, newest first.
    fn list_shares(
        &self,
        document_id: i32,
    ) -> impl Future<Output = Result<Vec<DocumentShare>, DocumentError>> + Send;

    /// Shares granted to a user with their documents, newest first.
    /// Expired shares are included.
    fn list_shared_with(
        &self,
        user_id: i32,
    ) -> impl Future<Output = Result<Vec<SharedDocument>, DocumentError>> + Send;
}
