//! Document management for athlete files.
//!
//! This module provides:
//! - The document aggregate with categories, tags, versions and shares
//! - The review state machine (`pending` to `approved` or `rejected`)
//! - Per-document access rules for admins, coaches, athletes and grantees
//! - The search filter vocabulary
//! - Single and concurrent bulk uploads with compensating blob deletes

mod access;
mod bulk;
mod error;
mod repository;
mod review;
mod search;
mod service;
mod types;

#[cfg(test)]
mod tests;

pub use access::{Actor, Role};
pub use bulk::{BulkItem, BulkOutcome, BulkUploadOrchestrator};
pub use error::DocumentError;
pub use repository::DocumentRepository;
pub use review::{ReviewAction, ReviewService};
pub use search::{ALL, LIKE_ESCAPE, SearchFilters, SortOrder};
pub use service::{
    DocumentContent, DocumentService, ShareRequest, athlete_folder, version_folder,
};
pub use types::{
    Category, DEFAULT_DOCUMENT_TYPE, Document, DocumentMetadata, DocumentShare, DocumentVersion,
    FilePayload, NewCategory, NewDocument, NewShare, NewTag, NewVersion, PermissionLevel, Review,
    SharedDocument, Tag, ValidationStatus, non_blank, parse_date,
};
