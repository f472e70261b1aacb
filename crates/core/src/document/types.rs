//! Document domain types.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::DocumentError;
use crate::storage::StorageLocation;

/// Document type assigned when the uploader gives none.
pub const DEFAULT_DOCUMENT_TYPE: &str = "other";

/// Admin review state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// Awaiting review. Every document starts here.
    Pending,
    /// Accepted by an admin.
    Approved,
    /// Refused by an admin.
    Rejected,
}

impl ValidationStatus {
    /// Returns the persisted string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses the persisted string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access granted by a share. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Read and download.
    View,
    /// View plus uploading new versions.
    Edit,
    /// Edit plus sharing and deletion.
    Manage,
}

impl PermissionLevel {
    /// Returns the persisted string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Manage => "manage",
        }
    }
}

impl FromStr for PermissionLevel {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "manage" => Ok(Self::Manage),
            other => Err(DocumentError::validation(format!(
                "invalid permission level '{other}', expected view, edit or manage"
            ))),
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who reviewed a document and when. Both halves are always set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Admin user id.
    #[serde(rename = "validated_by")]
    pub by: i32,
    /// Review timestamp.
    #[serde(rename = "validated_at")]
    pub at: DateTime<Utc>,
}

/// Document category reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional UI color.
    pub color: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Document tag reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag ID.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Optional UI color.
    pub color: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A stored file record belonging to one athlete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Store-assigned ID.
    pub id: i32,
    /// Owning athlete. Never reassigned.
    pub athlete_id: i32,
    /// Free-form classification, e.g. `medical_certificate`.
    pub document_type: String,
    /// Category reference.
    pub category_id: Option<i32>,
    /// Resolved category.
    pub category: Option<Category>,
    /// Name as supplied by the uploader.
    pub file_name: String,
    /// Where the file content lives.
    #[serde(rename = "file_url")]
    pub file_location: StorageLocation,
    /// Size in bytes.
    pub file_size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Review state.
    pub validation_status: ValidationStatus,
    /// Reviewer and review time, present once reviewed.
    #[serde(flatten)]
    pub review: Option<Review>,
    /// Set only while rejected.
    pub rejection_reason: Option<String>,
    /// Server-assigned upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Caller-supplied expiry.
    pub expiry_date: Option<NaiveDate>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Attached tags, ordered by name.
    pub tags: Vec<Tag>,
}

/// An append-only revision of a document's file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentVersion {
    /// Version ID.
    pub id: i32,
    /// Owning document.
    pub document_id: i32,
    /// 1-based, gap-free per document.
    pub version_number: i32,
    /// Name as supplied by the uploader.
    pub file_name: String,
    /// Where the file content lives.
    #[serde(rename = "file_url")]
    pub file_location: StorageLocation,
    /// Size in bytes.
    pub file_size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Uploading user.
    pub uploaded_by: Option<i32>,
    /// Server-assigned upload time.
    pub uploaded_at: DateTime<Utc>,
}

/// A permission grant on a document for another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentShare {
    /// Share ID.
    pub id: i32,
    /// Shared document.
    pub document_id: i32,
    /// Granting user.
    pub shared_by: i32,
    /// Grantee.
    pub shared_with: i32,
    /// Granted access.
    pub permission_level: PermissionLevel,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Time of the latest grant.
    pub shared_at: DateTime<Utc>,
    /// End of the grant, if bounded.
    pub expires_at: Option<DateTime<Utc>>,
}

impl DocumentShare {
    /// True unless the share has an expiry at or before `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// A share paired with the document it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedDocument {
    /// The grant.
    pub share: DocumentShare,
    /// The shared document.
    pub document: Document,
}

/// Insert payload for a document row and its tag relations.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Owning athlete.
    pub athlete_id: i32,
    /// Classification.
    pub document_type: String,
    /// Optional category.
    pub category_id: Option<i32>,
    /// Tags attached in the same unit of work.
    pub tag_ids: Vec<i32>,
    /// Uploaded file name.
    pub file_name: String,
    /// Stored location.
    pub file_location: StorageLocation,
    /// Size in bytes.
    pub file_size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Optional expiry.
    pub expiry_date: Option<NaiveDate>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// Insert payload for a version. The store assigns the number.
#[derive(Debug, Clone)]
pub struct NewVersion {
    /// Owning document.
    pub document_id: i32,
    /// Uploaded file name.
    pub file_name: String,
    /// Stored location.
    pub file_location: StorageLocation,
    /// Size in bytes.
    pub file_size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Uploading user.
    pub uploaded_by: Option<i32>,
}

/// Upsert payload for a share.
#[derive(Debug, Clone)]
pub struct NewShare {
    /// Shared document.
    pub document_id: i32,
    /// Granting user.
    pub shared_by: i32,
    /// Grantee.
    pub shared_with: i32,
    /// Granted access.
    pub permission_level: PermissionLevel,
    /// Free-text notes.
    pub notes: Option<String>,
    /// End of the grant.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Insert payload for a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional UI color.
    pub color: Option<String>,
}

/// Insert payload for a tag.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    /// Display name.
    pub name: String,
    /// Optional UI color.
    pub color: Option<String>,
}

/// Uploaded file content as received from the transport.
#[derive(Debug, Clone)]
pub struct FilePayload {
    /// Name as supplied by the uploader.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// File bytes.
    pub data: Bytes,
}

impl FilePayload {
    /// Size in bytes as stored in the record.
    #[must_use]
    pub fn size(&self) -> i64 {
        i64::try_from(self.data.len()).unwrap_or(i64::MAX)
    }
}

/// Caller-supplied descriptive fields shared by single and bulk uploads.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    /// Classification; empty falls back to [`DEFAULT_DOCUMENT_TYPE`].
    pub document_type: String,
    /// Optional category.
    pub category_id: Option<i32>,
    /// Tags to attach.
    pub tag_ids: Vec<i32>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Optional expiry.
    pub expiry_date: Option<NaiveDate>,
}

impl DocumentMetadata {
    /// Classification with the default applied.
    #[must_use]
    pub fn document_type(&self) -> &str {
        let trimmed = self.document_type.trim();
        if trimmed.is_empty() {
            DEFAULT_DOCUMENT_TYPE
        } else {
            trimmed
        }
    }
}

/// Parse an optional `YYYY-MM-DD` date; blank means absent.
///
/// # Errors
///
/// Returns `DocumentError::Validation` for anything else.
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, DocumentError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                DocumentError::validation(format!("invalid date '{s}', expected YYYY-MM-DD"))
            }),
    }
}

/// Turn blank optional text into `None`.
#[must_use]
pub fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}
