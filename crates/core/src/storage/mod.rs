//! Object storage for document bytes using Apache OpenDAL.
//!
//! Supported backends:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem
//!
//! The document layer only sees the [`ObjectStore`] contract: hand over bytes
//! plus a name and folder, get back a [`StorageLocation`] or an error. Each
//! upload is a single attempt bounded by the configured timeout.

mod config;
mod error;
mod location;
mod service;

use std::future::Future;

use bytes::Bytes;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use location::StorageLocation;
pub use service::{StorageService, sanitize_filename};

/// A single object to store.
#[derive(Debug, Clone)]
pub struct ObjectUpload {
    /// File content.
    pub data: Bytes,
    /// Name as supplied by the uploader.
    pub file_name: String,
    /// Folder the object is placed under, without trailing slash.
    pub folder: String,
    /// MIME type.
    pub content_type: String,
}

/// Contract the document layer needs from a blob store.
pub trait ObjectStore: Send + Sync {
    /// Store an object and return where it landed.
    fn upload(
        &self,
        upload: ObjectUpload,
    ) -> impl Future<Output = Result<StorageLocation, StorageError>> + Send;

    /// Delete a previously stored object.
    fn remove(
        &self,
        location: &StorageLocation,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Read an object's bytes back.
    fn read(
        &self,
        location: &StorageLocation,
    ) -> impl Future<Output = Result<Bytes, StorageError>> + Send;
}
