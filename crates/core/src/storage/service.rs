//! Storage service implementation using Apache OpenDAL.

use bytes::Bytes;
use opendal::{Operator, services};
use uuid::Uuid;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;
use super::location::StorageLocation;
use super::{ObjectStore, ObjectUpload};

/// OpenDAL-backed object store for document files.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.config.provider.name())
            .field("public_base_url", &self.config.public_base_url)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder).map(opendal::OperatorBuilder::finish)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);
                Operator::new(builder).map(opendal::OperatorBuilder::finish)
            }
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                Operator::new(services::Fs::default().root(root))
                    .map(opendal::OperatorBuilder::finish)
            }
        };

        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Validate an upload against the size limit and MIME allow-list.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate_upload(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }

        if !self.config.is_mime_type_allowed(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }

        Ok(())
    }

    /// Generate the object key for an upload.
    ///
    /// Format: `{folder}/{uuid}_{sanitized_filename}`
    #[must_use]
    pub fn generate_storage_key(folder: &str, file_name: &str) -> String {
        format!(
            "{}/{}_{}",
            folder.trim_end_matches('/'),
            Uuid::new_v4().simple(),
            sanitize_filename(file_name)
        )
    }

    /// Map a location back to a provider key.
    fn key_for(&self, location: &StorageLocation) -> Result<String, StorageError> {
        match location {
            StorageLocation::Local(key) => Ok(key.clone()),
            StorageLocation::Remote(url) => self
                .config
                .public_base_url
                .as_deref()
                .and_then(|base| url.strip_prefix(base))
                .map(|key| key.trim_start_matches('/').to_string())
                .ok_or_else(|| StorageError::InvalidKey(url.clone())),
        }
    }

    fn location_for(&self, key: String) -> StorageLocation {
        match &self.config.public_base_url {
            Some(base) => StorageLocation::Remote(format!("{base}/{key}")),
            None => StorageLocation::Local(key),
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }
}

impl ObjectStore for StorageService {
    async fn upload(&self, upload: ObjectUpload) -> Result<StorageLocation, StorageError> {
        let size = u64::try_from(upload.data.len()).unwrap_or(u64::MAX);
        self.validate_upload(&upload.content_type, size)?;

        let key = Self::generate_storage_key(&upload.folder, &upload.file_name);

        let write = self.operator.write_with(&key, upload.data);
        let write = if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            write.content_type(&upload.content_type)
        } else {
            write
        };

        tokio::time::timeout(self.config.upload_timeout, write)
            .await
            .map_err(|_| StorageError::Timeout {
                secs: self.config.upload_timeout.as_secs(),
            })??;

        Ok(self.location_for(key))
    }

    async fn remove(&self, location: &StorageLocation) -> Result<(), StorageError> {
        let key = self.key_for(location)?;
        self.operator.delete(&key).await.map_err(StorageError::from)
    }

    async fn read(&self, location: &StorageLocation) -> Result<Bytes, StorageError> {
        let key = self.key_for(location)?;
        let buffer = self.operator.read(&key).await?;
        Ok(buffer.to_bytes())
    }
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
