//! Storage configuration types.

use std::time::Duration;

use clubdocs_shared::config::StorageSettings;
pub use clubdocs_shared::config::StorageProvider;

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Public URL prefix; uploads resolve to remote URLs when set.
    pub public_base_url: Option<String>,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Deadline for a single upload.
    pub upload_timeout: Duration,
    /// Allowed MIME types for upload. Empty allows any.
    pub allowed_mime_types: Vec<String>,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Default upload deadline: 30 seconds.
    pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            public_base_url: None,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            upload_timeout: Self::DEFAULT_UPLOAD_TIMEOUT,
            allowed_mime_types: clubdocs_shared::config::default_mime_types(),
        }
    }

    /// Build from the `storage` configuration section.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            public_base_url: settings
                .public_base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            max_file_size: settings.max_file_size_bytes,
            upload_timeout: Duration::from_secs(settings.upload_timeout_secs),
            allowed_mime_types: settings.allowed_mime_types.clone(),
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the public URL prefix.
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the upload deadline.
    #[must_use]
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set allowed MIME types.
    #[must_use]
    pub fn with_allowed_mime_types(mut self, types: Vec<String>) -> Self {
        self.allowed_mime_types = types;
        self
    }

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.is_empty() || self.allowed_mime_types.iter().any(|t| t == mime_type)
    }
}
