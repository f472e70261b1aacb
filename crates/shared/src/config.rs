//! Application configuration management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Document lifecycle tuning.
    #[serde(default)]
    pub documents: DocumentSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Storage provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create local filesystem provider.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Short provider name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }
}

impl Default for StorageProvider {
    fn default() -> Self {
        Self::local_fs("./storage")
    }
}

/// Object storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Backend that holds document bytes.
    #[serde(default)]
    pub provider: StorageProvider,
    /// Public URL prefix for stored objects. When set, uploads are recorded
    /// as remote URLs; otherwise as provider-relative paths.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Largest single file accepted.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Largest multipart request body accepted (bulk uploads).
    #[serde(default = "default_max_request_size")]
    pub max_request_size_bytes: u64,
    /// Per-upload deadline.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
    /// Accepted MIME types. Empty accepts any type.
    #[serde(default = "default_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            public_base_url: None,
            max_file_size_bytes: default_max_file_size(),
            max_request_size_bytes: default_max_request_size(),
            upload_timeout_secs: default_upload_timeout(),
            allowed_mime_types: default_mime_types(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_request_size() -> u64 {
    50 * 1024 * 1024
}

fn default_upload_timeout() -> u64 {
    30
}

/// Default accepted MIME types for club documents.
#[must_use]
pub fn default_mime_types() -> Vec<String> {
    [
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "text/plain",
        "image/png",
        "image/jpeg",
        "image/gif",
        "image/webp",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Document lifecycle settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSettings {
    /// Days ahead that count as "expiring".
    #[serde(default = "default_expiring_window")]
    pub expiring_window_days: u32,
    /// Attempts at assigning a version number before giving up.
    #[serde(default = "default_version_retry_attempts")]
    pub version_retry_attempts: u32,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            expiring_window_days: default_expiring_window(),
            version_retry_attempts: default_version_retry_attempts(),
        }
    }
}

fn default_expiring_window() -> u32 {
    30
}

fn default_version_retry_attempts() -> u32 {
    3
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CLUBDOCS").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
