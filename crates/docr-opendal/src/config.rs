//! Storage configuration types.

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Storage service behind a [`StorageBackend`](crate::StorageBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendType {
    /// Process-local memory.
    #[default]
    Memory,
    /// Local filesystem directory.
    Fs,
    /// Amazon S3 compatible storage.
    S3,
}

/// Storage backend configuration.
///
/// `root` is interpreted per backend: ignored for `memory`, the directory
/// for `fs` and the bucket name for `s3`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StorageConfig {
    /// Storage backend type.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-backend", env = "DOCR_STORAGE_BACKEND", value_enum, default_value_t = BackendType::Memory)
    )]
    #[serde(default)]
    pub backend_type: BackendType,

    /// Backend root (directory for `fs`, bucket for `s3`).
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-root", env = "DOCR_STORAGE_ROOT", default_value = "")
    )]
    #[serde(default)]
    pub root: String,

    /// Region for `s3`.
    #[cfg_attr(feature = "config", arg(long = "storage-region", env = "DOCR_STORAGE_REGION"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services.
    #[cfg_attr(feature = "config", arg(long = "storage-endpoint", env = "DOCR_STORAGE_ENDPOINT"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Access key ID for `s3`.
    #[cfg_attr(feature = "config", arg(long = "storage-access-key-id", env = "DOCR_STORAGE_ACCESS_KEY_ID"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// Secret access key for `s3`.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-secret-access-key", env = "DOCR_STORAGE_SECRET_ACCESS_KEY", hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
}

impl StorageConfig {
    /// Creates an in-memory storage configuration.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Creates a local filesystem configuration rooted at `root`.
    pub fn fs(root: impl Into<String>) -> Self {
        Self {
            backend_type: BackendType::Fs,
            root: root.into(),
            ..Self::default()
        }
    }

    /// Creates an S3 configuration for `bucket` in `region`.
    pub fn s3(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            backend_type: BackendType::S3,
            root: bucket.into(),
            region: Some(region.into()),
            ..Self::default()
        }
    }

    /// Sets the custom endpoint (for S3-compatible storage).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the access credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Validates the configuration for the selected backend.
    pub fn validate(&self) -> Result<(), String> {
        match self.backend_type {
            BackendType::Memory => Ok(()),
            BackendType::Fs | BackendType::S3 if self.root.trim().is_empty() => Err(format!(
                "storage root is required for the {} backend",
                self.backend_type
            )),
            BackendType::Fs | BackendType::S3 => Ok(()),
        }
    }
}
