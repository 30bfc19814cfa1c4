//! Storage backend implementation.

use opendal::{Operator, services};

use crate::TRACING_TARGET;
use crate::config::{BackendType, StorageConfig};
use crate::error::{StorageError, StorageResult};

/// Unified storage backend that wraps an OpenDAL operator.
#[derive(Clone)]
pub struct StorageBackend {
    operator: Operator,
    config: StorageConfig,
}

impl StorageBackend {
    /// Creates a new storage backend from configuration.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        config.validate().map_err(StorageError::init)?;
        let operator = Self::create_operator(&config)?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = %config.backend_type,
            root = %config.root,
            "Storage backend initialized"
        );

        Ok(Self { operator, config })
    }

    /// Creates an in-memory storage backend.
    pub fn memory() -> StorageResult<Self> {
        Self::new(StorageConfig::memory())
    }

    /// Returns the configuration for this backend.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the backend type.
    pub fn backend_type(&self) -> BackendType {
        self.config.backend_type
    }

    /// Reads an object from storage.
    pub async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            "Reading object"
        );

        let data = self.operator.read(path).await?.to_vec();

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            size = data.len(),
            "Object read complete"
        );

        Ok(data)
    }

    /// Writes data to an object in storage, replacing any previous content.
    pub async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            size = data.len(),
            "Writing object"
        );

        self.operator.write(path, data).await?;
        Ok(())
    }

    /// Deletes an object. Deleting a missing object is not an error.
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            path = %path,
            "Deleting object"
        );

        self.operator.delete(path).await?;
        Ok(())
    }

    /// Checks if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.operator.exists(path).await?)
    }

    /// Lists object paths under a directory prefix (which must end in `/`).
    ///
    /// Directory entries are not included.
    pub async fn list(&self, dir: &str) -> StorageResult<Vec<String>> {
        if !dir.ends_with('/') {
            return Err(StorageError::invalid_path(format!(
                "list prefix must end with '/': {dir}"
            )));
        }

        let entries = match self.operator.list(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == opendal::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        Ok(entries
            .into_iter()
            .filter(|entry| !entry.path().ends_with('/'))
            .map(|entry| entry.path().to_string())
            .collect())
    }

    /// Creates an OpenDAL operator based on configuration.
    fn create_operator(config: &StorageConfig) -> StorageResult<Operator> {
        match config.backend_type {
            BackendType::Memory => Operator::new(services::Memory::default())
                .map(|op| op.finish())
                .map_err(|e| StorageError::init(e.to_string())),

            BackendType::Fs => Operator::new(services::Fs::default().root(&config.root))
                .map(|op| op.finish())
                .map_err(|e| StorageError::init(e.to_string())),

            #[cfg(feature = "s3")]
            BackendType::S3 => {
                let mut builder = services::S3::default().bucket(&config.root);

                if let Some(ref region) = config.region {
                    builder = builder.region(region);
                }

                if let Some(ref endpoint) = config.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                if let Some(ref access_key_id) = config.access_key_id {
                    builder = builder.access_key_id(access_key_id);
                }

                if let Some(ref secret_access_key) = config.secret_access_key {
                    builder = builder.secret_access_key(secret_access_key);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(not(feature = "s3"))]
            BackendType::S3 => Err(StorageError::init(
                "the s3 backend requires the `s3` feature",
            )),
        }
    }
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("backend", &self.config.backend_type)
            .field("root", &self.config.root)
            .finish()
    }
}
