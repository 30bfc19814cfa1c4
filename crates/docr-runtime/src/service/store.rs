//! Workflow persistence.

use async_trait::async_trait;
use docr_opendal::StorageBackend;

use crate::error::WorkflowResult;
use crate::graph::{WorkflowDefinition, WorkflowId};

/// Tracing target for persistence operations.
const TRACING_TARGET: &str = "docr_runtime::service::store";

/// Default directory holding workflow definitions.
pub const DEFAULT_WORKFLOW_PREFIX: &str = "workflows/";

/// Loads and saves workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads a definition, returning `None` when it does not exist.
    async fn load(&self, id: WorkflowId) -> WorkflowResult<Option<WorkflowDefinition>>;

    /// Creates or replaces a definition.
    async fn save(&self, definition: &WorkflowDefinition) -> WorkflowResult<()>;

    /// Deletes a definition. Deleting a missing definition is not an error.
    async fn delete(&self, id: WorkflowId) -> WorkflowResult<()>;

    /// Lists the ids of all stored definitions.
    async fn list(&self) -> WorkflowResult<Vec<WorkflowId>>;
}

/// Stores definitions as JSON objects under `workflows/<id>.json`.
#[derive(Debug, Clone)]
pub struct StorageWorkflowStore {
    backend: StorageBackend,
    prefix: String,
}

impl StorageWorkflowStore {
    /// Creates a store over a storage backend.
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend,
            prefix: DEFAULT_WORKFLOW_PREFIX.to_owned(),
        }
    }

    /// Uses a different directory, which must end in `/`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    fn path(&self, id: WorkflowId) -> String {
        format!("{}{}.json", self.prefix, id)
    }
}

#[async_trait]
impl WorkflowStore for StorageWorkflowStore {
    async fn load(&self, id: WorkflowId) -> WorkflowResult<Option<WorkflowDefinition>> {
        let bytes = match self.backend.read(&self.path(id)).await {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let definition: WorkflowDefinition = serde_json::from_slice(&bytes)?;
        tracing::debug!(target: TRACING_TARGET, workflow_id = %id, "Workflow loaded");
        Ok(Some(definition))
    }

    async fn save(&self, definition: &WorkflowDefinition) -> WorkflowResult<()> {
        let bytes = serde_json::to_vec(definition)?;
        self.backend.write(&self.path(definition.id), bytes).await?;
        tracing::debug!(target: TRACING_TARGET, workflow_id = %definition.id, "Workflow saved");
        Ok(())
    }

    async fn delete(&self, id: WorkflowId) -> WorkflowResult<()> {
        self.backend.delete(&self.path(id)).await?;
        tracing::debug!(target: TRACING_TARGET, workflow_id = %id, "Workflow deleted");
        Ok(())
    }

    async fn list(&self) -> WorkflowResult<Vec<WorkflowId>> {
        let paths = self.backend.list(&self.prefix).await?;

        let mut ids: Vec<WorkflowId> = paths
            .iter()
            .filter_map(|path| {
                let name = path.rsplit('/').next()?.strip_suffix(".json")?;
                match name.parse() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::warn!(target: TRACING_TARGET, path = %path, "Ignoring unrecognized object");
                        None
                    }
                }
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}
