//! Workflow service: the mutation and run surface.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::WorkflowStore;
use crate::engine::{Engine, InitialData, RunOptions, RunReport};
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::{
    ConnectionId, ConnectionRequest, NodeInstance, NodeStatus, Position, WorkflowDefinition,
    WorkflowGraph, WorkflowId, WorkflowMetadata,
};
use crate::node::{ConfigField, NodeConfig, NodeId, NodeRegistry};

/// Tracing target for service operations.
const TRACING_TARGET: &str = "docr_runtime::service";

/// Initial-data key receiving the workflow's custom prompt.
pub const CUSTOM_PROMPT_SLOT: &str = "custom_prompt";

type SharedGraph = Arc<Mutex<WorkflowGraph>>;

/// Owns live workflows and serializes their mutations.
///
/// Each workflow sits behind its own mutex, so validation and apply happen
/// atomically per operation while different workflows are edited
/// independently. Runs work on a snapshot and never hold the lock while
/// nodes execute.
///
/// Workflows are cached on creation or first load and evicted on delete.
/// Without a store the service works purely in memory.
#[derive(Clone)]
pub struct WorkflowService {
    registry: Arc<NodeRegistry>,
    engine: Arc<Engine>,
    store: Option<Arc<dyn WorkflowStore>>,
    workflows: Arc<RwLock<HashMap<WorkflowId, SharedGraph>>>,
}

impl WorkflowService {
    /// Creates an in-memory service.
    pub fn new(registry: NodeRegistry, engine: Engine) -> Self {
        tracing::warn!(
            target: TRACING_TARGET,
            "No workflow store configured, workflows will not be persisted"
        );
        Self::build(registry, engine, None)
    }

    /// Creates a service persisting workflows to `store`.
    pub fn with_store(
        registry: NodeRegistry,
        engine: Engine,
        store: impl WorkflowStore + 'static,
    ) -> Self {
        tracing::info!(target: TRACING_TARGET, "Workflow service initialized with persistence");
        Self::build(registry, engine, Some(Arc::new(store)))
    }

    fn build(
        registry: NodeRegistry,
        engine: Engine,
        store: Option<Arc<dyn WorkflowStore>>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            engine: Arc::new(engine),
            store,
            workflows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the node registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Returns the execution engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns whether a store is configured.
    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Creates an empty workflow.
    pub async fn create_workflow(&self, metadata: WorkflowMetadata) -> WorkflowResult<WorkflowId> {
        self.insert(WorkflowGraph::new(metadata)).await
    }

    /// Adds a workflow from a definition, validating every node and
    /// connection.
    ///
    /// Fails with [`WorkflowError::DuplicateWorkflow`] if a live or stored
    /// workflow already uses the definition's id.
    pub async fn import(&self, definition: WorkflowDefinition) -> WorkflowResult<WorkflowId> {
        let graph = WorkflowGraph::from_definition(definition, &self.registry)?;

        if let Some(store) = &self.store
            && store.load(graph.id()).await?.is_some()
        {
            return Err(WorkflowError::DuplicateWorkflow(graph.id()));
        }

        self.insert(graph).await
    }

    async fn insert(&self, graph: WorkflowGraph) -> WorkflowResult<WorkflowId> {
        let id = graph.id();
        let definition = graph.to_definition();

        match self.workflows.write().await.entry(id) {
            Entry::Occupied(_) => return Err(WorkflowError::DuplicateWorkflow(id)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(graph)));
            }
        }
        self.persist(&definition).await;

        tracing::info!(target: TRACING_TARGET, workflow_id = %id, name = %definition.metadata.name, "Workflow created");
        Ok(id)
    }

    /// Deletes a workflow with its nodes and connections.
    pub async fn delete_workflow(&self, id: WorkflowId) -> WorkflowResult<()> {
        let cached = self.workflows.write().await.remove(&id).is_some();

        let stored = match &self.store {
            Some(store) => {
                let stored = match store.load(id).await {
                    Ok(definition) => definition.is_some(),
                    Err(err) => {
                        tracing::warn!(target: TRACING_TARGET, workflow_id = %id, error = %err, "Failed to look up workflow");
                        false
                    }
                };
                if let Err(err) = store.delete(id).await {
                    tracing::warn!(target: TRACING_TARGET, workflow_id = %id, error = %err, "Failed to delete persisted workflow");
                }
                stored
            }
            None => false,
        };

        if !cached && !stored {
            return Err(WorkflowError::UnknownWorkflow(id));
        }

        tracing::info!(target: TRACING_TARGET, workflow_id = %id, "Workflow deleted");
        Ok(())
    }

    /// Lists known workflow ids, cached and stored.
    pub async fn list_workflows(&self) -> Vec<WorkflowId> {
        let mut ids: BTreeSet<WorkflowId> = self.workflows.read().await.keys().copied().collect();

        if let Some(store) = &self.store {
            match store.list().await {
                Ok(stored) => ids.extend(stored),
                Err(err) => {
                    tracing::warn!(target: TRACING_TARGET, error = %err, "Failed to list persisted workflows");
                }
            }
        }

        ids.into_iter().collect()
    }

    /// Returns the serializable form of a workflow.
    pub async fn definition(&self, id: WorkflowId) -> WorkflowResult<WorkflowDefinition> {
        let handle = self.handle(id).await?;
        let graph = handle.lock().await;
        Ok(graph.to_definition())
    }

    /// Returns an immutable copy of a workflow.
    pub async fn snapshot(&self, id: WorkflowId) -> WorkflowResult<WorkflowGraph> {
        let handle = self.handle(id).await?;
        let graph = handle.lock().await;
        Ok(graph.clone())
    }

    /// Updates name, description or custom prompt.
    pub async fn update_metadata(
        &self,
        id: WorkflowId,
        update: impl FnOnce(&mut WorkflowMetadata),
    ) -> WorkflowResult<()> {
        self.mutate(id, |graph| {
            update(&mut graph.metadata);
            Ok(())
        })
        .await
    }

    /// Adds a node of a registered type.
    pub async fn add_node(
        &self,
        id: WorkflowId,
        node_type: &str,
        config: NodeConfig,
        position: Position,
    ) -> WorkflowResult<NodeId> {
        let processor = self.registry.instantiate(node_type, &config)?;
        let node = NodeInstance::new(node_type, config, position, processor);
        self.mutate(id, |graph| graph.add_node(node)).await
    }

    /// Replaces a node's configuration.
    pub async fn update_node_config(
        &self,
        id: WorkflowId,
        node: NodeId,
        config: NodeConfig,
    ) -> WorkflowResult<()> {
        self.mutate(id, |graph| graph.update_config(node, config, &self.registry))
            .await
    }

    /// Moves a node on the canvas.
    pub async fn update_node_position(
        &self,
        id: WorkflowId,
        node: NodeId,
        position: Position,
    ) -> WorkflowResult<()> {
        self.mutate(id, |graph| graph.set_position(node, position))
            .await
    }

    /// Sets or clears a node's display name.
    pub async fn rename_node(
        &self,
        id: WorkflowId,
        node: NodeId,
        name: Option<String>,
    ) -> WorkflowResult<()> {
        self.mutate(id, |graph| graph.rename(node, name)).await
    }

    /// Removes a node and its connections.
    pub async fn remove_node(&self, id: WorkflowId, node: NodeId) -> WorkflowResult<()> {
        self.mutate(id, |graph| graph.remove_node(node).map(|_| ()))
            .await
    }

    /// Connects an output slot to an input slot.
    pub async fn connect(
        &self,
        id: WorkflowId,
        request: ConnectionRequest,
    ) -> WorkflowResult<ConnectionId> {
        self.mutate(id, |graph| graph.connect(request)).await
    }

    /// Removes a connection.
    pub async fn disconnect(&self, id: WorkflowId, connection: ConnectionId) -> WorkflowResult<()> {
        self.mutate(id, |graph| graph.remove_connection(connection).map(|_| ()))
            .await
    }

    /// Returns the configuration fields of a node type.
    pub fn node_config_schema(&self, node_type: &str) -> WorkflowResult<Vec<ConfigField>> {
        self.registry.config_schema(node_type)
    }

    /// Runs a workflow with default options.
    pub async fn execute(&self, id: WorkflowId, initial: InitialData) -> WorkflowResult<RunReport> {
        self.execute_with(id, initial, RunOptions::default()).await
    }

    /// Runs a workflow.
    ///
    /// The workflow's custom prompt is supplied as `custom_prompt` unless
    /// `initial` already has it. Final node statuses are copied back onto
    /// the live workflow once the run ends; nodes an interrupted run left
    /// running are written back as pending.
    pub async fn execute_with(
        &self,
        id: WorkflowId,
        mut initial: InitialData,
        options: RunOptions,
    ) -> WorkflowResult<RunReport> {
        let handle = self.handle(id).await?;
        let snapshot = handle.lock().await.clone();

        if let Some(prompt) = &snapshot.metadata.custom_prompt {
            if !initial.contains_key(CUSTOM_PROMPT_SLOT) {
                initial.set(CUSTOM_PROMPT_SLOT, prompt.as_str());
            }
        }

        let report = self.engine.execute_with(&snapshot, initial, options).await?;

        let definition = {
            let mut graph = handle.lock().await;
            for record in &report.nodes {
                if !graph.contains_node(record.node_id) {
                    continue;
                }
                let status = if record.status.is_terminal() {
                    record.status
                } else {
                    NodeStatus::Pending
                };
                graph.set_status(record.node_id, status)?;
            }
            graph.to_definition()
        };
        self.persist(&definition).await;

        Ok(report)
    }

    /// Returns the live workflow, loading it from the store on a cache miss.
    async fn handle(&self, id: WorkflowId) -> WorkflowResult<SharedGraph> {
        if let Some(handle) = self.workflows.read().await.get(&id) {
            return Ok(handle.clone());
        }

        let Some(store) = &self.store else {
            return Err(WorkflowError::UnknownWorkflow(id));
        };

        let definition = store
            .load(id)
            .await?
            .ok_or(WorkflowError::UnknownWorkflow(id))?;
        let graph = WorkflowGraph::from_definition(definition, &self.registry)?;

        tracing::debug!(target: TRACING_TARGET, workflow_id = %id, "Workflow loaded into cache");

        let mut workflows = self.workflows.write().await;
        let handle = workflows
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(graph)));
        Ok(handle.clone())
    }

    /// Applies a mutation under the workflow lock and persists the result.
    ///
    /// The closure must leave the graph unchanged when it fails.
    async fn mutate<T>(
        &self,
        id: WorkflowId,
        apply: impl FnOnce(&mut WorkflowGraph) -> WorkflowResult<T>,
    ) -> WorkflowResult<T> {
        let handle = self.handle(id).await?;
        let mut graph = handle.lock().await;

        let output = apply(&mut *graph).inspect_err(|err| {
            tracing::debug!(target: TRACING_TARGET, workflow_id = %id, kind = err.kind().as_ref(), error = %err, "Mutation rejected");
        })?;

        graph.metadata.touch();
        self.persist(&graph.to_definition()).await;
        Ok(output)
    }

    async fn persist(&self, definition: &WorkflowDefinition) {
        let Some(store) = &self.store else {
            return;
        };

        if let Err(err) = store.save(definition).await {
            tracing::warn!(
                target: TRACING_TARGET,
                workflow_id = %definition.id,
                error = %err,
                "Failed to persist workflow"
            );
        }
    }
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("registry", &self.registry)
            .field("engine", &self.engine)
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}
