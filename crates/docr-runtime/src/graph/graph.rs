//! Mutable workflow graph.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use super::validator::validate_connection;
use super::{
    Connection, ConnectionRequest, NodeInstance, NodeStatus, Position, WorkflowDefinition,
    WorkflowMetadata,
};
use crate::error::{SlotDirection, WorkflowError, WorkflowResult};
use crate::id::{ConnectionId, WorkflowId};
use crate::node::{NodeConfig, NodeId, NodeRegistry};

/// Tracing target for graph mutations.
const TRACING_TARGET: &str = "docr_runtime::graph";

/// A workflow: nodes bound to processors plus validated connections.
///
/// Backed by a petgraph `StableDiGraph` so indices survive removals. Every
/// mutation either keeps the graph a valid DAG or fails without changing it.
/// Cloning is cheap enough to snapshot a graph for a run; processors are
/// shared.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    id: WorkflowId,
    graph: StableDiGraph<NodeInstance, Connection>,
    node_indices: HashMap<NodeId, NodeIndex>,
    edge_indices: HashMap<ConnectionId, EdgeIndex>,
    /// Node ids in insertion order.
    order: Vec<NodeId>,
    /// Insertion rank of each node, increasing and never reused.
    ranks: HashMap<NodeId, u64>,
    next_rank: u64,
    /// Workflow metadata.
    pub metadata: WorkflowMetadata,
}

impl WorkflowGraph {
    /// Creates an empty workflow with a fresh id.
    pub fn new(metadata: WorkflowMetadata) -> Self {
        Self::with_id(WorkflowId::new(), metadata)
    }

    /// Creates an empty workflow with a specific id.
    pub fn with_id(id: WorkflowId, metadata: WorkflowMetadata) -> Self {
        Self {
            id,
            graph: StableDiGraph::new(),
            node_indices: HashMap::new(),
            edge_indices: HashMap::new(),
            order: Vec::new(),
            ranks: HashMap::new(),
            next_rank: 0,
            metadata,
        }
    }

    /// Returns the workflow id.
    pub fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of connections.
    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the workflow has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Adds a node, rejecting a duplicate id.
    pub fn add_node(&mut self, node: NodeInstance) -> WorkflowResult<NodeId> {
        let id = node.id;
        if self.node_indices.contains_key(&id) {
            return Err(WorkflowError::DuplicateNode(id));
        }

        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %self.id,
            node_id = %id,
            node_type = %node.node_type,
            "Node added"
        );

        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        self.order.push(id);
        self.ranks.insert(id, self.next_rank);
        self.next_rank += 1;
        Ok(id)
    }

    /// Returns a node.
    pub fn get_node(&self, id: NodeId) -> Option<&NodeInstance> {
        let index = self.node_indices.get(&id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a node or [`WorkflowError::UnknownNode`].
    pub fn node(&self, id: NodeId) -> WorkflowResult<&NodeInstance> {
        self.get_node(id).ok_or(WorkflowError::UnknownNode(id))
    }

    fn index_of(&self, id: NodeId) -> WorkflowResult<NodeIndex> {
        self.node_indices
            .get(&id)
            .copied()
            .ok_or(WorkflowError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> WorkflowResult<&mut NodeInstance> {
        let index = self.index_of(id)?;
        self.graph
            .node_weight_mut(index)
            .ok_or(WorkflowError::UnknownNode(id))
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_indices.contains_key(&id)
    }

    /// Returns node ids in insertion order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInstance> {
        self.order.iter().filter_map(|id| self.get_node(*id))
    }

    /// Replaces a node's configuration and rebinds its processor.
    ///
    /// Fails without mutation if the registry rejects the configuration or
    /// if an existing connection uses a slot the new processor no longer
    /// declares.
    pub fn update_config(
        &mut self,
        id: NodeId,
        config: NodeConfig,
        registry: &NodeRegistry,
    ) -> WorkflowResult<()> {
        let node = self.node(id)?;
        let processor = registry.instantiate(&node.node_type, &config)?;
        let descriptor = processor.descriptor();

        for connection in self.incoming(id) {
            if !descriptor.has_input(&connection.target_slot) {
                return Err(WorkflowError::InvalidSlot {
                    node_id: id,
                    node_type: node.node_type.clone(),
                    direction: SlotDirection::Input,
                    slot: connection.target_slot.clone(),
                });
            }
        }
        for connection in self.outgoing(id) {
            if !descriptor.has_output(&connection.source_slot) {
                return Err(WorkflowError::InvalidSlot {
                    node_id: id,
                    node_type: node.node_type.clone(),
                    direction: SlotDirection::Output,
                    slot: connection.source_slot.clone(),
                });
            }
        }

        let node = self.node_mut(id)?;
        if let Some(name) = config.name() {
            node.name = Some(name.to_owned());
        }
        node.rebind(config, processor);

        tracing::debug!(target: TRACING_TARGET, workflow_id = %self.id, node_id = %id, "Node config updated");
        Ok(())
    }

    /// Moves a node on the canvas.
    pub fn set_position(&mut self, id: NodeId, position: Position) -> WorkflowResult<()> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// Sets or clears a node's display name.
    pub fn rename(&mut self, id: NodeId, name: Option<String>) -> WorkflowResult<()> {
        self.node_mut(id)?.name = name;
        Ok(())
    }

    /// Records a node's status from the latest run.
    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) -> WorkflowResult<()> {
        self.node_mut(id)?.status = status;
        Ok(())
    }

    /// Resets every node to [`NodeStatus::Pending`].
    pub fn reset_statuses(&mut self) {
        for node in self.graph.node_weights_mut() {
            node.status = NodeStatus::Pending;
        }
    }

    /// Removes a node together with every connection touching it.
    pub fn remove_node(&mut self, id: NodeId) -> WorkflowResult<NodeInstance> {
        let index = self.index_of(id)?;

        let removed: Vec<ConnectionId> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .chain(self.graph.edges_directed(index, Direction::Outgoing))
            .map(|edge| edge.weight().id)
            .collect();
        for connection_id in &removed {
            self.edge_indices.remove(connection_id);
        }

        let node = self
            .graph
            .remove_node(index)
            .ok_or(WorkflowError::UnknownNode(id))?;
        self.node_indices.remove(&id);
        self.order.retain(|other| *other != id);
        self.ranks.remove(&id);

        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %self.id,
            node_id = %id,
            removed_connections = removed.len(),
            "Node removed"
        );

        Ok(node)
    }

    /// Validates and adds a connection with a fresh id.
    pub fn connect(&mut self, request: ConnectionRequest) -> WorkflowResult<ConnectionId> {
        self.add_connection(Connection::new(request))
    }

    /// Validates and adds a connection, keeping its id.
    pub fn add_connection(&mut self, connection: Connection) -> WorkflowResult<ConnectionId> {
        validate_connection(self, &ConnectionRequest::from(&connection))?;

        if self.edge_indices.contains_key(&connection.id) {
            return Err(WorkflowError::Internal(format!(
                "connection {} already exists",
                connection.id
            )));
        }

        let source = self.index_of(connection.source)?;
        let target = self.index_of(connection.target)?;
        let id = connection.id;

        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %self.id,
            connection_id = %id,
            source = %connection.source,
            source_slot = %connection.source_slot,
            target = %connection.target,
            target_slot = %connection.target_slot,
            "Connection added"
        );

        let index = self.graph.add_edge(source, target, connection);
        self.edge_indices.insert(id, index);
        Ok(id)
    }

    /// Removes a connection.
    pub fn remove_connection(&mut self, id: ConnectionId) -> WorkflowResult<Connection> {
        let index = self
            .edge_indices
            .remove(&id)
            .ok_or(WorkflowError::UnknownConnection(id))?;
        let connection = self
            .graph
            .remove_edge(index)
            .ok_or(WorkflowError::UnknownConnection(id))?;

        tracing::debug!(target: TRACING_TARGET, workflow_id = %self.id, connection_id = %id, "Connection removed");
        Ok(connection)
    }

    /// Returns a connection.
    pub fn get_connection(&self, id: ConnectionId) -> Option<&Connection> {
        let index = self.edge_indices.get(&id)?;
        self.graph.edge_weight(*index)
    }

    /// Returns all connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.graph.edge_weights()
    }

    /// Returns connections into a node.
    pub fn incoming(&self, id: NodeId) -> Vec<&Connection> {
        self.edges(id, Direction::Incoming)
    }

    /// Returns connections out of a node.
    pub fn outgoing(&self, id: NodeId) -> Vec<&Connection> {
        self.edges(id, Direction::Outgoing)
    }

    fn edges(&self, id: NodeId, direction: Direction) -> Vec<&Connection> {
        let Some(index) = self.node_indices.get(&id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(*index, direction)
            .map(|edge| edge.weight())
            .collect()
    }

    /// Returns the connection writing an input slot, if any.
    pub fn bound_connection(&self, target: NodeId, slot: &str) -> Option<ConnectionId> {
        self.incoming(target)
            .into_iter()
            .find(|connection| connection.target_slot == slot)
            .map(|connection| connection.id)
    }

    /// Returns the direct upstream nodes of a node, in insertion order.
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        let mut sources: Vec<NodeId> = self
            .incoming(id)
            .into_iter()
            .map(|connection| connection.source)
            .collect();
        sources.sort_by_key(|source| self.ranks.get(source).copied());
        sources.dedup();
        sources
    }

    /// Returns whether `to` is reachable from `from` over existing
    /// connections.
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        match (self.node_indices.get(&from), self.node_indices.get(&to)) {
            (Some(from), Some(to)) => has_path_connecting(&self.graph, *from, *to, None),
            _ => false,
        }
    }

    /// Returns the serializable form of the workflow.
    pub fn to_definition(&self) -> WorkflowDefinition {
        WorkflowDefinition {
            id: self.id,
            metadata: self.metadata.clone(),
            nodes: self.nodes().map(NodeInstance::to_record).collect(),
            connections: self.connections().cloned().collect(),
        }
    }

    /// Rebuilds a workflow from its serialized form.
    ///
    /// Every node is resolved through the registry and every connection is
    /// re-validated in order, so a corrupted definition is rejected.
    pub fn from_definition(
        definition: WorkflowDefinition,
        registry: &NodeRegistry,
    ) -> WorkflowResult<Self> {
        let mut graph = Self::with_id(definition.id, definition.metadata);

        for record in definition.nodes {
            let processor = registry.instantiate(&record.node_type, &record.config)?;
            let mut node = NodeInstance::with_id(
                record.id,
                record.node_type,
                record.config,
                record.position,
                processor,
            );
            node.name = record.name;
            node.status = record.status;
            graph.add_node(node)?;
        }

        for connection in definition.connections {
            graph.add_connection(connection)?;
        }

        Ok(graph)
    }
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::new(WorkflowMetadata::default())
    }
}
