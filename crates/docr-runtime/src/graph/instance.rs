//! Placed node instances.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::node::{NodeConfig, NodeDescriptor, NodeId, NodeProcessor};

/// Runtime status of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet visited in the current run.
    #[default]
    Pending,
    /// Currently processing.
    Running,
    /// Finished and produced outputs.
    Succeeded,
    /// Finished with a failure.
    Failed,
    /// Not invoked because an upstream node failed or was skipped.
    Skipped,
}

impl NodeStatus {
    /// Returns whether the status is final for a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Returns whether dependents of a node in this status must be skipped.
    pub fn blocks_dependents(self) -> bool {
        matches!(self, Self::Failed | Self::Skipped)
    }
}

/// Canvas position of a node. Display metadata only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Creates a position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node placed in a workflow, bound to its processor.
#[derive(Debug, Clone)]
pub struct NodeInstance {
    /// Node identifier.
    pub id: NodeId,
    /// Registry key of the node type.
    pub node_type: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Type-specific configuration.
    pub config: NodeConfig,
    /// Canvas position.
    pub position: Position,
    /// Status of the most recent run.
    pub status: NodeStatus,
    processor: Arc<dyn NodeProcessor>,
}

impl NodeInstance {
    /// Creates a pending node with a fresh id.
    pub fn new(
        node_type: impl Into<String>,
        config: NodeConfig,
        position: Position,
        processor: Arc<dyn NodeProcessor>,
    ) -> Self {
        Self::with_id(NodeId::new(), node_type, config, position, processor)
    }

    /// Creates a pending node with a specific id.
    pub fn with_id(
        id: NodeId,
        node_type: impl Into<String>,
        config: NodeConfig,
        position: Position,
        processor: Arc<dyn NodeProcessor>,
    ) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            name: config.name().map(str::to_owned),
            config,
            position,
            status: NodeStatus::Pending,
            processor,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the slot declaration of the bound processor.
    pub fn descriptor(&self) -> &NodeDescriptor {
        self.processor.descriptor()
    }

    /// Returns the bound processor.
    pub fn processor(&self) -> &Arc<dyn NodeProcessor> {
        &self.processor
    }

    pub(crate) fn rebind(&mut self, config: NodeConfig, processor: Arc<dyn NodeProcessor>) {
        self.config = config;
        self.processor = processor;
    }

    /// Returns the serializable part of the node.
    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id,
            node_type: self.node_type.clone(),
            name: self.name.clone(),
            config: self.config.clone(),
            position: self.position,
            status: self.status,
        }
    }
}

/// Persisted form of a [`NodeInstance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identifier.
    pub id: NodeId,
    /// Registry key of the node type.
    pub node_type: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type-specific configuration.
    #[serde(default)]
    pub config: NodeConfig,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
    /// Status of the most recent run.
    #[serde(default)]
    pub status: NodeStatus,
}

impl NodeRecord {
    /// Creates a record with a fresh id.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.into(),
            name: None,
            config: NodeConfig::default(),
            position: Position::default(),
            status: NodeStatus::Pending,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}
