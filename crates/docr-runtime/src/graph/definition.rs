//! Serializable workflow definitions.

use serde::{Deserialize, Serialize};

use super::{Connection, NodeRecord, WorkflowMetadata};
use crate::error::WorkflowResult;
use crate::id::WorkflowId;

/// Snapshot of a workflow suitable for persistence and file input.
///
/// Nodes are stored in insertion order, which the scheduler uses to break
/// ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow identifier.
    #[serde(default)]
    pub id: WorkflowId,
    /// Workflow metadata.
    #[serde(default)]
    pub metadata: WorkflowMetadata,
    /// Nodes in insertion order.
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Connections between node slots.
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl WorkflowDefinition {
    /// Creates an empty definition.
    pub fn new(metadata: WorkflowMetadata) -> Self {
        Self {
            id: WorkflowId::new(),
            metadata,
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Parses a definition from JSON.
    pub fn from_json(json: &str) -> WorkflowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the definition to pretty-printed JSON.
    pub fn to_json(&self) -> WorkflowResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
