//! Workflow error types.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

use crate::graph::{ConnectionId, WorkflowId};
use crate::node::NodeId;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Stable categories of [`WorkflowError`], suitable for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A slot name is not declared by the node type.
    InvalidSlot,
    /// A node id is not part of the workflow.
    UnknownNode,
    /// A node input slot already has an incoming connection.
    SlotAlreadyBound,
    /// The operation would create (or found) a cycle.
    CycleDetected,
    /// No node type is registered under the key.
    UnknownNodeType,
    /// A node id is already part of the workflow.
    DuplicateNode,
    /// A connection id is not part of the workflow.
    UnknownConnection,
    /// No workflow is registered under the id.
    UnknownWorkflow,
    /// A workflow with the id already exists.
    DuplicateWorkflow,
    /// A node type rejected its configuration.
    InvalidNodeConfig,
    /// Persistence failed.
    Storage,
    /// Serialization/deserialization failed.
    Serialization,
    /// Unexpected internal failure.
    Internal,
}

/// Errors that can occur during workflow operations.
///
/// Structural errors are returned before any mutation is applied. Node
/// processing failures are not errors: they are recorded per node in the
/// run report.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A slot name is not declared by the node type.
    #[error("node {node_id} ({node_type}) declares no {direction} slot '{slot}'")]
    InvalidSlot {
        /// Node the slot was looked up on.
        node_id: NodeId,
        /// Type key of that node.
        node_type: String,
        /// Slot direction, `input` or `output`.
        direction: SlotDirection,
        /// The undeclared slot name.
        slot: String,
    },

    /// A node id is not part of the workflow.
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    /// A node input slot already has an incoming connection.
    #[error("input slot '{slot}' of node {node_id} is already bound by connection {existing}")]
    SlotAlreadyBound {
        /// Target node.
        node_id: NodeId,
        /// Target input slot.
        slot: String,
        /// The connection already writing the slot.
        existing: ConnectionId,
    },

    /// Connecting the nodes would close a cycle.
    #[error("connecting {from} to {to} would create a cycle")]
    CycleDetected {
        /// Source node of the offending edge.
        from: NodeId,
        /// Target node of the offending edge.
        to: NodeId,
    },

    /// No node type is registered under the key.
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// A node id is already part of the workflow.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// A connection id is not part of the workflow.
    #[error("connection {0} does not exist")]
    UnknownConnection(ConnectionId),

    /// No workflow is registered under the id.
    #[error("workflow {0} not found")]
    UnknownWorkflow(WorkflowId),

    /// A workflow with the id already exists.
    #[error("workflow {0} already exists")]
    DuplicateWorkflow(WorkflowId),

    /// A node type rejected its configuration.
    #[error("invalid config for node type '{node_type}': {message}")]
    InvalidNodeConfig {
        /// Type key of the node.
        node_type: String,
        /// Error message.
        message: String,
    },

    /// Persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] docr_opendal::StorageError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSlot { .. } => ErrorKind::InvalidSlot,
            Self::UnknownNode(_) => ErrorKind::UnknownNode,
            Self::SlotAlreadyBound { .. } => ErrorKind::SlotAlreadyBound,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::UnknownNodeType(_) => ErrorKind::UnknownNodeType,
            Self::DuplicateNode(_) => ErrorKind::DuplicateNode,
            Self::UnknownConnection(_) => ErrorKind::UnknownConnection,
            Self::UnknownWorkflow(_) => ErrorKind::UnknownWorkflow,
            Self::DuplicateWorkflow(_) => ErrorKind::DuplicateWorkflow,
            Self::InvalidNodeConfig { .. } => ErrorKind::InvalidNodeConfig,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns whether the error is a structural validation error.
    ///
    /// Validation errors are caused by the request itself and are never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidSlot
                | ErrorKind::UnknownNode
                | ErrorKind::SlotAlreadyBound
                | ErrorKind::CycleDetected
                | ErrorKind::UnknownNodeType
                | ErrorKind::DuplicateNode
                | ErrorKind::InvalidNodeConfig
        )
    }
}

/// Direction of a node slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SlotDirection {
    /// Slot consumed by the node.
    Input,
    /// Slot produced by the node.
    Output,
}
