//! Connections between node slots.

use serde::{Deserialize, Serialize};

use crate::id::ConnectionId;
use crate::node::NodeId;

/// A directed edge from an output slot to an input slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Connection identifier.
    pub id: ConnectionId,
    /// Producing node.
    pub source: NodeId,
    /// Output slot of the producing node.
    pub source_slot: String,
    /// Consuming node.
    pub target: NodeId,
    /// Input slot of the consuming node.
    pub target_slot: String,
}

impl Connection {
    /// Creates a connection with a fresh id.
    pub fn new(request: ConnectionRequest) -> Self {
        Self::with_id(ConnectionId::new(), request)
    }

    /// Creates a connection with a specific id.
    pub fn with_id(id: ConnectionId, request: ConnectionRequest) -> Self {
        Self {
            id,
            source: request.source,
            source_slot: request.source_slot,
            target: request.target,
            target_slot: request.target_slot,
        }
    }

    /// Returns whether the node is either endpoint.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

/// Endpoints of a connection that has not been validated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Producing node.
    pub source: NodeId,
    /// Output slot of the producing node.
    pub source_slot: String,
    /// Consuming node.
    pub target: NodeId,
    /// Input slot of the consuming node.
    pub target_slot: String,
}

impl ConnectionRequest {
    /// Creates a request.
    pub fn new(
        source: NodeId,
        source_slot: impl Into<String>,
        target: NodeId,
        target_slot: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_slot: source_slot.into(),
            target,
            target_slot: target_slot.into(),
        }
    }
}

impl From<&Connection> for ConnectionRequest {
    fn from(connection: &Connection) -> Self {
        Self {
            source: connection.source,
            source_slot: connection.source_slot.clone(),
            target: connection.target,
            target_slot: connection.target_slot.clone(),
        }
    }
}
