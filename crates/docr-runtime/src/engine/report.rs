//! Run results.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::graph::{NodeStatus, WorkflowId};
use crate::node::{DataValue, NodeId, SlotValues};

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// Every node succeeded.
    Succeeded,
    /// At least one node failed or was skipped.
    Failed,
    /// The run was cancelled between nodes.
    Cancelled,
    /// The run exceeded its timeout.
    TimedOut,
}

/// Failure message reported by one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeError {
    /// Failed node.
    pub node_id: NodeId,
    /// Type key of the failed node.
    pub node_type: String,
    /// Human-readable failure message.
    pub message: String,
}

/// Per-node summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRunRecord {
    /// Node identifier.
    pub node_id: NodeId,
    /// Type key of the node.
    pub node_type: String,
    /// Final status in this run.
    pub status: NodeStatus,
    /// When processing started, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// Processing time in milliseconds, if processing finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Aggregated result of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Workflow that was run.
    pub workflow_id: WorkflowId,
    /// Overall outcome.
    pub status: RunStatus,
    /// Whether every node succeeded.
    pub success: bool,
    /// Final answer, when a succeeded node produced one.
    pub answer: Option<DataValue>,
    /// Outputs of succeeded nodes.
    pub outputs: BTreeMap<NodeId, SlotValues>,
    /// Nodes in the order they were started or skipped.
    pub execution_order: Vec<NodeId>,
    /// One entry per failed node.
    pub errors: Vec<NodeError>,
    /// Nodes skipped because of an upstream failure.
    pub skipped: Vec<NodeId>,
    /// Per-node records in scheduled order.
    pub nodes: Vec<NodeRunRecord>,
    /// Run start time.
    pub started_at: Timestamp,
    /// Total run time in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Returns the answer as text, if it is textual.
    pub fn answer_text(&self) -> Option<&str> {
        self.answer.as_ref().and_then(DataValue::as_text)
    }

    /// Returns a node's final status.
    pub fn status_of(&self, node_id: NodeId) -> Option<NodeStatus> {
        self.nodes
            .iter()
            .find(|record| record.node_id == node_id)
            .map(|record| record.status)
    }

    /// Returns a node's failure message.
    pub fn error_for(&self, node_id: NodeId) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.node_id == node_id)
            .map(|error| error.message.as_str())
    }

    /// Returns one output of a succeeded node.
    pub fn output(&self, node_id: NodeId, slot: &str) -> Option<&DataValue> {
        self.outputs.get(&node_id)?.get(slot)
    }
}
