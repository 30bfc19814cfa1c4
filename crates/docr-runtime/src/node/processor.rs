//! The contract every node type implements.

use std::fmt;

use async_trait::async_trait;

use super::{NodeDescriptor, SlotValues};

/// Outcome of a single [`NodeProcessor::process`] call.
pub type NodeResult = Result<SlotValues, NodeFailure>;

/// A processing unit bound to one node type and configuration.
///
/// Implementations declare their slots through [`descriptor`](Self::descriptor)
/// and compute outputs from inputs in [`process`](Self::process). They may
/// perform long-latency I/O but must not touch graph state; the engine never
/// retries a failed call.
#[async_trait]
pub trait NodeProcessor: Send + Sync {
    /// Returns the static slot declaration of this node type.
    fn descriptor(&self) -> &NodeDescriptor;

    /// Processes one set of inputs.
    ///
    /// `inputs` only contains declared input slots that were satisfied by a
    /// connection or by initial data. Outputs should be keyed by declared
    /// output slot names; undeclared keys are discarded by the engine.
    async fn process(&self, inputs: SlotValues) -> NodeResult;
}

impl fmt::Debug for dyn NodeProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeProcessor")
            .field("node_type", &self.descriptor().node_type)
            .finish()
    }
}

/// Business failure reported by a node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct NodeFailure {
    message: String,
}

impl NodeFailure {
    /// Creates a failure with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for NodeFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for NodeFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
