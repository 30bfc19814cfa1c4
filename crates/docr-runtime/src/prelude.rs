//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use docr_runtime::prelude::*;
//! ```

pub use crate::engine::{Engine, EngineConfig, InitialData, RunOptions, RunReport, RunStatus};
pub use crate::error::{ErrorKind, WorkflowError, WorkflowResult};
pub use crate::graph::{
    Connection, ConnectionId, ConnectionRequest, NodeStatus, Position, WorkflowDefinition,
    WorkflowGraph, WorkflowId, WorkflowMetadata,
};
pub use crate::node::{
    DataValue, NodeConfig, NodeDescriptor, NodeFailure, NodeId, NodeProcessor, NodeRegistry,
    NodeResult, SlotValues,
};
pub use crate::service::{StorageWorkflowStore, WorkflowService, WorkflowStore};
