//! Workflow graph model.
//!
//! A [`WorkflowGraph`] holds [`NodeInstance`]s and the [`Connection`]s between
//! their slots. Every structural mutation goes through the
//! [`validator`](validate_connection) first.

mod connection;
mod definition;
mod graph;
mod instance;
mod metadata;
mod validator;

pub use connection::{Connection, ConnectionRequest};
pub use definition::WorkflowDefinition;
pub use graph::WorkflowGraph;
pub use instance::{NodeInstance, NodeRecord, NodeStatus, Position};
pub use metadata::WorkflowMetadata;
pub use validator::validate_connection;

pub use crate::id::{ConnectionId, WorkflowId};
