//! Node contract, slot values and the node type registry.
//!
//! Every node type declares a fixed [`NodeDescriptor`] and implements
//! [`NodeProcessor`]. The [`NodeRegistry`] resolves type keys to processors
//! when nodes are added, reconfigured or loaded.

pub mod builtin;
mod config;
mod descriptor;
mod processor;
mod registry;
mod value;

pub use config::NodeConfig;
pub use descriptor::{ConfigField, FieldKind, NodeDescriptor};
pub use processor::{NodeFailure, NodeProcessor, NodeResult};
pub use registry::{NodeFactory, NodeRegistry};
pub use value::{DataValue, Handle, SlotValues};

pub use crate::id::NodeId;
