//! Mock node processors.

mod node;
mod qa;

pub use node::MockNode;
pub use qa::{MockQaConfig, MockQaNode, QA_CHAIN};

use docr_runtime::node::NodeRegistry;

/// Creates a registry with the built-in node types and a mock `qa_chain`.
pub fn mock_registry(config: MockQaConfig) -> NodeRegistry {
    let mut registry = NodeRegistry::with_builtins();
    MockQaNode::register(&mut registry, config);
    registry
}
