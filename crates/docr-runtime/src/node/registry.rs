//! Node type registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{ConfigField, NodeConfig, NodeDescriptor, NodeProcessor, builtin};
use crate::error::{WorkflowError, WorkflowResult};

/// Tracing target for registry operations.
const TRACING_TARGET: &str = "docr_runtime::node::registry";

/// Builds a processor for a node type from its configuration.
///
/// Returning `Err(message)` rejects the configuration.
pub type NodeFactory =
    Arc<dyn Fn(&NodeConfig) -> Result<Arc<dyn NodeProcessor>, String> + Send + Sync>;

struct Registration {
    descriptor: Arc<NodeDescriptor>,
    factory: NodeFactory,
}

/// Maps node type keys to descriptors and processor factories.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    types: BTreeMap<String, Arc<Registration>>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry containing the built-in local node types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register(&mut registry);
        registry
    }

    /// Registers a node type, replacing any previous registration of the key.
    pub fn register<F>(&mut self, descriptor: NodeDescriptor, factory: F) -> &mut Self
    where
        F: Fn(&NodeConfig) -> Result<Arc<dyn NodeProcessor>, String> + Send + Sync + 'static,
    {
        let node_type = descriptor.node_type.clone();
        let registration = Registration {
            descriptor: Arc::new(descriptor),
            factory: Arc::new(factory),
        };

        if self.types.insert(node_type.clone(), Arc::new(registration)).is_some() {
            tracing::warn!(
                target: TRACING_TARGET,
                node_type = %node_type,
                "Node type registration replaced"
            );
        } else {
            tracing::debug!(target: TRACING_TARGET, node_type = %node_type, "Node type registered");
        }

        self
    }

    /// Returns whether a node type is registered.
    pub fn contains(&self, node_type: &str) -> bool {
        self.types.contains_key(node_type)
    }

    /// Returns the descriptor of a node type.
    pub fn describe(&self, node_type: &str) -> WorkflowResult<Arc<NodeDescriptor>> {
        self.types
            .get(node_type)
            .map(|registration| registration.descriptor.clone())
            .ok_or_else(|| WorkflowError::UnknownNodeType(node_type.to_owned()))
    }

    /// Returns the configuration fields of a node type.
    pub fn config_schema(&self, node_type: &str) -> WorkflowResult<Vec<ConfigField>> {
        Ok(self.describe(node_type)?.config_fields.clone())
    }

    /// Returns the registered type keys in ascending order.
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Returns all registered descriptors, ordered by type key.
    pub fn descriptors(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.types.values().map(|registration| registration.descriptor.as_ref())
    }

    /// Builds a processor for a node type.
    pub fn instantiate(
        &self,
        node_type: &str,
        config: &NodeConfig,
    ) -> WorkflowResult<Arc<dyn NodeProcessor>> {
        let registration = self
            .types
            .get(node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType(node_type.to_owned()))?;

        (registration.factory)(config).map_err(|message| WorkflowError::InvalidNodeConfig {
            node_type: node_type.to_owned(),
            message,
        })
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("node_types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_builtins_are_registered() {
        let registry = NodeRegistry::with_builtins();
        let types: Vec<_> = registry.node_types().collect();
        assert_eq!(types, vec!["text_loader", "text_splitter"]);

        let loader = registry.describe("text_loader").unwrap();
        assert_eq!(loader.inputs, vec!["file_content"]);
        assert_eq!(loader.outputs, vec!["documents"]);
    }

    #[test]
    fn test_unknown_node_type() {
        let registry = NodeRegistry::with_builtins();
        let err = registry.instantiate("pdf_loader", &NodeConfig::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownNodeType);
        assert!(registry.config_schema("pdf_loader").is_err());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let registry = NodeRegistry::with_builtins();
        let config = NodeConfig::new().with("chunk_size", 10);
        let err = registry.instantiate("text_splitter", &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidNodeConfig);
    }

    #[test]
    fn test_config_schema() {
        let registry = NodeRegistry::with_builtins();
        let fields = registry.config_schema("text_splitter").unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["chunk_size", "chunk_overlap"]);
    }
}
