//! Built-in local node types.
//!
//! Remote node types (PDF parsing, embeddings, vector indexing, LLM calls)
//! are registered by the embedding application.

mod loader;
mod splitter;

use std::sync::Arc;

pub use loader::{TEXT_LOADER, TextLoader};
pub use splitter::{SplitterOptions, TEXT_SPLITTER, TextSplitterNode};

use super::{NodeProcessor, NodeRegistry};

/// Registers every built-in node type.
pub(crate) fn register(registry: &mut NodeRegistry) {
    registry.register(TextLoader::type_descriptor(), |_config| {
        Ok(Arc::new(TextLoader::new()) as Arc<dyn NodeProcessor>)
    });

    registry.register(TextSplitterNode::type_descriptor(), |config| {
        let options: SplitterOptions = config.parse().map_err(|e| e.to_string())?;
        let node = TextSplitterNode::new(options)?;
        Ok(Arc::new(node) as Arc<dyn NodeProcessor>)
    });
}
