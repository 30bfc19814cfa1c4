use anyhow::Context;
use docr_runtime::node::{NodeDescriptor, NodeRegistry};

/// Prints node type descriptors, including configuration fields, as JSON.
pub fn describe(registry: &NodeRegistry, node_type: Option<&str>) -> anyhow::Result<()> {
    let descriptors: Vec<NodeDescriptor> = match node_type {
        Some(node_type) => vec![registry.describe(node_type)?.as_ref().clone()],
        None => registry.descriptors().cloned().collect(),
    };

    let json = serde_json::to_string_pretty(&descriptors)
        .context("failed to serialize node descriptors")?;
    println!("{json}");
    Ok(())
}
