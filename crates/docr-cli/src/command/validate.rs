use std::path::Path;

use anyhow::Context;
use docr_runtime::engine::execution_order;
use docr_runtime::graph::WorkflowGraph;
use docr_runtime::node::NodeRegistry;

use super::read_definition;
use crate::TRACING_TARGET_COMMAND;

/// Loads a definition, re-running every graph check, and prints its schedule.
pub async fn validate(registry: &NodeRegistry, path: &Path) -> anyhow::Result<()> {
    let definition = read_definition(path).await?;
    let graph = WorkflowGraph::from_definition(definition, registry)
        .context("workflow definition is invalid")?;
    let order = execution_order(&graph).context("failed to schedule workflow")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        workflow_id = %graph.id(),
        nodes = graph.node_count(),
        connections = graph.connection_count(),
        "Workflow definition is valid"
    );

    for (position, id) in order.iter().enumerate() {
        let node = graph.node(*id)?;
        let name = node.name.as_deref().unwrap_or(&node.node_type);
        println!("{:>3}. {name} ({}) {id}", position + 1, node.node_type);
    }

    Ok(())
}
