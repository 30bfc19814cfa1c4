//! Deterministic execution ordering.

use std::collections::{HashMap, HashSet};

use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::WorkflowGraph;
use crate::node::NodeId;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// Computes the execution order of a workflow.
///
/// Depth-first post-order over dependencies: nodes are visited in
/// insertion order, and each node's dependencies are emitted before it, also
/// in insertion order. Fails with [`WorkflowError::CycleDetected`] instead of
/// returning a partial order.
pub fn execution_order(graph: &WorkflowGraph) -> WorkflowResult<Vec<NodeId>> {
    let dependencies: HashMap<NodeId, Vec<NodeId>> = graph
        .node_ids()
        .iter()
        .map(|id| (*id, graph.dependencies(*id)))
        .collect();

    order_from(graph.node_ids(), &dependencies)
}

fn order_from(
    nodes: &[NodeId],
    dependencies: &HashMap<NodeId, Vec<NodeId>>,
) -> WorkflowResult<Vec<NodeId>> {
    let mut marks: HashMap<NodeId, Mark> = HashMap::with_capacity(nodes.len());
    let mut order = Vec::with_capacity(nodes.len());
    // Frames hold a node and the index of its next dependency to visit.
    let mut stack: Vec<(NodeId, usize)> = Vec::new();

    for root in nodes {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(*root, Mark::Visiting);
        stack.push((*root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            frame.1 += 1;

            let pending = dependencies
                .get(&node)
                .and_then(|dependencies| dependencies.get(next));
            let Some(dependency) = pending else {
                marks.insert(node, Mark::Visited);
                order.push(node);
                stack.pop();
                continue;
            };

            match marks.get(dependency) {
                Some(Mark::Visited) => {}
                Some(Mark::Visiting) => {
                    return Err(WorkflowError::CycleDetected {
                        from: node,
                        to: *dependency,
                    });
                }
                None => {
                    marks.insert(*dependency, Mark::Visiting);
                    stack.push((*dependency, 0));
                }
            }
        }
    }

    Ok(order)
}

/// Returns every node `node` transitively depends on.
///
/// These are exactly the nodes whose failure causes `node` to be skipped.
pub fn upstream(graph: &WorkflowGraph, node: NodeId) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut stack = graph.dependencies(node);
    while let Some(next) = stack.pop() {
        if seen.insert(next) {
            stack.extend(graph.dependencies(next));
        }
    }
    seen
}
