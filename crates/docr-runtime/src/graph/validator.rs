//! Structural checks applied before a connection is added.

use super::{ConnectionRequest, WorkflowGraph};
use crate::error::{SlotDirection, WorkflowError, WorkflowResult};

/// Checks that `request` can be added to `graph` without breaking any
/// structural invariant.
///
/// Checks run in a fixed order and the first violation is returned:
/// endpoint existence, slot validity, single writer per input, acyclicity.
pub fn validate_connection(graph: &WorkflowGraph, request: &ConnectionRequest) -> WorkflowResult<()> {
    let source = graph.node(request.source)?;
    let target = graph.node(request.target)?;

    if !source.descriptor().has_output(&request.source_slot) {
        return Err(WorkflowError::InvalidSlot {
            node_id: source.id,
            node_type: source.node_type.clone(),
            direction: SlotDirection::Output,
            slot: request.source_slot.clone(),
        });
    }

    if !target.descriptor().has_input(&request.target_slot) {
        return Err(WorkflowError::InvalidSlot {
            node_id: target.id,
            node_type: target.node_type.clone(),
            direction: SlotDirection::Input,
            slot: request.target_slot.clone(),
        });
    }

    if let Some(existing) = graph.bound_connection(request.target, &request.target_slot) {
        return Err(WorkflowError::SlotAlreadyBound {
            node_id: request.target,
            slot: request.target_slot.clone(),
            existing,
        });
    }

    // A self-edge is a cycle of length one.
    if request.source == request.target || graph.has_path(request.target, request.source) {
        return Err(WorkflowError::CycleDetected {
            from: request.source,
            to: request.target,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::{pipeline, stub_node};
    use crate::node::NodeId;

    #[test]
    fn test_unknown_endpoint() {
        let (graph, [loader, ..]) = pipeline();
        let request = ConnectionRequest::new(loader, "documents", NodeId::new(), "documents");
        let err = validate_connection(&graph, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownNode);
    }

    #[test]
    fn test_output_into_input_less_node() {
        let (graph, [loader, _, qa]) = pipeline();
        let request = ConnectionRequest::new(qa, "answer", loader, "documents");
        let err = validate_connection(&graph, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSlot);
    }

    #[test]
    fn test_undeclared_output() {
        let (graph, [loader, splitter, _]) = pipeline();
        let request = ConnectionRequest::new(loader, "chunks", splitter, "documents");
        let err = validate_connection(&graph, &request).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidSlot { direction: SlotDirection::Output, .. }
        ));
    }

    #[test]
    fn test_second_writer_rejected() {
        let (mut graph, [loader, splitter, _]) = pipeline();
        let other = graph
            .add_node(stub_node("loader", &[], &["documents"]))
            .unwrap();
        assert!(graph.has_path(loader, splitter));

        let request = ConnectionRequest::new(other, "documents", splitter, "documents");
        let err = validate_connection(&graph, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SlotAlreadyBound);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = WorkflowGraph::default();
        let a = graph.add_node(stub_node("echo", &["in"], &["out"])).unwrap();
        let b = graph.add_node(stub_node("echo", &["in"], &["out"])).unwrap();
        graph.connect(ConnectionRequest::new(a, "out", b, "in")).unwrap();

        let request = ConnectionRequest::new(b, "out", a, "in");
        let err = validate_connection(&graph, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CycleDetected);

        let self_edge = ConnectionRequest::new(a, "out", a, "in");
        let mut graph = WorkflowGraph::default();
        graph.add_node(crate::fixtures::stub_node_with_id(a, "echo", &["in"], &["out"])).unwrap();
        let err = validate_connection(&graph, &self_edge).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CycleDetected);
    }
}
