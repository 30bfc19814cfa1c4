//! Randomized edit sequences against the graph invariants.

use std::collections::{HashMap, HashSet};

use docr_runtime::engine::execution_order;
use docr_runtime::graph::{ConnectionId, ConnectionRequest, NodeInstance, Position, WorkflowGraph};
use docr_runtime::node::{NodeConfig, NodeId};
use docr_test::MockNode;
use proptest::prelude::*;

/// Node types available to generated edits: (type, inputs, outputs).
const KINDS: &[(&str, &[&str], &[&str])] = &[
    ("source", &[], &["out"]),
    ("unary", &["in"], &["out"]),
    ("binary", &["a", "b"], &["out"]),
    ("sink", &["a", "b"], &[]),
];

/// Slot names used by generated connections, including one no type declares.
const SLOTS: &[&str] = &["out", "in", "a", "b", "bogus"];

#[derive(Debug, Clone)]
enum Edit {
    AddNode(usize),
    Connect {
        source: usize,
        source_slot: usize,
        target: usize,
        target_slot: usize,
    },
    Disconnect(usize),
    RemoveNode(usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (0..KINDS.len()).prop_map(Edit::AddNode),
        6 => (any::<usize>(), 0..SLOTS.len(), any::<usize>(), 0..SLOTS.len()).prop_map(
            |(source, source_slot, target, target_slot)| Edit::Connect {
                source,
                source_slot,
                target,
                target_slot,
            }
        ),
        1 => any::<usize>().prop_map(Edit::Disconnect),
        1 => any::<usize>().prop_map(Edit::RemoveNode),
    ]
}

/// Picks an existing node, or an id outside the graph for the extra slot.
fn pick_node(graph: &WorkflowGraph, index: usize) -> NodeId {
    let ids = graph.node_ids();
    ids.get(index % (ids.len() + 1)).copied().unwrap_or_default()
}

/// Picks an existing connection, or an unknown id for the extra slot.
fn pick_connection(graph: &WorkflowGraph, index: usize) -> ConnectionId {
    let mut ids: Vec<ConnectionId> = graph.connections().map(|c| c.id).collect();
    ids.sort();
    ids.get(index % (ids.len() + 1)).copied().unwrap_or_default()
}

type Fingerprint = (Vec<NodeId>, Vec<(ConnectionId, NodeId, String, NodeId, String)>);

fn fingerprint(graph: &WorkflowGraph) -> Fingerprint {
    let mut connections: Vec<_> = graph
        .connections()
        .map(|c| {
            (
                c.id,
                c.source,
                c.source_slot.clone(),
                c.target,
                c.target_slot.clone(),
            )
        })
        .collect();
    connections.sort_by_key(|c| c.0);
    (graph.node_ids().to_vec(), connections)
}

fn assert_invariants(graph: &WorkflowGraph) {
    let ids = graph.node_ids();
    let unique: HashSet<NodeId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate node ids");
    assert_eq!(graph.node_count(), ids.len());

    let mut writers = HashSet::new();
    for connection in graph.connections() {
        let source = graph.get_node(connection.source).expect("dangling source");
        let target = graph.get_node(connection.target).expect("dangling target");
        assert!(source.descriptor().has_output(&connection.source_slot));
        assert!(target.descriptor().has_input(&connection.target_slot));
        assert!(
            writers.insert((connection.target, connection.target_slot.clone())),
            "input slot written twice"
        );
    }

    let order = execution_order(graph).expect("graph must stay acyclic");
    assert_eq!(order.len(), ids.len());
    let position: HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    assert_eq!(position.len(), ids.len());
    for connection in graph.connections() {
        assert!(position[&connection.source] < position[&connection.target]);
    }
    assert_eq!(execution_order(graph).unwrap(), order);
}

fn add_node(graph: &mut WorkflowGraph, kind: usize) -> NodeId {
    let (node_type, inputs, outputs) = KINDS[kind];
    let processor = MockNode::new(node_type, inputs, outputs).into_processor();
    let node = NodeInstance::new(node_type, NodeConfig::new(), Position::default(), processor);
    graph.add_node(node).unwrap()
}

proptest! {
    #[test]
    fn edits_keep_invariants_or_change_nothing(edits in prop::collection::vec(edit(), 1..64)) {
        let mut graph = WorkflowGraph::default();

        for edit in edits {
            let before = fingerprint(&graph);

            let result = match edit {
                Edit::AddNode(kind) => {
                    add_node(&mut graph, kind);
                    Ok(())
                }
                Edit::Connect { source, source_slot, target, target_slot } => {
                    let request = ConnectionRequest::new(
                        pick_node(&graph, source),
                        SLOTS[source_slot],
                        pick_node(&graph, target),
                        SLOTS[target_slot],
                    );
                    graph.connect(request).map(|_| ())
                }
                Edit::Disconnect(index) => {
                    let id = pick_connection(&graph, index);
                    graph.remove_connection(id).map(|_| ())
                }
                Edit::RemoveNode(index) => {
                    let id = pick_node(&graph, index);
                    let removed = graph.remove_node(id).map(|_| ());
                    if removed.is_ok() {
                        prop_assert!(graph.connections().all(|c| !c.touches(id)));
                    }
                    removed
                }
            };

            if let Err(err) = result {
                prop_assert_eq!(fingerprint(&graph), before, "rejected edit changed the graph: {}", err);
            }
            assert_invariants(&graph);
        }
    }

    #[test]
    fn forward_edges_always_schedule(
        kinds in prop::collection::vec(0..KINDS.len(), 1..40),
        edges in prop::collection::vec((any::<usize>(), any::<usize>(), 0..SLOTS.len()), 0..80),
    ) {
        let mut graph = WorkflowGraph::default();
        let ids: Vec<NodeId> = kinds.iter().map(|kind| add_node(&mut graph, *kind)).collect();

        for (a, b, slot) in edges {
            let (a, b) = (a % ids.len(), b % ids.len());
            if a == b {
                continue;
            }
            let (source, target) = (ids[a.min(b)], ids[a.max(b)]);
            let result = graph.connect(ConnectionRequest::new(source, "out", target, SLOTS[slot]));
            if let Err(err) = result {
                prop_assert!(err.is_validation());
            }
        }

        assert_invariants(&graph);
    }
}
