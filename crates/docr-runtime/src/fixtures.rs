//! Stub node types for unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::graph::{ConnectionRequest, NodeInstance, Position, WorkflowGraph, WorkflowMetadata};
use crate::node::{
    NodeConfig, NodeDescriptor, NodeFailure, NodeId, NodeProcessor, NodeRegistry, NodeResult,
    SlotValues,
};

/// Emits one JSON value per declared output naming the node type, the slot
/// and the inputs it received, or fails with a fixed message.
#[derive(Debug)]
pub(crate) struct StubProcessor {
    descriptor: NodeDescriptor,
    failure: Option<String>,
    panic: Option<String>,
    delay: Option<Duration>,
}

impl StubProcessor {
    pub(crate) fn new(node_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            descriptor: NodeDescriptor::new(node_type, node_type)
                .with_inputs(inputs.iter().copied())
                .with_outputs(outputs.iter().copied()),
            failure: None,
            panic: None,
            delay: None,
        }
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_owned());
        self
    }

    pub(crate) fn panicking(mut self, message: &str) -> Self {
        self.panic = Some(message.to_owned());
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl NodeProcessor for StubProcessor {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn process(&self, inputs: SlotValues) -> NodeResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.panic {
            panic!("{message}");
        }
        if let Some(message) = &self.failure {
            return Err(NodeFailure::new(message.clone()));
        }

        let received: Vec<&str> = inputs.slots().collect();
        Ok(self
            .descriptor
            .outputs
            .iter()
            .map(|slot| {
                let value = json!({
                    "node": self.descriptor.node_type,
                    "slot": slot,
                    "inputs": received,
                });
                (slot.clone(), value)
            })
            .collect())
    }
}

pub(crate) fn stub_node(node_type: &str, inputs: &[&str], outputs: &[&str]) -> NodeInstance {
    stub_node_with_id(NodeId::new(), node_type, inputs, outputs)
}

pub(crate) fn stub_node_with_id(
    id: NodeId,
    node_type: &str,
    inputs: &[&str],
    outputs: &[&str],
) -> NodeInstance {
    let processor = Arc::new(StubProcessor::new(node_type, inputs, outputs));
    NodeInstance::with_id(id, node_type, NodeConfig::new(), Position::default(), processor)
}

pub(crate) fn failing_node(
    node_type: &str,
    inputs: &[&str],
    outputs: &[&str],
    message: &str,
) -> NodeInstance {
    let processor = Arc::new(StubProcessor::new(node_type, inputs, outputs).failing(message));
    NodeInstance::new(node_type, NodeConfig::new(), Position::default(), processor)
}

pub(crate) fn panicking_node(
    node_type: &str,
    inputs: &[&str],
    outputs: &[&str],
    message: &str,
) -> NodeInstance {
    let processor = Arc::new(StubProcessor::new(node_type, inputs, outputs).panicking(message));
    NodeInstance::new(node_type, NodeConfig::new(), Position::default(), processor)
}

/// Delay of the `slow` stub type.
pub(crate) const SLOW_DELAY: Duration = Duration::from_secs(10);

/// Registry resolving the stub types used by [`pipeline`], plus `slow`
/// which sleeps for [`SLOW_DELAY`] before emitting `out`.
pub(crate) fn stub_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    for (node_type, inputs, outputs) in [
        ("loader", &[][..], &["documents"][..]),
        ("splitter", &["documents"][..], &["chunks"][..]),
        ("qa", &["chunks", "question"][..], &["answer"][..]),
        ("echo", &["in"][..], &["out"][..]),
    ] {
        let stub = StubProcessor::new(node_type, inputs, outputs);
        let descriptor = stub.descriptor.clone();
        let inputs: Vec<String> = descriptor.inputs.clone();
        let outputs: Vec<String> = descriptor.outputs.clone();
        registry.register(descriptor, move |_config: &NodeConfig| {
            let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
            Ok(Arc::new(StubProcessor::new(node_type, &inputs, &outputs)) as Arc<dyn NodeProcessor>)
        });
    }
    registry.register(
        NodeDescriptor::new("slow", "slow").with_outputs(["out"]),
        |_config: &NodeConfig| {
            let stub = StubProcessor::new("slow", &[], &["out"]).delayed(SLOW_DELAY);
            Ok(Arc::new(stub) as Arc<dyn NodeProcessor>)
        },
    );
    registry
}

/// Builds `loader -> splitter -> qa` and returns the node ids in that order.
pub(crate) fn pipeline() -> (WorkflowGraph, [NodeId; 3]) {
    let mut graph = WorkflowGraph::new(WorkflowMetadata::new("pipeline"));
    let loader = graph.add_node(stub_node("loader", &[], &["documents"])).unwrap();
    let splitter = graph
        .add_node(stub_node("splitter", &["documents"], &["chunks"]))
        .unwrap();
    let qa = graph
        .add_node(stub_node("qa", &["chunks", "question"], &["answer"]))
        .unwrap();

    graph
        .connect(ConnectionRequest::new(loader, "documents", splitter, "documents"))
        .unwrap();
    graph
        .connect(ConnectionRequest::new(splitter, "chunks", qa, "chunks"))
        .unwrap();

    (graph, [loader, splitter, qa])
}
