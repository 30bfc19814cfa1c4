//! Scripted mock processor.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docr_runtime::node::{
    DataValue, NodeDescriptor, NodeFailure, NodeProcessor, NodeResult, SlotValues,
};

/// A processor whose behavior is fixed up front.
///
/// By default every declared output is set to a text value naming the node
/// type and slot. Clones share the call counter and the recorded inputs.
#[derive(Debug, Clone)]
pub struct MockNode {
    descriptor: NodeDescriptor,
    outputs: Option<SlotValues>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    received: Arc<std::sync::Mutex<Vec<SlotValues>>>,
}

impl MockNode {
    /// Creates a mock declaring the given slots.
    pub fn new(node_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            descriptor: NodeDescriptor::new(node_type, node_type)
                .with_inputs(inputs.iter().copied())
                .with_outputs(outputs.iter().copied()),
            outputs: None,
            failure: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Returns exactly these outputs on success.
    pub fn with_outputs(mut self, outputs: SlotValues) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Fails every call with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the number of `process` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the inputs of every call so far.
    pub fn received(&self) -> Vec<SlotValues> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    /// Returns the mock as a shareable processor.
    pub fn into_processor(self) -> Arc<dyn NodeProcessor> {
        Arc::new(self)
    }
}

#[async_trait]
impl NodeProcessor for MockNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn process(&self, inputs: SlotValues) -> NodeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut received) = self.received.lock() {
            received.push(inputs);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(NodeFailure::new(message.clone()));
        }

        if let Some(outputs) = &self.outputs {
            return Ok(outputs.clone());
        }

        Ok(self
            .descriptor
            .outputs
            .iter()
            .map(|slot| {
                let value = DataValue::Text(format!("{}.{}", self.descriptor.node_type, slot));
                (slot.clone(), value)
            })
            .collect())
    }
}
