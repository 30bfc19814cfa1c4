//! Per-run execution state.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use jiff::Timestamp;
use tokio_util::sync::CancellationToken;

use super::report::{NodeError, NodeRunRecord, RunReport, RunStatus};
use crate::graph::{NodeInstance, NodeStatus, WorkflowGraph};
use crate::node::{DataValue, NodeId, SlotValues};

/// Tracing target for run state changes.
const TRACING_TARGET: &str = "docr_runtime::engine::context";

/// Externally supplied values keyed by input slot name.
///
/// Unconnected input slots fall back to the same-named key.
pub type InitialData = SlotValues;

/// Per-call run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Token checked between node executions.
    pub cancellation: Option<CancellationToken>,
    /// Overrides the engine's default run timeout.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    /// Creates options with no cancellation and the engine default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets the run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[derive(Debug, Default)]
struct NodeState {
    status: NodeStatus,
    started_at: Option<Timestamp>,
    duration: Option<Duration>,
}

/// Mutable state of a single run.
///
/// Owned by the orchestrator loop, so node results are applied one at a
/// time even when nodes run concurrently.
#[derive(Debug)]
pub struct ExecutionContext {
    initial: InitialData,
    states: HashMap<NodeId, NodeState>,
    outputs: BTreeMap<NodeId, SlotValues>,
    errors: Vec<NodeError>,
    skipped: Vec<NodeId>,
    order: Vec<NodeId>,
    started_at: Timestamp,
}

impl ExecutionContext {
    /// Creates a context with every node of `graph` pending.
    pub fn new(graph: &WorkflowGraph, initial: InitialData) -> Self {
        Self {
            initial,
            states: graph
                .node_ids()
                .iter()
                .map(|id| (*id, NodeState::default()))
                .collect(),
            outputs: BTreeMap::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
            order: Vec::new(),
            started_at: Timestamp::now(),
        }
    }

    /// Returns the status of a node in this run.
    pub fn status(&self, id: NodeId) -> NodeStatus {
        self.states
            .get(&id)
            .map(|state| state.status)
            .unwrap_or_default()
    }

    /// Returns the outputs recorded for a node.
    pub fn outputs(&self, id: NodeId) -> Option<&SlotValues> {
        self.outputs.get(&id)
    }

    /// Assembles the inputs of a node.
    ///
    /// A connected slot reads the source's recorded output when the source
    /// succeeded; otherwise the same-named initial value is used. Slots
    /// satisfied by neither are absent.
    pub fn inputs_for(&self, graph: &WorkflowGraph, node: &NodeInstance) -> SlotValues {
        let mut inputs = SlotValues::new();

        for slot in &node.descriptor().inputs {
            let connected = graph
                .incoming(node.id)
                .into_iter()
                .find(|connection| &connection.target_slot == slot)
                .filter(|connection| self.status(connection.source) == NodeStatus::Succeeded)
                .and_then(|connection| {
                    self.outputs
                        .get(&connection.source)?
                        .get(&connection.source_slot)
                });

            if let Some(value) = connected.or_else(|| self.initial.get(slot)) {
                inputs.set(slot.clone(), value.clone());
            }
        }

        inputs
    }

    pub(crate) fn mark_running(&mut self, id: NodeId) {
        self.order.push(id);
        let state = self.states.entry(id).or_default();
        state.status = NodeStatus::Running;
        state.started_at = Some(Timestamp::now());
    }

    pub(crate) fn mark_skipped(&mut self, id: NodeId) {
        tracing::debug!(target: TRACING_TARGET, node_id = %id, "Node skipped");
        self.order.push(id);
        self.skipped.push(id);
        self.states.entry(id).or_default().status = NodeStatus::Skipped;
    }

    /// Records a successful node, keeping only declared outputs.
    pub(crate) fn record_success(
        &mut self,
        node: &NodeInstance,
        outputs: SlotValues,
        duration: Duration,
    ) {
        let descriptor = node.descriptor();
        let mut kept = SlotValues::new();
        for (slot, value) in outputs {
            if descriptor.has_output(&slot) {
                kept.set(slot, value);
            } else {
                tracing::warn!(
                    target: TRACING_TARGET,
                    node_id = %node.id,
                    node_type = %node.node_type,
                    slot = %slot,
                    "Dropping undeclared output"
                );
            }
        }

        self.outputs.insert(node.id, kept);
        let state = self.states.entry(node.id).or_default();
        state.status = NodeStatus::Succeeded;
        state.duration = Some(duration);
    }

    pub(crate) fn record_failure(&mut self, node: &NodeInstance, message: String, duration: Duration) {
        self.errors.push(NodeError {
            node_id: node.id,
            node_type: node.node_type.clone(),
            message,
        });
        let state = self.states.entry(node.id).or_default();
        state.status = NodeStatus::Failed;
        state.duration = Some(duration);
    }

    /// Builds the report for a run that ended with `interruption`, if any.
    pub(crate) fn into_report(
        self,
        graph: &WorkflowGraph,
        schedule: &[NodeId],
        answer_slot: &str,
        interruption: Option<RunStatus>,
    ) -> RunReport {
        let all_succeeded = schedule
            .iter()
            .all(|id| self.status(*id) == NodeStatus::Succeeded);

        let status = match interruption {
            Some(status) => status,
            None if all_succeeded => RunStatus::Succeeded,
            None => RunStatus::Failed,
        };

        let answer: Option<DataValue> = self
            .order
            .iter()
            .rev()
            .filter(|id| self.status(**id) == NodeStatus::Succeeded)
            .filter(|id| {
                graph
                    .get_node(**id)
                    .is_some_and(|node| node.descriptor().has_output(answer_slot))
            })
            .find_map(|id| self.outputs.get(id)?.get(answer_slot).cloned());

        let nodes = schedule
            .iter()
            .filter_map(|id| {
                let node = graph.get_node(*id)?;
                let state = self.states.get(id);
                Some(NodeRunRecord {
                    node_id: *id,
                    node_type: node.node_type.clone(),
                    status: state.map(|s| s.status).unwrap_or_default(),
                    started_at: state.and_then(|s| s.started_at),
                    duration_ms: state
                        .and_then(|s| s.duration)
                        .map(|d| d.as_millis() as u64),
                })
            })
            .collect();

        let duration_ms = Timestamp::now()
            .duration_since(self.started_at)
            .unsigned_abs()
            .as_millis() as u64;

        RunReport {
            workflow_id: graph.id(),
            status,
            success: status == RunStatus::Succeeded,
            answer,
            outputs: self.outputs,
            execution_order: self.order,
            errors: self.errors,
            skipped: self.skipped,
            nodes,
            started_at: self.started_at,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::pipeline;

    #[test]
    fn test_inputs_prefer_connection_over_initial_data() {
        let (graph, [loader, splitter, qa]) = pipeline();
        let initial = InitialData::new()
            .with("documents", "from initial data")
            .with("question", "What is X?");
        let mut ctx = ExecutionContext::new(&graph, initial);

        let splitter_node = graph.node(splitter).unwrap();
        let inputs = ctx.inputs_for(&graph, splitter_node);
        assert_eq!(inputs.text("documents"), Some("from initial data"));

        let loader_node = graph.node(loader).unwrap();
        ctx.mark_running(loader);
        ctx.record_success(
            loader_node,
            SlotValues::new().with("documents", "from loader").with("extra", "x"),
            Duration::from_millis(1),
        );
        assert!(ctx.outputs(loader).unwrap().get("extra").is_none());

        let inputs = ctx.inputs_for(&graph, splitter_node);
        assert_eq!(inputs.text("documents"), Some("from loader"));

        let qa_node = graph.node(qa).unwrap();
        let inputs = ctx.inputs_for(&graph, qa_node);
        assert_eq!(inputs.text("question"), Some("What is X?"));
        assert!(inputs.get("chunks").is_none());
    }

    #[test]
    fn test_report_aggregates_failures() {
        let (graph, [loader, splitter, qa]) = pipeline();
        let mut ctx = ExecutionContext::new(&graph, InitialData::new());

        ctx.mark_running(loader);
        ctx.record_success(graph.node(loader).unwrap(), SlotValues::new(), Duration::ZERO);
        ctx.mark_running(splitter);
        ctx.record_failure(graph.node(splitter).unwrap(), "boom".into(), Duration::ZERO);
        ctx.mark_skipped(qa);

        let report = ctx.into_report(&graph, &[loader, splitter, qa], "answer", None);
        assert_eq!(report.status, RunStatus::Failed);
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.error_for(splitter), Some("boom"));
        assert_eq!(report.skipped, vec![qa]);
        assert_eq!(report.execution_order, vec![loader, splitter, qa]);
        assert_eq!(report.status_of(qa), Some(NodeStatus::Skipped));
        assert!(report.answer.is_none());
    }
}
