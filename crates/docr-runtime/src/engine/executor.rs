//! Workflow execution engine.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use super::EngineConfig;
use super::context::{ExecutionContext, InitialData, RunOptions};
use super::report::{RunReport, RunStatus};
use super::scheduler::execution_order;
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::WorkflowGraph;
use crate::node::{NodeFailure, NodeId, NodeResult};

/// Tracing target for engine operations.
const TRACING_TARGET: &str = "docr_runtime::engine";

type InFlight = BoxFuture<'static, (NodeId, NodeResult, Duration)>;

/// The workflow execution engine.
///
/// Runs a graph snapshot in scheduled order, routing outputs along
/// connections and skipping every node downstream of a failure. Node
/// failures end up in the [`RunReport`]; only setup problems such as a
/// cyclic graph are returned as errors.
pub struct Engine {
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs));

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_runs = config.max_concurrent_runs,
            max_parallel_nodes = config.max_parallel_nodes,
            run_timeout_secs = ?config.run_timeout,
            "Workflow engine initialized"
        );

        Self { config, semaphore }
    }

    /// Creates a new engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the number of runs that can start without waiting.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs a workflow snapshot with default options.
    pub async fn execute(
        &self,
        workflow: &WorkflowGraph,
        initial: InitialData,
    ) -> WorkflowResult<RunReport> {
        self.execute_with(workflow, initial, RunOptions::default())
            .await
    }

    /// Runs a workflow snapshot.
    ///
    /// Cancellation is checked before each node starts; a cancelled run
    /// waits for nodes already in flight and reports
    /// [`RunStatus::Cancelled`]. When the timeout elapses the run stops
    /// immediately with [`RunStatus::TimedOut`], leaving in-flight nodes
    /// `Running`. A node that panics is recorded as failed.
    pub async fn execute_with(
        &self,
        workflow: &WorkflowGraph,
        initial: InitialData,
        options: RunOptions,
    ) -> WorkflowResult<RunReport> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| WorkflowError::Internal(format!("semaphore closed: {}", e)))?;

        let mut frontier = Frontier::new(workflow, execution_order(workflow)?);

        let timeout = options.timeout.or_else(|| self.config.run_timeout());
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let parallelism = self.config.parallelism();

        tracing::debug!(
            target: TRACING_TARGET,
            workflow_id = %workflow.id(),
            node_count = frontier.schedule.len(),
            parallelism,
            timeout_ms = ?timeout.map(|t| t.as_millis()),
            "Starting workflow execution"
        );

        let mut ctx = ExecutionContext::new(workflow, initial);
        let mut in_flight: FuturesUnordered<InFlight> = FuturesUnordered::new();
        let mut interruption = None;

        loop {
            if interruption.is_none() && options.is_cancelled() {
                tracing::info!(target: TRACING_TARGET, workflow_id = %workflow.id(), "Workflow run cancelled");
                interruption = Some(RunStatus::Cancelled);
            }

            if interruption.is_none() {
                Self::launch_ready(workflow, &mut frontier, &mut ctx, &mut in_flight, parallelism)?;
            }

            if in_flight.is_empty() {
                if interruption.is_none() && !frontier.is_complete() {
                    return Err(WorkflowError::Internal(format!(
                        "{} nodes could not be scheduled",
                        frontier.unsettled()
                    )));
                }
                break;
            }

            let completed = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, in_flight.next())
                    .await
                    .ok(),
                None => Some(in_flight.next().await),
            };

            let Some(completed) = completed else {
                tracing::warn!(
                    target: TRACING_TARGET,
                    workflow_id = %workflow.id(),
                    in_flight = in_flight.len(),
                    "Workflow run timed out"
                );
                interruption = Some(RunStatus::TimedOut);
                break;
            };

            let Some((node_id, result, duration)) = completed else {
                continue;
            };
            let node = workflow.node(node_id)?;

            match result {
                Ok(outputs) => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        node_id = %node_id,
                        node_type = %node.node_type,
                        duration_ms = duration.as_millis() as u64,
                        "Node succeeded"
                    );
                    ctx.record_success(node, outputs, duration);
                }
                Err(failure) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        node_id = %node_id,
                        node_type = %node.node_type,
                        error = %failure,
                        "Node failed"
                    );
                    ctx.record_failure(node, failure.message().to_owned(), duration);
                }
            }
            frontier.settle(node_id);
        }

        let report = ctx.into_report(
            workflow,
            &frontier.schedule,
            &self.config.answer_slot,
            interruption,
        );

        tracing::info!(
            target: TRACING_TARGET,
            workflow_id = %workflow.id(),
            status = %report.status,
            failed = report.errors.len(),
            skipped = report.skipped.len(),
            duration_ms = report.duration_ms,
            "Workflow execution finished"
        );

        Ok(report)
    }

    /// Starts or skips ready nodes in scheduled order until `parallelism`
    /// nodes are in flight.
    ///
    /// A node whose direct dependency failed or was skipped is skipped
    /// itself, which carries a failure to every transitive dependent. With a
    /// parallelism of one this degenerates to strictly sequential execution.
    fn launch_ready(
        workflow: &WorkflowGraph,
        frontier: &mut Frontier,
        ctx: &mut ExecutionContext,
        in_flight: &mut FuturesUnordered<InFlight>,
        parallelism: usize,
    ) -> WorkflowResult<()> {
        while in_flight.len() < parallelism {
            let Some(position) = frontier.ready.pop_first() else {
                break;
            };
            let id = frontier.schedule[position];

            let blocked = frontier.dependencies[position]
                .iter()
                .any(|dependency| ctx.status(*dependency).blocks_dependents());
            if blocked {
                ctx.mark_skipped(id);
                frontier.settle(id);
                continue;
            }

            let node = workflow.node(id)?;
            let inputs = ctx.inputs_for(workflow, node);
            let processor = node.processor().clone();

            tracing::debug!(
                target: TRACING_TARGET,
                node_id = %id,
                node_type = %node.node_type,
                inputs = inputs.len(),
                "Node started"
            );

            ctx.mark_running(id);
            in_flight.push(
                async move {
                    let started = Instant::now();
                    let result = AssertUnwindSafe(processor.process(inputs))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| Err(panic_failure(payload.as_ref())));
                    (id, result, started.elapsed())
                }
                .boxed(),
            );
        }

        Ok(())
    }
}

/// Converts a panic payload into a node failure.
fn panic_failure(payload: &(dyn Any + Send)) -> NodeFailure {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload");
    NodeFailure::new(format!("node panicked: {message}"))
}

/// Dependency bookkeeping of a run, indexed by schedule position.
struct Frontier {
    schedule: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
    /// Direct dependencies of each node.
    dependencies: Vec<Vec<NodeId>>,
    /// Positions of the direct dependents of each node.
    dependents: Vec<Vec<usize>>,
    /// Number of direct dependencies not yet terminal.
    remaining: Vec<usize>,
    /// Positions of nodes whose dependencies are all terminal.
    ready: BTreeSet<usize>,
    settled: usize,
}

impl Frontier {
    fn new(workflow: &WorkflowGraph, schedule: Vec<NodeId>) -> Self {
        let positions: HashMap<NodeId, usize> = schedule
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position))
            .collect();
        let dependencies: Vec<Vec<NodeId>> = schedule
            .iter()
            .map(|id| workflow.dependencies(*id))
            .collect();

        let mut dependents = vec![Vec::new(); schedule.len()];
        for (position, direct) in dependencies.iter().enumerate() {
            for dependency in direct {
                if let Some(source) = positions.get(dependency) {
                    dependents[*source].push(position);
                }
            }
        }

        let remaining: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let ready = remaining
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(position, _)| position)
            .collect();

        Self {
            schedule,
            positions,
            dependencies,
            dependents,
            remaining,
            ready,
            settled: 0,
        }
    }

    /// Records a node as terminal and releases dependents that became ready.
    fn settle(&mut self, id: NodeId) {
        let Some(position) = self.positions.get(&id).copied() else {
            return;
        };
        self.settled += 1;

        for dependent in &self.dependents[position] {
            let remaining = &mut self.remaining[*dependent];
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.ready.insert(*dependent);
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.settled == self.schedule.len()
    }

    fn unsettled(&self) -> usize {
        self.schedule.len() - self.settled
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("available_permits", &self.semaphore.available_permits())
            .finish()
    }
}
