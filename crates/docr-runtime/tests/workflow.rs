//! End-to-end workflow scenarios against mock node types.

use std::time::Duration;

use docr_opendal::StorageBackend;
use docr_runtime::engine::{Engine, EngineConfig, InitialData, RunOptions, RunStatus};
use docr_runtime::graph::{
    ConnectionRequest, NodeInstance, NodeStatus, Position, WorkflowGraph, WorkflowMetadata,
};
use docr_runtime::node::{NodeConfig, NodeId, NodeProcessor, NodeRegistry};
use docr_runtime::service::{StorageWorkflowStore, WorkflowService};
use docr_runtime::ErrorKind;
use docr_test::{MockNode, MockQaConfig, mock_registry};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn place(graph: &mut WorkflowGraph, mock: MockNode) -> NodeId {
    let node_type = mock.descriptor().node_type.clone();
    let node = NodeInstance::new(
        node_type,
        NodeConfig::new(),
        Position::default(),
        mock.into_processor(),
    );
    graph.add_node(node).unwrap()
}

struct Pipeline {
    graph: WorkflowGraph,
    loader: NodeId,
    splitter: NodeId,
    qa: NodeId,
    splitter_mock: MockNode,
    qa_mock: MockNode,
}

fn pipeline(splitter: MockNode) -> Pipeline {
    let mut graph = WorkflowGraph::new(WorkflowMetadata::new("qa"));
    let qa_mock = MockNode::new("qa", &["chunks", "question"], &["answer"]);

    let loader = place(&mut graph, MockNode::new("loader", &[], &["documents"]));
    let splitter_id = place(&mut graph, splitter.clone());
    let qa = place(&mut graph, qa_mock.clone());

    graph
        .connect(ConnectionRequest::new(loader, "documents", splitter_id, "documents"))
        .unwrap();
    graph
        .connect(ConnectionRequest::new(splitter_id, "chunks", qa, "chunks"))
        .unwrap();

    Pipeline {
        graph,
        loader,
        splitter: splitter_id,
        qa,
        splitter_mock: splitter,
        qa_mock,
    }
}

fn initial() -> InitialData {
    InitialData::new()
        .with("file_content", "...")
        .with("question", "What is X?")
}

#[tokio::test]
async fn loader_splitter_qa_succeeds() {
    let p = pipeline(MockNode::new("splitter", &["documents"], &["chunks"]));

    let report = Engine::with_defaults().execute(&p.graph, initial()).await.unwrap();

    assert!(report.success);
    assert_eq!(report.execution_order, vec![p.loader, p.splitter, p.qa]);
    assert_eq!(report.answer_text(), Some("qa.answer"));

    let qa_inputs = &p.qa_mock.received()[0];
    assert_eq!(qa_inputs.text("chunks"), Some("splitter.chunks"));
    assert_eq!(qa_inputs.text("question"), Some("What is X?"));
}

#[tokio::test]
async fn failing_splitter_skips_qa() {
    let p = pipeline(MockNode::new("splitter", &["documents"], &["chunks"]).failing("split failed"));

    let report = Engine::with_defaults().execute(&p.graph, initial()).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.status_of(p.loader), Some(NodeStatus::Succeeded));
    assert_eq!(report.status_of(p.splitter), Some(NodeStatus::Failed));
    assert_eq!(report.status_of(p.qa), Some(NodeStatus::Skipped));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].node_id, p.splitter);
    assert_eq!(report.errors[0].message, "split failed");
    assert_eq!(report.skipped, vec![p.qa]);
    assert!(report.output(p.loader, "documents").is_some());
    assert!(report.answer.is_none());
    assert_eq!(p.qa_mock.calls(), 0);
    assert_eq!(p.splitter_mock.calls(), 1);
}

#[tokio::test]
async fn answer_into_input_less_loader_is_invalid_slot() {
    let mut p = pipeline(MockNode::new("splitter", &["documents"], &["chunks"]));
    let before = p.graph.connection_count();

    let err = p
        .graph
        .connect(ConnectionRequest::new(p.qa, "answer", p.loader, "documents"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidSlot);
    assert_eq!(p.graph.connection_count(), before);
}

#[tokio::test]
async fn cycle_and_second_writer_are_rejected() {
    let mut graph = WorkflowGraph::default();
    let a = place(&mut graph, MockNode::new("echo", &["in", "extra"], &["out"]));
    let b = place(&mut graph, MockNode::new("echo", &["in"], &["out"]));
    let c = place(&mut graph, MockNode::new("echo", &["in"], &["out"]));
    graph.connect(ConnectionRequest::new(a, "out", b, "in")).unwrap();
    graph.connect(ConnectionRequest::new(b, "out", c, "in")).unwrap();

    let err = graph
        .connect(ConnectionRequest::new(c, "out", a, "in"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CycleDetected);

    let err = graph
        .connect(ConnectionRequest::new(a, "out", c, "in"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SlotAlreadyBound);

    assert_eq!(graph.connection_count(), 2);
}

#[tokio::test]
async fn independent_branch_still_succeeds() {
    let mut p = pipeline(MockNode::new("splitter", &["documents"], &["chunks"]).failing("boom"));
    let summary = place(&mut p.graph, MockNode::new("summary", &["question"], &["summary"]));

    let report = Engine::with_defaults().execute(&p.graph, initial()).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.status_of(summary), Some(NodeStatus::Succeeded));
    assert!(report.output(summary, "summary").is_some());
}

fn fork_join(delay: Duration) -> (WorkflowGraph, NodeId) {
    let mut graph = WorkflowGraph::default();
    let left = place(&mut graph, MockNode::new("left", &[], &["out"]).with_delay(delay));
    let right = place(&mut graph, MockNode::new("right", &[], &["out"]).with_delay(delay));
    let join = place(&mut graph, MockNode::new("join", &["a", "b"], &["answer"]));
    graph.connect(ConnectionRequest::new(left, "out", join, "a")).unwrap();
    graph.connect(ConnectionRequest::new(right, "out", join, "b")).unwrap();
    (graph, join)
}

#[tokio::test(start_paused = true)]
async fn parallel_branches_run_concurrently() {
    let delay = Duration::from_millis(200);
    let (graph, join) = fork_join(delay);

    let config = EngineConfig::builder().max_parallel_nodes(2usize).build().unwrap();
    let started = Instant::now();
    let report = Engine::new(config)
        .execute(&graph, InitialData::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(report.success);
    assert_eq!(report.execution_order.last(), Some(&join));
    assert!(elapsed >= delay, "{elapsed:?}");
    assert!(elapsed < delay * 2, "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn sequential_branches_take_turns() {
    let delay = Duration::from_millis(200);
    let (graph, _) = fork_join(delay);

    let started = Instant::now();
    let report = Engine::with_defaults()
        .execute(&graph, InitialData::new())
        .await
        .unwrap();

    assert!(report.success);
    assert!(started.elapsed() >= delay * 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_between_nodes() {
    let token = CancellationToken::new();
    let mut graph = WorkflowGraph::default();
    let first = place(&mut graph, MockNode::new("first", &[], &["out"]).with_delay(Duration::from_millis(50)));
    let second = MockNode::new("second", &["in"], &["out"]);
    let second_id = place(&mut graph, second.clone());
    graph.connect(ConnectionRequest::new(first, "out", second_id, "in")).unwrap();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        })
    };

    let started = Instant::now();
    let report = Engine::with_defaults()
        .execute_with(&graph, InitialData::new(), RunOptions::new().with_cancellation(token))
        .await
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(!report.success);
    assert_eq!(report.status_of(first), Some(NodeStatus::Succeeded));
    assert_eq!(report.status_of(second_id), Some(NodeStatus::Pending));
    assert_eq!(second.calls(), 0);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn timeout_leaves_in_flight_node_running() {
    let mut graph = WorkflowGraph::default();
    let hanging = place(&mut graph, MockNode::new("hanging", &[], &["out"]).with_delay(Duration::from_secs(30)));

    let timeout = Duration::from_millis(20);
    let started = Instant::now();
    let report = Engine::with_defaults()
        .execute_with(&graph, InitialData::new(), RunOptions::new().with_timeout(timeout))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.status, RunStatus::TimedOut);
    assert_eq!(report.status_of(hanging), Some(NodeStatus::Running));
    assert_eq!(report.execution_order, vec![hanging]);
    assert!(elapsed >= timeout, "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(30), "{elapsed:?}");
}

#[tokio::test]
async fn builtin_pipeline_with_mock_qa() {
    let service = WorkflowService::new(mock_registry(MockQaConfig::default()), Engine::with_defaults());
    let workflow = service
        .create_workflow(WorkflowMetadata::new("docs").with_custom_prompt("Be brief"))
        .await
        .unwrap();

    let loader = service
        .add_node(workflow, "text_loader", NodeConfig::new(), Position::default())
        .await
        .unwrap();
    let splitter = service
        .add_node(
            workflow,
            "text_splitter",
            NodeConfig::new().with("chunk_size", 200).with("chunk_overlap", 20),
            Position::new(200.0, 0.0),
        )
        .await
        .unwrap();
    let qa = service
        .add_node(workflow, "qa_chain", NodeConfig::new(), Position::new(400.0, 0.0))
        .await
        .unwrap();
    service
        .connect(workflow, ConnectionRequest::new(loader, "documents", splitter, "documents"))
        .await
        .unwrap();
    service
        .connect(workflow, ConnectionRequest::new(splitter, "chunks", qa, "chunks"))
        .await
        .unwrap();

    let document = "Ferris is the mascot of Rust. ".repeat(20);
    let report = service
        .execute(
            workflow,
            InitialData::new()
                .with("file_content", document.into_bytes())
                .with("question", "Who is Ferris?"),
        )
        .await
        .unwrap();

    assert!(report.success, "errors: {:?}", report.errors);
    let answer = report.answer_text().unwrap();
    assert!(answer.starts_with("[Be brief] Who is Ferris?"));
    assert!(answer.contains("Ferris is the mascot"));
}

#[tokio::test]
async fn remove_node_cascades_through_service() {
    let service = WorkflowService::new(mock_registry(MockQaConfig::default()), Engine::with_defaults());
    let workflow = service.create_workflow(WorkflowMetadata::new("docs")).await.unwrap();
    let loader = service
        .add_node(workflow, "text_loader", NodeConfig::new(), Position::default())
        .await
        .unwrap();
    let splitter = service
        .add_node(workflow, "text_splitter", NodeConfig::new(), Position::default())
        .await
        .unwrap();
    let connection = service
        .connect(workflow, ConnectionRequest::new(loader, "documents", splitter, "documents"))
        .await
        .unwrap();

    service.remove_node(workflow, splitter).await.unwrap();

    let graph = service.snapshot(workflow).await.unwrap();
    assert_eq!(graph.connection_count(), 0);
    assert!(graph.get_connection(connection).is_none());
    let err = service.disconnect(workflow, connection).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownConnection);
}

#[tokio::test]
async fn persisted_workflow_survives_restart() {
    let store = StorageWorkflowStore::new(StorageBackend::memory().unwrap());
    let registry = || mock_registry(MockQaConfig { answer: Some("42".into()) });

    let first = WorkflowService::with_store(registry(), Engine::with_defaults(), store.clone());
    let workflow = first.create_workflow(WorkflowMetadata::new("docs")).await.unwrap();
    let splitter = first
        .add_node(workflow, "text_splitter", NodeConfig::new().with("chunk_size", 300), Position::default())
        .await
        .unwrap();

    let second = WorkflowService::with_store(registry(), Engine::with_defaults(), store.clone());
    let definition = second.definition(workflow).await.unwrap();
    assert_eq!(definition.nodes.len(), 1);
    assert_eq!(definition.nodes[0].id, splitter);
    assert_eq!(
        definition.nodes[0].config.get("chunk_size"),
        Some(&serde_json::json!(300))
    );
    assert_eq!(second.list_workflows().await, vec![workflow]);

    second.delete_workflow(workflow).await.unwrap();

    let third = WorkflowService::with_store(registry(), Engine::with_defaults(), store);
    let err = third.snapshot(workflow).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownWorkflow);
    assert!(third.list_workflows().await.is_empty());
}

#[test]
fn mock_registry_exposes_schemas() {
    let registry: NodeRegistry = mock_registry(MockQaConfig::default());
    let types: Vec<_> = registry.node_types().collect();
    assert_eq!(types, vec!["qa_chain", "text_loader", "text_splitter"]);
    assert_eq!(registry.config_schema("text_splitter").unwrap().len(), 2);
    assert_eq!(registry.describe("qa_chain").unwrap().inputs, vec!["chunks", "question", "custom_prompt"]);
}
