use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use docr_opendal::{StorageBackend, StorageConfig};
use docr_runtime::engine::{Engine, EngineConfig, InitialData, RunOptions};
use docr_runtime::node::NodeRegistry;
use docr_runtime::service::{StorageWorkflowStore, WorkflowService};
use tokio_util::sync::CancellationToken;

use super::read_definition;
use crate::TRACING_TARGET_COMMAND;

/// Arguments of the `run` command.
#[derive(Debug)]
pub struct RunRequest {
    pub definition: PathBuf,
    pub file: PathBuf,
    pub question: String,
    pub timeout: Option<u64>,
    pub persist: bool,
}

/// Executes a workflow definition against a document and a question.
pub async fn run(
    registry: NodeRegistry,
    engine: EngineConfig,
    storage: StorageConfig,
    request: RunRequest,
) -> anyhow::Result<()> {
    let definition = read_definition(&request.definition).await?;
    let document = tokio::fs::read(&request.file)
        .await
        .with_context(|| format!("failed to read document {}", request.file.display()))?;

    let service = build_service(registry, engine, storage, request.persist)?;

    let workflow_id = service
        .import(definition)
        .await
        .context("failed to import workflow definition")?;

    let initial = InitialData::new()
        .with("file_content", document)
        .with("question", request.question.as_str());

    let cancellation = CancellationToken::new();
    let mut options = RunOptions::new().with_cancellation(cancellation.clone());
    if let Some(secs) = request.timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    tokio::spawn(cancel_on_ctrl_c(cancellation));

    let report = service
        .execute_with(workflow_id, initial, options)
        .await
        .context("failed to execute workflow")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        workflow_id = %workflow_id,
        status = %report.status,
        errors = report.errors.len(),
        skipped = report.skipped.len(),
        duration_ms = report.duration_ms,
        "Run finished"
    );

    let json = serde_json::to_string_pretty(&report).context("failed to serialize run report")?;
    println!("{json}");

    if !report.success {
        anyhow::bail!("workflow run {}", report.status);
    }
    Ok(())
}

/// Creates the workflow service, backed by storage when `persist` is set.
fn build_service(
    registry: NodeRegistry,
    engine: EngineConfig,
    storage: StorageConfig,
    persist: bool,
) -> anyhow::Result<WorkflowService> {
    let engine = Engine::new(engine);
    if !persist {
        return Ok(WorkflowService::new(registry, engine));
    }

    let backend = StorageBackend::new(storage).context("failed to initialize storage")?;
    let store = StorageWorkflowStore::new(backend);
    Ok(WorkflowService::with_store(registry, engine, store))
}

/// Cancels the run when the process receives ctrl-c.
async fn cancel_on_ctrl_c(cancellation: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!(target: TRACING_TARGET_COMMAND, "Interrupted, cancelling run");
        cancellation.cancel();
    }
}
