//! Command handlers.

mod describe;
mod run;
mod validate;

use std::path::Path;

use anyhow::Context;
use docr_runtime::graph::WorkflowDefinition;
use docr_runtime::node::NodeRegistry;

use crate::config::{Cli, Command};

/// Dispatches the parsed command.
pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let registry = registry(&cli);

    match cli.command {
        Command::Validate { definition } => validate::validate(&registry, &definition).await,
        Command::Run {
            definition,
            file,
            question,
            timeout,
            persist,
        } => {
            let request = run::RunRequest {
                definition,
                file,
                question,
                timeout,
                persist,
            };
            run::run(registry, cli.engine, cli.storage, request).await
        }
        Command::Describe { node_type } => describe::describe(&registry, node_type.as_deref()),
    }
}

/// Builds the node registry for this build's feature set.
#[cfg(feature = "mock")]
fn registry(cli: &Cli) -> NodeRegistry {
    docr_test::mock_registry(cli.mock.clone())
}

/// Builds the node registry for this build's feature set.
#[cfg(not(feature = "mock"))]
fn registry(_cli: &Cli) -> NodeRegistry {
    NodeRegistry::with_builtins()
}

/// Reads and parses a workflow definition file.
async fn read_definition(path: &Path) -> anyhow::Result<WorkflowDefinition> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read workflow definition {}", path.display()))?;
    WorkflowDefinition::from_json(&json)
        .with_context(|| format!("failed to parse workflow definition {}", path.display()))
}
