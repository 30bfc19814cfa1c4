//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── command: Command           # validate | run | describe
//! ├── engine: EngineConfig       # concurrency, parallelism, timeout, answer slot
//! ├── storage: StorageConfig     # backend for persisted workflows
//! └── log: LogConfig             # log output format
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.

mod log;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use docr_opendal::StorageConfig;
use docr_runtime::engine::EngineConfig;
pub use log::{LogConfig, LogFormat};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "docr")]
#[command(about = "Validate and run document question-answering workflows")]
#[command(version)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Execution engine configuration.
    #[clap(flatten)]
    pub engine: EngineConfig,

    /// Storage backend for persisted workflows.
    #[clap(flatten)]
    pub storage: StorageConfig,

    /// Log output configuration.
    #[clap(flatten)]
    pub log: LogConfig,

    /// Mock question-answering configuration.
    #[cfg(feature = "mock")]
    #[clap(flatten)]
    pub mock: docr_test::MockQaConfig,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Validates a workflow definition and prints its execution order.
    Validate {
        /// Path to the workflow definition (JSON).
        definition: PathBuf,
    },

    /// Runs a workflow definition and prints the run report as JSON.
    Run {
        /// Path to the workflow definition (JSON).
        definition: PathBuf,

        /// Document supplied as `file_content`.
        #[arg(long)]
        file: PathBuf,

        /// Question supplied as `question`.
        #[arg(long)]
        question: String,

        /// Overrides the engine's run timeout, in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Saves the workflow and its final node statuses to storage.
        #[arg(long)]
        persist: bool,
    },

    /// Lists node types and their configuration fields.
    Describe {
        /// Only describe this node type.
        node_type: Option<String>,
    },
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so clap's `env` fallbacks can see it.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.storage
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid storage configuration: {e}"))?;
        if self.engine.max_concurrent_runs == 0 || self.engine.max_parallel_nodes == 0 {
            anyhow::bail!("engine limits must be at least 1");
        }
        Ok(())
    }

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            max_concurrent_runs = self.engine.max_concurrent_runs,
            max_parallel_nodes = self.engine.max_parallel_nodes,
            run_timeout_secs = ?self.engine.run_timeout,
            answer_slot = %self.engine.answer_slot,
            storage_backend = %self.storage.backend_type,
            "Configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "dotenv").then_some("dotenv"),
            cfg!(feature = "mock").then_some("mock"),
            cfg!(feature = "s3").then_some("s3"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
