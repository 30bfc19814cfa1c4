//! Workflow execution engine.
//!
//! This module provides the runtime for executing workflows:
//! - [`execution_order`]: deterministic scheduling
//! - [`Engine`]: the execution orchestrator
//! - [`EngineConfig`]: configuration options
//! - [`RunReport`]: the aggregated result of a run

mod config;
mod context;
mod executor;
mod report;
mod scheduler;

pub use config::{DEFAULT_ANSWER_SLOT, EngineConfig, EngineConfigBuilder};
pub use context::{ExecutionContext, InitialData, RunOptions};
pub use executor::Engine;
pub use report::{NodeError, NodeRunRecord, RunReport, RunStatus};
pub use scheduler::{execution_order, upstream};
