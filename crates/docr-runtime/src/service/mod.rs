//! Workflow service and persistence.

mod service;
mod store;

pub use service::{CUSTOM_PROMPT_SLOT, WorkflowService};
pub use store::{DEFAULT_WORKFLOW_PREFIX, StorageWorkflowStore, WorkflowStore};
