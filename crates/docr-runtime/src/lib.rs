#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod engine;
mod error;
pub mod graph;
mod id;
pub mod node;
pub mod service;

#[cfg(test)]
mod fixtures;

#[doc(hidden)]
pub mod prelude;

pub use error::{ErrorKind, SlotDirection, WorkflowError, WorkflowResult};

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "docr_runtime";
