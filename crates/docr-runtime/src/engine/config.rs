//! Engine configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default name of the slot carrying the user-facing answer.
pub const DEFAULT_ANSWER_SLOT: &str = "answer";

/// Configuration for the workflow execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum number of concurrent workflow runs.
    #[builder(default = "10")]
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DOCR_MAX_CONCURRENT_RUNS", default_value = "10")
    )]
    pub max_concurrent_runs: usize,

    /// Maximum number of independent nodes processed at once within a run.
    ///
    /// `1` executes strictly in scheduled order.
    #[builder(default = "1")]
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DOCR_MAX_PARALLEL_NODES", default_value = "1")
    )]
    pub max_parallel_nodes: usize,

    /// Default run timeout in seconds. Unset means no timeout.
    #[builder(default)]
    #[cfg_attr(feature = "config", arg(long, env = "DOCR_RUN_TIMEOUT"))]
    pub run_timeout: Option<u64>,

    /// Output slot read as the run's final answer.
    #[builder(default = "DEFAULT_ANSWER_SLOT.to_owned()")]
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DOCR_ANSWER_SLOT", default_value = DEFAULT_ANSWER_SLOT)
    )]
    pub answer_slot: String,
}

impl EngineConfig {
    /// Returns a builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Returns the default run timeout as a duration.
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout.map(Duration::from_secs)
    }

    /// Returns the effective node parallelism, at least one.
    pub fn parallelism(&self) -> usize {
        self.max_parallel_nodes.max(1)
    }
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_concurrent_runs {
            if max == 0 {
                return Err("max_concurrent_runs must be at least 1".into());
            }
        }
        if let Some(max) = self.max_parallel_nodes {
            if max == 0 {
                return Err("max_parallel_nodes must be at least 1".into());
            }
        }
        if let Some(Some(0)) = self.run_timeout {
            return Err("run_timeout must be at least 1 second".into());
        }
        if let Some(slot) = &self.answer_slot {
            if slot.trim().is_empty() {
                return Err("answer_slot must not be empty".into());
            }
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 10,
            max_parallel_nodes: 1,
            run_timeout: None,
            answer_slot: DEFAULT_ANSWER_SLOT.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_default() {
        let built = EngineConfig::builder().build().unwrap();
        assert_eq!(built, EngineConfig::default());
        assert_eq!(built.run_timeout(), None);
    }

    #[test]
    fn test_builder_rejects_zero_limits() {
        assert!(EngineConfig::builder().max_concurrent_runs(0usize).build().is_err());
        assert!(EngineConfig::builder().max_parallel_nodes(0usize).build().is_err());
        assert!(EngineConfig::builder().run_timeout(Some(0u64)).build().is_err());
        assert!(EngineConfig::builder().answer_slot(" ").build().is_err());
    }

    #[test]
    fn test_run_timeout_duration() {
        let config = EngineConfig::builder().run_timeout(Some(5u64)).build().unwrap();
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(5)));
    }
}
