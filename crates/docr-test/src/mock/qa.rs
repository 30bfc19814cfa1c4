//! Mock question-answering node.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "config")]
use clap::Args;
use docr_runtime::node::{
    ConfigField, DataValue, NodeDescriptor, NodeFailure, NodeProcessor, NodeRegistry, NodeResult,
    SlotValues,
};
use serde::{Deserialize, Serialize};

/// Type key under which the mock is registered.
pub const QA_CHAIN: &str = "qa_chain";

/// Configuration for the mock question-answering node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct MockQaConfig {
    /// Fixed answer returned for every question.
    #[cfg_attr(feature = "config", arg(long = "mock-answer", env = "MOCK_ANSWER"))]
    pub answer: Option<String>,
}

/// Answers questions without calling a language model.
///
/// Unless a fixed answer is configured, the answer quotes the question and
/// the first chunk that shares a word with it.
#[derive(Debug, Clone)]
pub struct MockQaNode {
    descriptor: NodeDescriptor,
    config: MockQaConfig,
}

impl MockQaNode {
    /// Creates a mock with the given configuration.
    pub fn new(config: MockQaConfig) -> Self {
        Self {
            descriptor: Self::type_descriptor(),
            config,
        }
    }

    /// Returns the descriptor of the `qa_chain` type.
    pub fn type_descriptor() -> NodeDescriptor {
        NodeDescriptor::new(QA_CHAIN, "QA Chain (mock)")
            .with_inputs(["chunks", "question", "custom_prompt"])
            .with_outputs(["answer"])
            .with_config_field(ConfigField::text("custom_prompt", "Custom Prompt"))
    }

    /// Registers the mock as `qa_chain`.
    pub fn register(registry: &mut NodeRegistry, config: MockQaConfig) {
        registry.register(Self::type_descriptor(), move |_node_config| {
            Ok(Arc::new(MockQaNode::new(config.clone())) as Arc<dyn NodeProcessor>)
        });
    }
}

#[async_trait]
impl NodeProcessor for MockQaNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn process(&self, inputs: SlotValues) -> NodeResult {
        let question = inputs
            .text("question")
            .ok_or_else(|| NodeFailure::new("missing required input 'question'"))?;
        let chunks = inputs
            .require("chunks")?
            .as_text_list()
            .ok_or_else(|| NodeFailure::new("chunks must be a list of texts"))?;

        if let Some(answer) = &self.config.answer {
            return Ok(SlotValues::new().with("answer", answer.as_str()));
        }

        let words: Vec<String> = question
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|word| word.len() > 2)
            .collect();

        let context = chunks
            .iter()
            .find(|chunk| {
                let chunk = chunk.to_lowercase();
                words.iter().any(|word| chunk.contains(word.as_str()))
            })
            .or_else(|| chunks.first())
            .map(String::as_str)
            .unwrap_or_default();

        let answer = match inputs.text("custom_prompt") {
            Some(prompt) => format!("[{prompt}] {question}: {context}"),
            None => format!("{question}: {context}"),
        };

        Ok(SlotValues::new().with("answer", DataValue::Text(answer)))
    }
}
