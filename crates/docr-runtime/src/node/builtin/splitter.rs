//! Character-based document chunking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use text_splitter::{ChunkConfig, TextSplitter};

use crate::node::{
    ConfigField, DataValue, NodeDescriptor, NodeFailure, NodeProcessor, NodeResult, SlotValues,
};

/// Type key of the text splitter.
pub const TEXT_SPLITTER: &str = "text_splitter";

/// Default maximum chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const MIN_CHUNK_SIZE: usize = 100;
const MAX_CHUNK_SIZE: usize = 10_000;
const MAX_CHUNK_OVERLAP: usize = 1000;

/// Options accepted by the text splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterOptions {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for SplitterOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl SplitterOptions {
    /// Checks the options against the advertised bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(format!(
                "chunk_size must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE}"
            ));
        }
        if self.chunk_overlap > MAX_CHUNK_OVERLAP {
            return Err(format!("chunk_overlap must be at most {MAX_CHUNK_OVERLAP}"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be smaller than chunk_size".into());
        }
        Ok(())
    }
}

/// Splits documents into overlapping chunks at semantic boundaries.
pub struct TextSplitterNode {
    descriptor: NodeDescriptor,
    options: SplitterOptions,
    splitter: TextSplitter<text_splitter::Characters>,
}

impl TextSplitterNode {
    /// Creates a splitter, rejecting out-of-range options.
    pub fn new(options: SplitterOptions) -> Result<Self, String> {
        options.validate()?;

        let config = ChunkConfig::new(options.chunk_size)
            .with_overlap(options.chunk_overlap)
            .map_err(|e| e.to_string())?;

        Ok(Self {
            descriptor: Self::type_descriptor(),
            options,
            splitter: TextSplitter::new(config),
        })
    }

    /// Returns the splitter's descriptor.
    pub fn type_descriptor() -> NodeDescriptor {
        NodeDescriptor::new(TEXT_SPLITTER, "Text Splitter")
            .with_inputs(["documents"])
            .with_outputs(["chunks"])
            .with_config_field(
                ConfigField::number(
                    "chunk_size",
                    "Chunk Size",
                    MIN_CHUNK_SIZE as f64,
                    MAX_CHUNK_SIZE as f64,
                )
                .with_default(DEFAULT_CHUNK_SIZE),
            )
            .with_config_field(
                ConfigField::number("chunk_overlap", "Chunk Overlap", 0.0, MAX_CHUNK_OVERLAP as f64)
                    .with_default(DEFAULT_CHUNK_OVERLAP),
            )
    }

    /// Returns the active options.
    pub fn options(&self) -> SplitterOptions {
        self.options
    }
}

impl std::fmt::Debug for TextSplitterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSplitterNode")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NodeProcessor for TextSplitterNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn process(&self, inputs: SlotValues) -> NodeResult {
        let documents: Vec<String> = match inputs.require("documents")? {
            DataValue::TextList(documents) => documents.clone(),
            DataValue::Text(text) => vec![text.clone()],
            other => {
                return Err(NodeFailure::new(format!(
                    "expected documents, got {}",
                    other.kind()
                )));
            }
        };

        let chunks: Vec<String> = documents
            .iter()
            .flat_map(|document| self.splitter.chunks(document))
            .map(str::to_owned)
            .collect();

        if chunks.is_empty() {
            return Err(NodeFailure::new("no chunks produced"));
        }

        Ok(SlotValues::new().with("chunks", chunks))
    }
}
