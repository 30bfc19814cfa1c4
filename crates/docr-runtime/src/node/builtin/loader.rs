//! Plain-text document loader.

use async_trait::async_trait;

use crate::node::{DataValue, NodeDescriptor, NodeFailure, NodeProcessor, NodeResult, SlotValues};

/// Type key of the text loader.
pub const TEXT_LOADER: &str = "text_loader";

/// Turns raw file content into a single-document list.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
#[derive(Debug)]
pub struct TextLoader {
    descriptor: NodeDescriptor,
}

impl TextLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self {
            descriptor: Self::type_descriptor(),
        }
    }

    /// Returns the loader's descriptor.
    pub fn type_descriptor() -> NodeDescriptor {
        NodeDescriptor::new(TEXT_LOADER, "Text Loader")
            .with_inputs(["file_content"])
            .with_outputs(["documents"])
    }
}

impl Default for TextLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeProcessor for TextLoader {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn process(&self, inputs: SlotValues) -> NodeResult {
        let document = match inputs.require("file_content")? {
            DataValue::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            DataValue::Text(text) => text.clone(),
            other => {
                return Err(NodeFailure::new(format!(
                    "expected file content, got {}",
                    other.kind()
                )));
            }
        };

        if document.trim().is_empty() {
            return Err(NodeFailure::new("document is empty"));
        }

        Ok(SlotValues::new().with("documents", vec![document]))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_loads_bytes() {
        let loader = TextLoader::new();
        let inputs = SlotValues::new().with("file_content", Bytes::from_static(b"hello world"));
        let outputs = loader.process(inputs).await.unwrap();
        assert_eq!(
            outputs.get("documents").and_then(DataValue::as_text_list),
            Some(&["hello world".to_owned()][..])
        );
    }

    #[tokio::test]
    async fn test_missing_input_fails() {
        let loader = TextLoader::new();
        let err = loader.process(SlotValues::new()).await.unwrap_err();
        assert!(err.message().contains("file_content"));
    }

    #[tokio::test]
    async fn test_empty_document_fails() {
        let loader = TextLoader::new();
        let inputs = SlotValues::new().with("file_content", "   ");
        assert!(loader.process(inputs).await.is_err());
    }
}
