//! Workflow metadata.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Descriptive data attached to a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Prompt text passed to question-answering nodes as `custom_prompt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

impl WorkflowMetadata {
    /// Creates metadata with both timestamps set to now.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            name: name.into(),
            description: None,
            custom_prompt: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the workflow description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the custom prompt.
    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    /// Bumps the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

impl Default for WorkflowMetadata {
    fn default() -> Self {
        Self::new("Untitled workflow")
    }
}
