//! Static node type metadata.

use serde::{Deserialize, Serialize};

use crate::error::SlotDirection;

/// Static description of a node type.
///
/// Slot lists are ordered and never change at runtime. They drive both
/// connection validation and input routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Type key used by the registry.
    pub node_type: String,
    /// Human-readable type name.
    pub name: String,
    /// Declared input slot names.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Declared output slot names.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Configuration fields understood by this node type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_fields: Vec<ConfigField>,
}

impl NodeDescriptor {
    /// Creates a descriptor with no slots.
    pub fn new(node_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            config_fields: Vec::new(),
        }
    }

    /// Sets the declared input slots.
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the declared output slots.
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a configuration field.
    pub fn with_config_field(mut self, field: ConfigField) -> Self {
        self.config_fields.push(field);
        self
    }

    /// Returns whether `slot` is a declared input.
    pub fn has_input(&self, slot: &str) -> bool {
        self.inputs.iter().any(|s| s == slot)
    }

    /// Returns whether `slot` is a declared output.
    pub fn has_output(&self, slot: &str) -> bool {
        self.outputs.iter().any(|s| s == slot)
    }

    /// Returns whether `slot` is declared in the given direction.
    pub fn has_slot(&self, direction: SlotDirection, slot: &str) -> bool {
        match direction {
            SlotDirection::Input => self.has_input(slot),
            SlotDirection::Output => self.has_output(slot),
        }
    }
}

/// A configuration option rendered by clients in a node's settings panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    /// Key in the node configuration mapping.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Value kind.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Whether the field must be set.
    #[serde(default)]
    pub required: bool,
}

impl ConfigField {
    /// Creates an optional free-text field.
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::Text,
            default: None,
            required: false,
        }
    }

    /// Creates an optional numeric field with inclusive bounds.
    pub fn number(name: impl Into<String>, label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::Number {
                min: Some(min),
                max: Some(max),
            },
            default: None,
            required: false,
        }
    }

    /// Creates an optional single-choice field.
    pub fn select(
        name: impl Into<String>,
        label: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::Select {
                options: options.into_iter().map(Into::into).collect(),
            },
            default: None,
            required: false,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<serde_json::Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Kind of a configuration field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Number with optional inclusive bounds.
    Number {
        /// Lower bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Upper bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// One of a fixed set of options.
    Select {
        /// Allowed values.
        options: Vec<String>,
    },
}
