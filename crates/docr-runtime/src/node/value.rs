//! Values carried on node slots.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use derive_more::{Deref, DerefMut, From, IntoIterator};
use serde::{Serialize, Serializer};

/// A value flowing through a slot.
///
/// The engine never looks inside a value; only the producing and consuming
/// node types agree on which variant a slot carries.
#[derive(Debug, Clone, From)]
pub enum DataValue {
    /// Raw bytes, e.g. an uploaded document.
    Bytes(Bytes),
    /// A single text value, e.g. a question.
    Text(String),
    /// An ordered list of texts, e.g. documents or chunks.
    TextList(Vec<String>),
    /// Structured data.
    Json(serde_json::Value),
    /// An opaque in-process object, e.g. a retriever.
    #[from(skip)]
    Handle(Handle),
}

impl DataValue {
    /// Creates a handle value from any shareable object.
    pub fn handle<T: Any + Send + Sync>(value: T) -> Self {
        Self::Handle(Handle::new(value))
    }

    /// Returns the value as bytes, if it is bytes.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the value as a list of texts, if it is one.
    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Self::TextList(texts) => Some(texts),
            _ => None,
        }
    }

    /// Returns the value as JSON, if it is JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Downcasts a handle value to a concrete type.
    pub fn downcast_handle<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Self::Handle(handle) => handle.downcast_ref(),
            _ => None,
        }
    }

    /// Returns a short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::TextList(_) => "text_list",
            Self::Json(_) => "json",
            Self::Handle(_) => "handle",
        }
    }

    /// Converts the value into a JSON-safe summary.
    ///
    /// Bytes are reduced to their length and handles are dropped, so the
    /// result can always be serialized.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Value, json};

        match self {
            Self::Bytes(bytes) => json!({ "bytes": bytes.len() }),
            Self::Text(text) => Value::String(text.clone()),
            Self::TextList(texts) => Value::from(texts.clone()),
            Self::Json(value) => value.clone(),
            Self::Handle(_) => Value::Null,
        }
    }
}

impl From<&str> for DataValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for DataValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Shared, type-erased object passed between nodes.
#[derive(Clone)]
pub struct Handle(Arc<dyn Any + Send + Sync>);

impl Handle {
    /// Wraps a value in a handle.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Downcasts the handle to a concrete type.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handle(..)")
    }
}

/// Values keyed by slot name.
///
/// Used both as the input mapping passed to a node and as the output
/// mapping it returns.
#[derive(Debug, Clone, Default, Serialize)]
#[derive(Deref, DerefMut, From, IntoIterator)]
#[serde(transparent)]
pub struct SlotValues(BTreeMap<String, DataValue>);

impl SlotValues {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, builder-style.
    pub fn with(mut self, slot: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.0.insert(slot.into(), value.into());
        self
    }

    /// Inserts a value, returning the previous one.
    pub fn set(&mut self, slot: impl Into<String>, value: impl Into<DataValue>) -> Option<DataValue> {
        self.0.insert(slot.into(), value.into())
    }

    /// Returns the value for `slot` or a failure naming the missing slot.
    pub fn require(&self, slot: &str) -> Result<&DataValue, super::NodeFailure> {
        self.0
            .get(slot)
            .ok_or_else(|| super::NodeFailure::new(format!("missing required input '{slot}'")))
    }

    /// Returns the text value for `slot`, if present and textual.
    pub fn text(&self, slot: &str) -> Option<&str> {
        self.0.get(slot).and_then(DataValue::as_text)
    }

    /// Returns the slot names in order.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<DataValue>> FromIterator<(K, V)> for SlotValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(slot, value)| (slot.into(), value.into()))
                .collect(),
        )
    }
}
