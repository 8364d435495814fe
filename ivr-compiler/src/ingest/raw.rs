//! Loosely-typed parser output
//!
//! Every parser reduces its document to [`RawNode`], the closed set of shapes
//! the normalizer knows how to handle.

use serde_json::Value;

/// Shapes a menu node can take in an uploaded document
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    /// Bare list of options (implicit root)
    Sequence(Vec<RawNode>),
    /// Mapping with an optional label and optional nested collections
    Record {
        text: Option<String>,
        children: Option<Vec<RawNode>>,
        options: Option<Vec<RawNode>>,
    },
    /// Bare value inside an option list, used as a leaf label
    Scalar(String),
    /// Null / empty entry
    Empty,
}

impl RawNode {
    /// Classify a generic document value
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => RawNode::Sequence(items.into_iter().map(RawNode::from_value).collect()),
            Value::Object(mut map) => RawNode::Record {
                text: map.remove("text").and_then(label_of),
                children: map.remove("children").and_then(collection_of),
                options: map.remove("options").and_then(collection_of),
            },
            Value::Null => RawNode::Empty,
            other => label_of(other).map(RawNode::Scalar).unwrap_or(RawNode::Empty),
        }
    }
}

/// Textual form of a scalar; containers carry no label
fn label_of(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Nested collection; `null` counts as absent so `options` can still apply
fn collection_of(value: Value) -> Option<Vec<RawNode>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items.into_iter().map(RawNode::from_value).collect()),
        single => Some(vec![RawNode::from_value(single)]),
    }
}
