//! Response envelope classification.
//!
//! The hosted inference services make no schema guarantee: depending on the
//! provider and the day, the same call may answer with a bare array, a plain
//! string, or an object nesting the payload under `output`, `data.output`,
//! `text`, or `content`. Rather than duck-typing at every call site, the
//! known shapes are classified once into a small tagged union.

use serde_json::Value;

use crate::error::CuratorError;

/// The two payload shapes the pipeline knows how to consume.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// The envelope already carried a JSON array.
    Items(Vec<Value>),
    /// A string believed to contain JSON.
    Text(String),
}

/// Classify an opaque response envelope into [`Extracted`].
///
/// Checks, in order: the envelope itself (array or string), `.output`,
/// `.data.output`, then the `.text` and `.content` string fields. Fails with
/// [`CuratorError::Extraction`] when none of them carry a usable payload.
pub fn extract_payload(envelope: &Value) -> Result<Extracted, CuratorError> {
    tracing::debug!(shape = json_shape(envelope), "classifying response envelope");

    if let Some(extracted) = classify(envelope) {
        return Ok(extracted);
    }
    if let Some(extracted) = envelope.get("output").and_then(classify) {
        return Ok(extracted);
    }
    if let Some(extracted) = envelope.pointer("/data/output").and_then(classify) {
        return Ok(extracted);
    }
    for key in ["text", "content"] {
        if let Some(s) = envelope.get(key).and_then(Value::as_str) {
            return Ok(Extracted::Text(s.to_string()));
        }
    }

    Err(CuratorError::Extraction(format!(
        "no JSON-bearing field in response envelope (shape: {})",
        json_shape(envelope)
    )))
}

fn classify(value: &Value) -> Option<Extracted> {
    match value {
        Value::Array(items) => Some(Extracted::Items(items.clone())),
        Value::String(s) => Some(Extracted::Text(s.clone())),
        _ => None,
    }
}

pub(crate) fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
