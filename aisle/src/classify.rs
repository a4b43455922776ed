//! Follow-up intent classification.
//!
//! A second model call decides whether a refinement message should update
//! specific existing categories or trigger a full regeneration. The
//! classifier is advisory only: any failure here makes the caller fall
//! through to a full regeneration, never to an error state.

use serde_json::{Map, Value};

use crate::envelope::{extract_payload, json_shape, Extracted};
use crate::error::CuratorError;
use crate::parse::{first_balanced, strip_code_fences};
use crate::types::Decision;

/// Parse the classifier's response envelope into a [`Decision`].
///
/// Uses the same extraction fallback chain as category parsing, in object
/// form. Target contents are not validated here; matching against actual
/// categories happens in the updater.
pub fn parse_decision(envelope: &Value) -> Result<Decision, CuratorError> {
    let text = match extract_payload(envelope) {
        Ok(Extracted::Text(text)) => text,
        Ok(Extracted::Items(_)) => {
            return Err(CuratorError::Classification(
                "expected a JSON object, got an array".to_string(),
            ))
        }
        Err(e) => return Err(CuratorError::Classification(e.to_string())),
    };
    let object = coerce_object(&text, 0)?;
    Ok(decision_from_object(&object))
}

fn decision_from_object(object: &Map<String, Value>) -> Decision {
    let intent = object
        .get("intent")
        .and_then(Value::as_str)
        .unwrap_or("full");
    if !intent.eq_ignore_ascii_case("specific") {
        return Decision::Full;
    }
    let targets = object
        .get("targetCategories")
        .or_else(|| object.get("target_categories"))
        .and_then(Value::as_array)
        .map(|fragments| {
            fragments
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Decision::Specific { targets }
}

const MAX_WRAPPER_DEPTH: u8 = 3;

fn coerce_object(text: &str, depth: u8) -> Result<Map<String, Value>, CuratorError> {
    if depth > MAX_WRAPPER_DEPTH {
        return Err(CuratorError::Classification(
            "payload nesting exceeds supported depth".to_string(),
        ));
    }
    let stripped = strip_code_fences(text);
    let value: Value = match serde_json::from_str(&stripped) {
        Ok(value) => value,
        Err(_) => {
            let slice = first_balanced(&stripped, '{', '}').ok_or_else(|| {
                CuratorError::Classification(
                    "no JSON object found in classifier response".to_string(),
                )
            })?;
            serde_json::from_str(slice).map_err(|e| {
                CuratorError::Classification(format!(
                    "located object is not valid JSON: {}",
                    e
                ))
            })?
        }
    };
    match value {
        Value::Object(map) => Ok(map),
        Value::String(inner) => coerce_object(&inner, depth + 1),
        other => Err(CuratorError::Classification(format!(
            "expected a JSON object, got {}",
            json_shape(&other)
        ))),
    }
}
