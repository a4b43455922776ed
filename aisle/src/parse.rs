//! Category parsing and normalization.
//!
//! Turns the text half of an [`Extracted`] payload into typed [`Category`]
//! records. The text may be fenced in markdown code blocks, JSON-encoded
//! twice, wrapped in an object instead of a bare array, or surrounded by
//! prose; every one of those shapes has been observed in the wild from the
//! same endpoint.

use chrono::Utc;
use serde_json::Value;

use crate::envelope::{json_shape, Extracted};
use crate::error::CuratorError;
use crate::types::{Category, CategoryType, DEFAULT_PRIORITY};

/// How many wrapper hops (string re-encode, object nesting) to tolerate
/// before giving up on a payload.
const MAX_WRAPPER_DEPTH: u8 = 3;

/// Convert an extracted payload into a normalized category batch.
///
/// Array payloads are normalized directly; text payloads run the full
/// coercion chain (fence stripping, balanced-array search, double-encoding,
/// object unwrapping) first. Fails with [`CuratorError::Parse`] when the
/// final value is not an array.
pub fn parse_categories(extracted: Extracted) -> Result<Vec<Category>, CuratorError> {
    let items = match extracted {
        Extracted::Items(items) => items,
        Extracted::Text(text) => coerce_text(&text, 0)?,
    };
    Ok(normalize_items(&items))
}

/// Convenience: classify an envelope and parse it in one step.
pub fn categories_from_envelope(envelope: &Value) -> Result<Vec<Category>, CuratorError> {
    let extracted = crate::envelope::extract_payload(envelope)?;
    parse_categories(extracted)
}

fn coerce_text(text: &str, depth: u8) -> Result<Vec<Value>, CuratorError> {
    let stripped = strip_code_fences(text);
    match serde_json::from_str::<Value>(&stripped) {
        Ok(value) => coerce_value(value, depth),
        Err(_) => {
            let slice = first_balanced(&stripped, '[', ']').ok_or_else(|| {
                CuratorError::Parse("no JSON array found in response text".to_string())
            })?;
            let value: Value = serde_json::from_str(slice).map_err(|e| {
                CuratorError::Parse(format!("located array is not valid JSON: {}", e))
            })?;
            coerce_value(value, depth)
        }
    }
}

fn coerce_value(value: Value, depth: u8) -> Result<Vec<Value>, CuratorError> {
    if depth > MAX_WRAPPER_DEPTH {
        return Err(CuratorError::Parse(
            "payload nesting exceeds supported depth".to_string(),
        ));
    }
    match value {
        Value::Array(items) => Ok(items),
        // Doubly-encoded payload: the parsed value is itself JSON text.
        Value::String(inner) => coerce_text(&inner, depth + 1),
        Value::Object(_) => {
            let inner = value
                .get("output")
                .cloned()
                .or_else(|| value.pointer("/data/output").cloned())
                .or_else(|| value.get("result").cloned())
                .or_else(|| value.get("content").cloned())
                .or_else(|| value.get("text").cloned())
                .ok_or_else(|| {
                    CuratorError::Parse(
                        "object wrapper carries no category payload".to_string(),
                    )
                })?;
            coerce_value(inner, depth + 1)
        }
        other => Err(CuratorError::Parse(format!(
            "expected a JSON array, got {}",
            json_shape(&other)
        ))),
    }
}

/// Strip a surrounding markdown code fence (```lang ... ```), returning the
/// fenced body. Text without a well-formed fence passes through trimmed.
pub(crate) fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(open) = trimmed.find("```") {
        let after = &trimmed[open + 3..];
        if let Some(newline) = after.find('\n') {
            let lang = &after[..newline];
            let lang_ok = lang
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace());
            if lang_ok {
                let body = &after[newline + 1..];
                if let Some(close) = body.find("```") {
                    return body[..close].trim().to_string();
                }
            }
        }
    }
    trimmed.to_string()
}

/// Find the first balanced `open ... close` region, skipping delimiters that
/// appear inside JSON string literals.
pub(crate) fn first_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + idx + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Map raw array elements through the field-coercion rules, synthesizing an
/// id (`timestamp-index`) when the model omits one.
pub(crate) fn normalize_items(items: &[Value]) -> Vec<Category> {
    let batch_stamp = Utc::now().timestamp_millis();
    items
        .iter()
        .enumerate()
        .map(|(index, item)| normalize_item(item, batch_stamp, index))
        .collect()
}

fn normalize_item(item: &Value, batch_stamp: i64, index: usize) -> Category {
    let id = id_field(item).unwrap_or_else(|| format!("{}-{}", batch_stamp, index));
    let name = string_field(item, &["name", "title"])
        .unwrap_or_else(|| "Untitled category".to_string());
    let description = string_field(item, &["description"]).unwrap_or_default();
    let search_terms = item
        .get("searchTerms")
        .or_else(|| item.get("search_terms"))
        .and_then(Value::as_array)
        .map(|terms| {
            terms
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let priority = item
        .get("priority")
        .and_then(|p| p.as_i64().or_else(|| p.as_f64().map(|f| f as i64)))
        .unwrap_or(DEFAULT_PRIORITY);
    let category_type = string_field(item, &["type", "category_type"])
        .map(|raw| CategoryType::from_model_str(&raw))
        .unwrap_or(CategoryType::Other);
    let reason = string_field(item, &["reason"]);

    Category {
        id,
        name,
        description,
        search_terms,
        priority,
        category_type,
        reason,
        is_updating: false,
    }
}

fn string_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn id_field(item: &Value) -> Option<String> {
    match item.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        // Some models send numeric ids; stringify rather than discard.
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Fixed fallback batch derived from the user's prompt, used whenever the
/// model's answer cannot be coerced into categories. Always non-empty, and
/// every entry carries enough search terms to be rendered downstream.
pub fn fallback_batch(prompt: &str) -> Vec<Category> {
    let words: Vec<&str> = prompt.split_whitespace().take(4).collect();
    let snippet = if words.is_empty() {
        "your search".to_string()
    } else {
        words.join(" ")
    };
    let stamp = Utc::now().timestamp_millis();

    vec![
        Category {
            id: format!("{}-fallback-0", stamp),
            name: format!("Top picks for {}", snippet),
            description: format!("Popular items matching \"{}\"", snippet),
            search_terms: vec![
                snippet.clone(),
                format!("{} best", snippet),
                format!("{} popular", snippet),
            ],
            priority: 5,
            category_type: CategoryType::Other,
            reason: None,
            is_updating: false,
        },
        Category {
            id: format!("{}-fallback-1", stamp),
            name: "Essentials".to_string(),
            description: format!("Everyday essentials for {}", snippet),
            search_terms: vec![
                format!("{} essentials", snippet),
                format!("{} starter", snippet),
                format!("{} kit", snippet),
            ],
            priority: 4,
            category_type: CategoryType::Other,
            reason: None,
            is_updating: false,
        },
        Category {
            id: format!("{}-fallback-2", stamp),
            name: "Accessories".to_string(),
            description: format!("Accessories that go with {}", snippet),
            search_terms: vec![
                format!("{} accessories", snippet),
                format!("{} add-ons", snippet),
                format!("{} extras", snippet),
            ],
            priority: 2,
            category_type: CategoryType::Accessories,
            reason: None,
            is_updating: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(s: &str) -> Extracted {
        Extracted::Text(s.to_string())
    }

    const CLEAN_ARRAY: &str = r#"[
        {"name": "Garden Tools", "description": "Dig and prune", "searchTerms": ["trowel", "pruner", "spade"], "priority": 5, "type": "tools"},
        {"name": "Pots", "searchTerms": ["ceramic pot", "planter", "terracotta"], "priority": 4, "type": "containers"},
        {"title": "Mystery"}
    ]"#;

    #[test]
    fn clean_array_preserves_length_and_defaults() {
        let categories = parse_categories(text(CLEAN_ARRAY)).unwrap();
        assert_eq!(categories.len(), 3);
        for category in &categories {
            assert!(!category.id.is_empty());
            assert!(!category.name.is_empty());
        }
        assert_eq!(categories[0].category_type, CategoryType::Tools);
        assert_eq!(categories[1].category_type, CategoryType::Containers);
        // Third record: title coerced to name, everything else defaulted.
        assert_eq!(categories[2].name, "Mystery");
        assert_eq!(categories[2].priority, DEFAULT_PRIORITY);
        assert_eq!(categories[2].category_type, CategoryType::Other);
        assert!(categories[2].search_terms.is_empty());
    }

    #[test]
    fn fenced_response_equals_unfenced() {
        let fenced = format!("```json\n{}\n```", CLEAN_ARRAY);
        let plain = parse_categories(text(CLEAN_ARRAY)).unwrap();
        let stripped = parse_categories(text(&fenced)).unwrap();
        assert_eq!(names(&plain), names(&stripped));
        assert_eq!(terms(&plain), terms(&stripped));
    }

    #[test]
    fn double_encoded_equals_single_encoded() {
        let double = serde_json::to_string(CLEAN_ARRAY).unwrap();
        let single = parse_categories(text(CLEAN_ARRAY)).unwrap();
        let decoded = parse_categories(text(&double)).unwrap();
        assert_eq!(names(&single), names(&decoded));
        assert_eq!(terms(&single), terms(&decoded));
    }

    #[test]
    fn object_wrapped_array_unwraps() {
        let wrapped = format!(r#"{{"output": {}}}"#, CLEAN_ARRAY);
        let categories = parse_categories(text(&wrapped)).unwrap();
        assert_eq!(categories.len(), 3);

        let nested = format!(r#"{{"data": {{"output": {}}}}}"#, CLEAN_ARRAY);
        let categories = parse_categories(text(&nested)).unwrap();
        assert_eq!(categories.len(), 3);
    }

    #[test]
    fn prose_around_array_is_tolerated() {
        let prose = format!("Here are your categories:\n{}\nEnjoy!", CLEAN_ARRAY);
        let categories = parse_categories(text(&prose)).unwrap();
        assert_eq!(categories.len(), 3);
    }

    #[test]
    fn brackets_inside_strings_do_not_confuse_the_scan() {
        let tricky = r#"note [draft] follows: [{"name": "A [b] c", "searchTerms": ["x]y"]}]"#;
        // The first '[' opens "[draft]", which balances immediately and is
        // not valid JSON; the parse must fail rather than mis-slice.
        let err = parse_categories(text(tricky)).unwrap_err();
        assert!(matches!(err, CuratorError::Parse(_)));

        let clean = r#"answer: [{"name": "A [b] c", "searchTerms": ["x]y"]}]"#;
        let categories = parse_categories(text(clean)).unwrap();
        assert_eq!(categories[0].name, "A [b] c");
        assert_eq!(categories[0].search_terms, vec!["x]y"]);
    }

    #[test]
    fn non_array_payload_is_a_parse_error() {
        let err = parse_categories(text(r#"{"status": "ok"}"#)).unwrap_err();
        assert!(matches!(err, CuratorError::Parse(_)));

        let err = parse_categories(text("42")).unwrap_err();
        assert!(matches!(err, CuratorError::Parse(_)));
    }

    #[test]
    fn plain_prose_is_a_parse_error() {
        let err = parse_categories(text("I could not find anything useful.")).unwrap_err();
        assert!(matches!(err, CuratorError::Parse(_)));
    }

    #[test]
    fn provided_ids_are_kept_numeric_ids_stringified() {
        let items = vec![
            json!({"id": "keep-me", "name": "A"}),
            json!({"id": 7, "name": "B"}),
            json!({"name": "C"}),
        ];
        let categories = normalize_items(&items);
        assert_eq!(categories[0].id, "keep-me");
        assert_eq!(categories[1].id, "7");
        assert!(categories[2].id.contains('-'));
    }

    #[test]
    fn malformed_search_terms_default_to_empty() {
        let items = vec![json!({"name": "A", "searchTerms": "not an array"})];
        let categories = normalize_items(&items);
        assert!(categories[0].search_terms.is_empty());
    }

    #[test]
    fn non_numeric_priority_defaults() {
        let items = vec![
            json!({"name": "A", "priority": "high"}),
            json!({"name": "B", "priority": 2.6}),
        ];
        let categories = normalize_items(&items);
        assert_eq!(categories[0].priority, DEFAULT_PRIORITY);
        assert_eq!(categories[1].priority, 2);
    }

    #[test]
    fn fallback_batch_is_never_empty() {
        let batch = fallback_batch("blue ceramic plant pots for the balcony");
        assert!(!batch.is_empty());
        for category in &batch {
            assert!(category.search_terms.len() >= 3);
        }
        assert!(batch[0].name.contains("blue ceramic plant pots"));

        let batch = fallback_batch("");
        assert!(!batch.is_empty());
    }

    fn names(categories: &[Category]) -> Vec<&str> {
        categories.iter().map(|c| c.name.as_str()).collect()
    }

    fn terms(categories: &[Category]) -> Vec<&[String]> {
        categories.iter().map(|c| c.search_terms.as_slice()).collect()
    }
}
