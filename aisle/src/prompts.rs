//! Prompt builders for the three model calls.
//!
//! Each prompt opens with a distinct marker header so the stub provider can
//! route deterministic responses without inspecting free text.

use crate::types::Category;

/// Marker for a full category-batch generation call.
pub(crate) const GENERATION_MARKER: &str = "CATEGORY_GENERATION";
/// Marker for the follow-up intent-classification call.
pub(crate) const CLASSIFICATION_MARKER: &str = "INTENT_CLASSIFICATION";
/// Marker for a scoped category-update call.
pub(crate) const UPDATE_MARKER: &str = "CATEGORY_UPDATE";

const TYPE_ENUMERATION: &str =
    "planning_app, tools, consumables, containers, seeds_plants, accessories, other";

/// Prompt for generating a fresh category batch from a shopping goal.
pub fn build_generation_prompt(user_prompt: &str) -> String {
    let mut s = String::new();
    s.push_str(GENERATION_MARKER);
    s.push_str("\nYou are a shopping assistant that breaks a goal into shoppable categories.\n\n");
    s.push_str("Respond with ONLY a JSON array, no prose, no markdown fences. Each element:\n");
    s.push_str("{\n");
    s.push_str("  \"name\": \"display label\",\n");
    s.push_str("  \"description\": \"one short sentence\",\n");
    s.push_str("  \"searchTerms\": [\"3 to 5 product search queries\"],\n");
    s.push_str("  \"priority\": 1-5,\n");
    s.push_str(&format!("  \"type\": one of [{}],\n", TYPE_ENUMERATION));
    s.push_str("  \"reason\": \"why this category helps (optional)\"\n");
    s.push_str("}\n\n");
    s.push_str("Propose 4 to 8 categories covering different types.\n\n");
    s.push_str("Shopping goal: \"");
    s.push_str(user_prompt);
    s.push_str("\"");
    s
}

/// Prompt asking the model whether a follow-up message targets specific
/// existing categories or calls for a full regeneration.
pub fn build_classification_prompt(category_names: &[String], message: &str) -> String {
    let names_json =
        serde_json::to_string(category_names).unwrap_or_else(|_| "[]".to_string());
    let mut s = String::new();
    s.push_str(CLASSIFICATION_MARKER);
    s.push_str("\nThe user already sees these shopping categories:\n");
    s.push_str(&names_json);
    s.push_str("\n\nNew message: \"");
    s.push_str(message);
    s.push_str("\"\n\n");
    s.push_str("Does the message refine specific categories above, or does it change the ");
    s.push_str("shopping goal enough to regenerate everything?\n");
    s.push_str("Respond with ONLY one JSON object, no prose:\n");
    s.push_str("{\"intent\": \"specific\", \"targetCategories\": [\"matching names or fragments\"]}\n");
    s.push_str("or\n");
    s.push_str("{\"intent\": \"full\", \"targetCategories\": []}");
    s
}

/// Prompt for refreshing only the matched categories' search terms.
///
/// Carries the matched categories' current `id`/`name`/`searchTerms` so the
/// model can return updated records under the same ids.
pub fn build_update_prompt(targets: &[Category], message: &str) -> String {
    let targets_json: Vec<serde_json::Value> = targets
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "name": c.name,
                "searchTerms": c.search_terms,
            })
        })
        .collect();
    let targets_json =
        serde_json::to_string_pretty(&targets_json).unwrap_or_else(|_| "[]".to_string());

    let mut s = String::new();
    s.push_str(UPDATE_MARKER);
    s.push_str("\nUpdate ONLY these shopping categories to reflect the user's new message.\n\n");
    s.push_str("Current categories:\n");
    s.push_str(&targets_json);
    s.push_str("\n\nUser message: \"");
    s.push_str(message);
    s.push_str("\"\n\n");
    s.push_str("Respond with ONLY a JSON array of the updated records. Keep each \"id\" ");
    s.push_str("exactly as given; update \"name\", \"searchTerms\" (3 to 5 queries), and ");
    s.push_str("optionally \"description\" and \"priority\". Do not invent new categories.");
    s
}
