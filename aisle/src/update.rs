//! Incremental category updates.
//!
//! The "specific" refinement path: resolve the classifier's name fragments
//! to actual category ids, refresh only those categories through a scoped
//! model call, and merge the answer back by id. Categories outside the
//! target set are never mutated or marked — that isolation is the entire
//! point of this path versus a full regeneration.

use serde_json::Value;

use crate::error::CuratorError;
use crate::parse::categories_from_envelope;
use crate::types::Category;

/// Resolve target name fragments to category ids.
///
/// A category matches when any fragment is contained in its name or its name
/// is contained in the fragment, case-insensitively. Returned ids preserve
/// batch order.
pub fn resolve_targets(categories: &[Category], fragments: &[String]) -> Vec<String> {
    let fragments: Vec<String> = fragments
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();

    categories
        .iter()
        .filter(|category| {
            let name = category.name.to_lowercase();
            fragments
                .iter()
                .any(|fragment| name.contains(fragment) || fragment.contains(&name))
        })
        .map(|category| category.id.clone())
        .collect()
}

/// Parse the scoped update response into normalized records.
///
/// An empty record set is treated as a failure: the caller falls back to a
/// full regeneration rather than silently no-opping the whole request.
pub fn parse_update_response(envelope: &Value) -> Result<Vec<Category>, CuratorError> {
    let updated = categories_from_envelope(envelope)
        .map_err(|e| CuratorError::UpdateMerge(e.to_string()))?;
    if updated.is_empty() {
        return Err(CuratorError::UpdateMerge(
            "update response contained no records".to_string(),
        ));
    }
    Ok(updated)
}

/// Merge updated records into the current batch by id (shallow overwrite).
///
/// Only categories whose id is in `target_ids` are touched, even if the
/// model returned records for other ids. A targeted category without a
/// matching record just has its in-flight flag cleared — a no-op update,
/// not a failure.
pub fn merge_updates(categories: &mut [Category], updates: &[Category], target_ids: &[String]) {
    for category in categories.iter_mut() {
        if !target_ids.contains(&category.id) {
            continue;
        }
        if let Some(update) = updates.iter().find(|u| u.id == category.id) {
            category.name = update.name.clone();
            category.description = update.description.clone();
            category.search_terms = update.search_terms.clone();
            category.priority = update.priority;
            category.category_type = update.category_type;
            if update.reason.is_some() {
                category.reason = update.reason.clone();
            }
        }
        category.is_updating = false;
    }
}
