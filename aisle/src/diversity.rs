//! Diversity enforcement over a category batch.
//!
//! A batch is required to cover a minimum set of category types; when the
//! model omits one entirely, a synthesized low-priority category from a
//! per-type template is appended. Enforcement is unconditional and does not
//! consult whether the user's intent implies physical-goods shopping at all;
//! that over-inclusion is an accepted product trade-off.

use std::collections::HashSet;

use chrono::Utc;

use crate::types::{Category, CategoryType};

/// Types every batch must cover.
pub const REQUIRED_TYPES: [CategoryType; 4] = [
    CategoryType::PlanningApp,
    CategoryType::Tools,
    CategoryType::Consumables,
    CategoryType::Containers,
];

/// Priority assigned to synthesized filler categories. Fillers are appended
/// after the model's categories and never re-sorted, so this value only
/// matters if a later pass re-orders the batch.
const FILLER_PRIORITY: i64 = 1;

/// Append one synthesized category for each required type that is entirely
/// absent. Input categories are never reordered or modified.
pub fn enforce_diversity(mut categories: Vec<Category>) -> Vec<Category> {
    let present: HashSet<CategoryType> =
        categories.iter().map(|c| c.category_type).collect();
    let stamp = Utc::now().timestamp_millis();

    for required in REQUIRED_TYPES {
        if !present.contains(&required) {
            tracing::debug!(category_type = required.as_str(), "synthesizing filler category");
            categories.push(filler_category(required, stamp));
        }
    }
    categories
}

fn filler_category(category_type: CategoryType, stamp: i64) -> Category {
    let (name, description, terms) = template_for(category_type);
    Category {
        id: format!("synth-{}-{}", category_type.as_str(), stamp),
        name: name.to_string(),
        description: description.to_string(),
        search_terms: terms.iter().map(|t| t.to_string()).collect(),
        priority: FILLER_PRIORITY,
        category_type,
        reason: None,
        is_updating: false,
    }
}

fn template_for(category_type: CategoryType) -> (&'static str, &'static str, [&'static str; 3]) {
    match category_type {
        CategoryType::PlanningApp => (
            "Planning & layout apps",
            "Plan the project before you buy",
            ["planner app", "layout planning tool", "project planner"],
        ),
        CategoryType::Tools => (
            "Essential tools",
            "Core tools to get the job done",
            ["hand tools set", "essential tools", "starter tool kit"],
        ),
        CategoryType::Consumables => (
            "Consumables & supplies",
            "Supplies you will use up and restock",
            ["refill supplies", "consumable supplies", "starter supplies"],
        ),
        CategoryType::Containers => (
            "Containers & storage",
            "Pots, bins, and storage to keep things organized",
            ["storage containers", "pots and containers", "organizer bins"],
        ),
        CategoryType::SeedsPlants => (
            "Seeds & plants",
            "Live plants and seeds to get growing",
            ["seed packets", "live plants", "seedlings"],
        ),
        CategoryType::Accessories => (
            "Accessories",
            "Add-ons that round out the setup",
            ["accessories", "add-ons", "extras"],
        ),
        CategoryType::Other => (
            "More to explore",
            "Related items worth a look",
            ["related items", "popular picks", "top rated"],
        ),
    }
}
