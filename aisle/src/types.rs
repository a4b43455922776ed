//! Core domain types for the curation pipeline.

use serde::{Deserialize, Serialize};

/// Priority assigned when the model omits the field or sends a non-number.
pub const DEFAULT_PRIORITY: i64 = 3;

/// Fixed enumeration of category types the model may propose.
///
/// Anything outside this set collapses to [`CategoryType::Other`] during
/// normalization; the wire format is `snake_case` (`planning_app`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    PlanningApp,
    Tools,
    Consumables,
    Containers,
    SeedsPlants,
    Accessories,
    Other,
}

impl CategoryType {
    /// Coerce a raw model-provided string. Unrecognized values collapse to
    /// `Other` rather than failing the record.
    pub fn from_model_str(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "planning_app" | "planning-app" | "planningapp" => Self::PlanningApp,
            "tools" => Self::Tools,
            "consumables" => Self::Consumables,
            "containers" => Self::Containers,
            "seeds_plants" | "seeds-plants" | "seedsplants" => Self::SeedsPlants,
            "accessories" => Self::Accessories,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanningApp => "planning_app",
            Self::Tools => "tools",
            Self::Consumables => "consumables",
            Self::Containers => "containers",
            Self::SeedsPlants => "seeds_plants",
            Self::Accessories => "accessories",
            Self::Other => "other",
        }
    }
}

/// A shoppable grouping of product search terms proposed by the model.
///
/// A full batch is created atomically from one model response and replaces
/// the previous batch entirely; individual categories are mutated in place
/// only by the incremental updater, which preserves `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Stable identifier; synthesized client-side when the model omits one.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ordered query strings (3-5 when the model cooperates; empty when the
    /// field was absent or malformed).
    #[serde(default)]
    pub search_terms: Vec<String>,
    /// Descending sort key only; out-of-range values are accepted as-is.
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(rename = "type", default = "default_category_type")]
    pub category_type: CategoryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Transient flag; true only while a targeted refresh of this category
    /// is in flight.
    #[serde(skip)]
    pub is_updating: bool,
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

fn default_category_type() -> CategoryType {
    CategoryType::Other
}

impl Category {
    /// Build the product-search query for this category: the caller's base
    /// query joined with each search term under OR semantics.
    pub fn search_query(&self, base_query: &str) -> String {
        let base = base_query.trim();
        let terms = self.search_terms.join(" OR ");
        if base.is_empty() {
            terms
        } else if terms.is_empty() {
            base.to_string()
        } else {
            format!("{} {}", base, terms)
        }
    }
}

/// Outcome of the intent classifier for a follow-up user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Refresh only the categories whose names match the given fragments.
    Specific { targets: Vec<String> },
    /// Regenerate the whole batch from the new message.
    Full,
}

/// Why an operation fell back instead of using the model's answer verbatim.
///
/// The user-facing contract stays "always show something"; this is the
/// telemetry-facing half of that contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradedReason {
    /// The provider call itself failed; a prompt-derived fallback batch was
    /// shown instead.
    ProviderUnavailable(String),
    /// The generation response could not be coerced into categories.
    UnparseableGeneration(String),
    /// The classifier response was unusable; a full regeneration ran instead.
    ClassificationFallback(String),
    /// No target fragment resolved to an existing category.
    NoTargetsResolved,
    /// The scoped update response was unusable; a full regeneration ran
    /// instead.
    UpdateFallback(String),
}

/// Lifecycle of the current category batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Empty,
    Generating,
    Ready,
    RefiningSpecific,
    Regenerating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_collapses_to_other() {
        assert_eq!(CategoryType::from_model_str("gadgets"), CategoryType::Other);
        assert_eq!(CategoryType::from_model_str(""), CategoryType::Other);
        assert_eq!(
            CategoryType::from_model_str(" Seeds_Plants "),
            CategoryType::SeedsPlants
        );
    }

    #[test]
    fn search_query_joins_terms_with_or() {
        let category = Category {
            id: "a".to_string(),
            name: "Pots".to_string(),
            description: String::new(),
            search_terms: vec!["ceramic pot".to_string(), "planter".to_string()],
            priority: 3,
            category_type: CategoryType::Containers,
            reason: None,
            is_updating: false,
        };
        assert_eq!(
            category.search_query("blue"),
            "blue ceramic pot OR planter"
        );
        assert_eq!(category.search_query(""), "ceramic pot OR planter");
    }

    #[test]
    fn category_wire_format_is_camel_case() {
        let json = serde_json::json!({
            "id": "x",
            "name": "Tools",
            "searchTerms": ["hammer"],
            "priority": 4,
            "type": "tools"
        });
        let category: Category = serde_json::from_value(json).unwrap();
        assert_eq!(category.search_terms, vec!["hammer"]);
        assert_eq!(category.category_type, CategoryType::Tools);
        assert!(!category.is_updating);
    }
}
