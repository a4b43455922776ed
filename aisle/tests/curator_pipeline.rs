//! End-to-end pipeline tests against a scripted stub provider.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use aisle::{
    BatchState, Category, CategoryType, CurationOutcome, Curator, DegradedReason,
    StubLlmProvider,
};

fn scripted(responses: Vec<Value>) -> Curator {
    Curator::new(Box::new(StubLlmProvider::with_script(responses)))
}

/// A generation response with explicit ids, missing the `containers` and
/// `planning_app` required types.
fn pots_generation() -> Value {
    Value::String(
        r#"[
            {"id": "a", "name": "Garden Tools", "description": "Hand tools for potting", "searchTerms": ["trowel", "hand rake", "pruning shears"], "priority": 5, "type": "tools"},
            {"id": "b", "name": "Potting Soil", "description": "Soil and fertilizer", "searchTerms": ["potting mix", "fertilizer", "perlite"], "priority": 4, "type": "consumables"}
        ]"#
        .to_string(),
    )
}

fn shape_of(batch: &[Category]) -> Vec<(String, Vec<String>, i64, CategoryType)> {
    batch
        .iter()
        .map(|c| {
            (
                c.name.clone(),
                c.search_terms.clone(),
                c.priority,
                c.category_type,
            )
        })
        .collect()
}

#[tokio::test]
async fn generation_fills_missing_required_types_after_model_categories() {
    let mut curator = scripted(vec![pots_generation()]);
    let CurationOutcome {
        categories,
        degraded,
    } = curator.generate("blue ceramic plant pots").await;

    assert!(degraded.is_none());
    assert_eq!(curator.state(), BatchState::Ready);

    // Model categories first, in descending priority.
    assert_eq!(categories[0].id, "a");
    assert_eq!(categories[1].id, "b");

    // Fillers for the absent required types come after, despite their low
    // priority never winning a sort.
    let filler_types: Vec<CategoryType> =
        categories[2..].iter().map(|c| c.category_type).collect();
    assert!(filler_types.contains(&CategoryType::PlanningApp));
    assert!(filler_types.contains(&CategoryType::Containers));
    for filler in &categories[2..] {
        assert!(!filler.search_terms.is_empty());
    }
}

#[tokio::test]
async fn identical_responses_yield_identical_batches_modulo_ids() {
    let mut first = scripted(vec![pots_generation()]);
    let mut second = scripted(vec![pots_generation()]);

    let a = first.generate("blue ceramic plant pots").await;
    let b = second.generate("blue ceramic plant pots").await;

    // Ids carry a timestamp component; everything else must match.
    assert_eq!(shape_of(&a.categories), shape_of(&b.categories));
}

#[tokio::test]
async fn prose_response_degrades_to_fallback_batch() {
    let mut curator = scripted(vec![Value::String(
        "Unfortunately I can only answer in prose today.".to_string(),
    )]);
    let outcome = curator.generate("blue ceramic plant pots").await;

    assert!(matches!(
        outcome.degraded,
        Some(DegradedReason::UnparseableGeneration(_))
    ));
    assert!(!outcome.categories.is_empty());
    assert_eq!(curator.state(), BatchState::Ready);
    // Fallback categories must be shoppable too.
    for category in &outcome.categories {
        assert!(!category.search_terms.is_empty());
    }
}

#[tokio::test]
async fn specific_refinement_updates_only_targeted_categories() {
    let mut curator = scripted(vec![
        pots_generation(),
        Value::String(r#"{"intent": "specific", "targetCategories": ["tools"]}"#.to_string()),
        Value::String(
            r#"[{"id": "a", "name": "Left-handed Garden Tools", "searchTerms": ["left-handed trowel", "lefty shears", "ambidextrous rake"], "priority": 5, "type": "tools"}]"#
                .to_string(),
        ),
    ]);

    curator.generate("blue ceramic plant pots").await;
    let before_b = curator
        .categories()
        .iter()
        .find(|c| c.id == "b")
        .cloned()
        .unwrap();

    let outcome = curator.refine("make the tools left-handed").await;

    assert!(outcome.degraded.is_none());
    assert_eq!(curator.state(), BatchState::Ready);

    let a = outcome.categories.iter().find(|c| c.id == "a").unwrap();
    assert_eq!(a.name, "Left-handed Garden Tools");
    assert_eq!(a.search_terms[0], "left-handed trowel");
    assert!(!a.is_updating);

    // The untargeted category is byte-for-byte untouched.
    let b = outcome.categories.iter().find(|c| c.id == "b").unwrap();
    assert_eq!(*b, before_b);

    assert_eq!(curator.metrics().summary().specific_updates, 1);
}

#[tokio::test]
async fn classification_failure_regenerates_with_fallback_reason() {
    let mut curator = scripted(vec![
        pots_generation(),
        Value::String("no braces here".to_string()),
        pots_generation(),
    ]);

    curator.generate("blue ceramic plant pots").await;
    let outcome = curator.refine("actually let's do succulents").await;

    assert!(matches!(
        outcome.degraded,
        Some(DegradedReason::ClassificationFallback(_))
    ));
    assert!(!outcome.categories.is_empty());
    assert_eq!(curator.state(), BatchState::Ready);
    assert_eq!(curator.metrics().summary().classification_fallbacks, 1);
}

#[tokio::test]
async fn empty_update_response_regenerates_with_fallback_reason() {
    let mut curator = scripted(vec![
        pots_generation(),
        Value::String(r#"{"intent": "specific", "targetCategories": ["tools"]}"#.to_string()),
        Value::String("[]".to_string()),
        pots_generation(),
    ]);

    curator.generate("blue ceramic plant pots").await;
    let outcome = curator.refine("fancier tools please").await;

    assert!(matches!(
        outcome.degraded,
        Some(DegradedReason::UpdateFallback(_))
    ));
    assert_eq!(curator.state(), BatchState::Ready);
    // No category is left marked in-flight after the fallback.
    assert!(outcome.categories.iter().all(|c| !c.is_updating));
    assert_eq!(curator.metrics().summary().update_fallbacks, 1);
}

#[tokio::test]
async fn unresolved_targets_regenerate_instead_of_no_op() {
    let mut curator = scripted(vec![
        pots_generation(),
        Value::String(
            r#"{"intent": "specific", "targetCategories": ["fish tanks"]}"#.to_string(),
        ),
        pots_generation(),
    ]);

    curator.generate("blue ceramic plant pots").await;
    let outcome = curator.refine("something about fish tanks").await;

    assert!(matches!(
        outcome.degraded,
        Some(DegradedReason::NoTargetsResolved)
    ));
    assert!(!outcome.categories.is_empty());
    assert_eq!(curator.state(), BatchState::Ready);
}

#[tokio::test]
async fn wrapped_envelope_shapes_parse_end_to_end() {
    // Hosted endpoints wrap the payload; the pipeline unwraps before parsing.
    let wrapped = json!({
        "data": {
            "output": "```json\n[{\"name\": \"Planters\", \"searchTerms\": [\"ceramic planter\", \"pot with drainage\", \"indoor planter\"], \"priority\": 5, \"type\": \"containers\"}]\n```"
        }
    });
    let mut curator = scripted(vec![wrapped]);

    let outcome = curator.generate("blue ceramic plant pots").await;
    assert!(outcome.degraded.is_none());
    assert_eq!(outcome.categories[0].name, "Planters");
    assert_eq!(outcome.categories[0].category_type, CategoryType::Containers);
}
