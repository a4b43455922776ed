//! Curation engine.
//!
//! Owns the current category batch and drives the three model calls
//! (generation, classification, scoped update) around it. The engine's one
//! hard guarantee is that every operation leaves a usable batch behind:
//! any model failure degrades to a fallback path and is reported through
//! [`CurationOutcome::degraded`], never as an error to the caller.

use uuid::Uuid;

use crate::classify::parse_decision;
use crate::config::AisleConfig;
use crate::diversity::enforce_diversity;
use crate::envelope::extract_payload;
use crate::error::CuratorError;
use crate::llm::{LlmProvider, LlmProviderFactory, LlmProviderInfo};
use crate::metrics::DegradeMetrics;
use crate::parse::{fallback_batch, parse_categories};
use crate::prompts;
use crate::types::{BatchState, Category, Decision, DegradedReason};
use crate::update::{merge_updates, parse_update_response, resolve_targets};

/// Result of one curation operation.
#[derive(Debug, Clone)]
pub struct CurationOutcome {
    /// The batch now on display.
    pub categories: Vec<Category>,
    /// Set when a fallback path produced this batch instead of the model's
    /// verbatim answer.
    pub degraded: Option<DegradedReason>,
}

pub struct Curator {
    provider: Box<dyn LlmProvider>,
    categories: Vec<Category>,
    state: BatchState,
    /// The prompt that produced the current batch; scoped updates keep it,
    /// full regenerations replace it.
    base_prompt: String,
    metrics: DegradeMetrics,
}

impl Curator {
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self {
            provider,
            categories: Vec::new(),
            state: BatchState::Empty,
            base_prompt: String::new(),
            metrics: DegradeMetrics::new(),
        }
    }

    pub fn from_config(config: &AisleConfig) -> Result<Self, CuratorError> {
        let provider = LlmProviderFactory::create_provider(config.to_provider_config()?)?;
        Ok(Self::new(provider))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn metrics(&self) -> &DegradeMetrics {
        &self.metrics
    }

    pub fn provider_info(&self) -> LlmProviderInfo {
        self.provider.get_info()
    }

    /// Discard the current batch.
    pub fn reset(&mut self) {
        self.categories.clear();
        self.base_prompt.clear();
        self.state = BatchState::Empty;
    }

    /// Generate a fresh batch from a shopping goal, replacing any current
    /// batch atomically.
    pub async fn generate(&mut self, prompt: &str) -> CurationOutcome {
        self.state = if self.categories.is_empty() {
            BatchState::Generating
        } else {
            BatchState::Regenerating
        };
        self.run_full_generation(prompt).await
    }

    /// Handle a follow-up message against the current batch.
    ///
    /// Classifies the message as a scoped refinement or a goal change. The
    /// classifier is advisory: if it fails, or a scoped update later fails,
    /// the message is treated as a new goal and a full generation runs.
    pub async fn refine(&mut self, message: &str) -> CurationOutcome {
        if self.categories.is_empty() {
            return self.generate(message).await;
        }

        let names: Vec<String> = self.categories.iter().map(|c| c.name.clone()).collect();
        let prompt = prompts::build_classification_prompt(&names, message);
        let decision = match self.provider.infer(&prompt).await {
            Ok(envelope) => parse_decision(&envelope),
            Err(e) => Err(e),
        };

        match decision {
            Ok(Decision::Specific { targets }) => self.refine_specific(&targets, message).await,
            Ok(Decision::Full) => {
                self.state = BatchState::Regenerating;
                self.run_full_generation(message).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "classification failed, regenerating batch");
                self.metrics.record_classification_fallback();
                self.state = BatchState::Regenerating;
                let mut outcome = self.run_full_generation(message).await;
                outcome
                    .degraded
                    .get_or_insert(DegradedReason::ClassificationFallback(e.to_string()));
                outcome
            }
        }
    }

    async fn refine_specific(&mut self, targets: &[String], message: &str) -> CurationOutcome {
        let target_ids = resolve_targets(&self.categories, targets);
        if target_ids.is_empty() {
            tracing::debug!(
                fragments = ?targets,
                "no target fragments resolved, regenerating batch"
            );
            self.metrics.record_update_fallback();
            self.state = BatchState::Regenerating;
            let mut outcome = self.run_full_generation(message).await;
            outcome.degraded.get_or_insert(DegradedReason::NoTargetsResolved);
            return outcome;
        }

        self.state = BatchState::RefiningSpecific;
        for category in &mut self.categories {
            if target_ids.contains(&category.id) {
                category.is_updating = true;
            }
        }

        let matched: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| target_ids.contains(&c.id))
            .cloned()
            .collect();
        let prompt = prompts::build_update_prompt(&matched, message);

        let updates = match self.provider.infer(&prompt).await {
            Ok(envelope) => parse_update_response(&envelope),
            Err(e) => Err(e),
        };

        match updates {
            Ok(updates) => {
                merge_updates(&mut self.categories, &updates, &target_ids);
                self.metrics.record_specific_update();
                self.state = BatchState::Ready;
                tracing::info!(
                    targets = target_ids.len(),
                    records = updates.len(),
                    "scoped update merged"
                );
                CurationOutcome {
                    categories: self.categories.clone(),
                    degraded: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "scoped update failed, regenerating batch");
                for category in &mut self.categories {
                    category.is_updating = false;
                }
                self.metrics.record_update_fallback();
                self.state = BatchState::Regenerating;
                let mut outcome = self.run_full_generation(message).await;
                outcome
                    .degraded
                    .get_or_insert(DegradedReason::UpdateFallback(e.to_string()));
                outcome
            }
        }
    }

    async fn run_full_generation(&mut self, prompt: &str) -> CurationOutcome {
        let batch_id = Uuid::new_v4();
        self.metrics.record_full_generation();

        let generation_prompt = prompts::build_generation_prompt(prompt);
        let parsed = match self.provider.infer(&generation_prompt).await {
            Ok(envelope) => extract_payload(&envelope)
                .and_then(parse_categories)
                .map_err(|e| (DegradedReason::UnparseableGeneration(e.to_string()), e)),
            Err(e) => Err((DegradedReason::ProviderUnavailable(e.to_string()), e)),
        };

        let (batch, degraded) = match parsed {
            Ok(categories) => {
                tracing::info!(
                    %batch_id,
                    count = categories.len(),
                    "generated category batch"
                );
                (categories, None)
            }
            Err((reason, e)) => {
                tracing::warn!(%batch_id, error = %e, "generation degraded to fallback batch");
                self.metrics.record_generation_fallback();
                (fallback_batch(prompt), Some(reason))
            }
        };

        self.categories = finish_batch(batch);
        self.base_prompt = prompt.to_string();
        self.state = BatchState::Ready;
        CurationOutcome {
            categories: self.categories.clone(),
            degraded,
        }
    }
}

/// Final shaping applied to every new batch, fallback included: stable sort
/// by descending priority, then diversity fillers appended at the end. The
/// order matters; fillers stay after the model's categories regardless of
/// priority.
fn finish_batch(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| b.priority.cmp(&a.priority));
    enforce_diversity(categories)
}
