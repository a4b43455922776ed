//! Degrade-action counters.
//!
//! The pipeline never retries a failed model call; it degrades. These
//! counters record which degrade paths fired so operators can tell "the
//! model gave an unhelpful answer" apart from genuine upstream trouble,
//! which the user-facing behavior deliberately hides.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct DegradeMetrics {
    /// Full generations, whether user-initiated or fallback-driven.
    full_generations: AtomicU64,
    /// Scoped updates that merged successfully.
    specific_updates: AtomicU64,
    /// Generations that fell back to the prompt-derived batch.
    generation_fallbacks: AtomicU64,
    /// Classifier failures that degraded to a full regeneration.
    classification_fallbacks: AtomicU64,
    /// Scoped updates that degraded to a full regeneration.
    update_fallbacks: AtomicU64,
}

impl DegradeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_full_generation(&self) {
        self.full_generations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_specific_update(&self) {
        self.specific_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_fallback(&self) {
        self.generation_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classification_fallback(&self) {
        self.classification_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update_fallback(&self) {
        self.update_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot for reporting.
    pub fn summary(&self) -> DegradeMetricsSummary {
        DegradeMetricsSummary {
            full_generations: self.full_generations.load(Ordering::Relaxed),
            specific_updates: self.specific_updates.load(Ordering::Relaxed),
            generation_fallbacks: self.generation_fallbacks.load(Ordering::Relaxed),
            classification_fallbacks: self.classification_fallbacks.load(Ordering::Relaxed),
            update_fallbacks: self.update_fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradeMetricsSummary {
    pub full_generations: u64,
    pub specific_updates: u64,
    pub generation_fallbacks: u64,
    pub classification_fallbacks: u64,
    pub update_fallbacks: u64,
}

impl DegradeMetricsSummary {
    /// Share of operations that took any degrade path.
    pub fn degrade_rate(&self) -> f64 {
        let total = self.full_generations + self.specific_updates;
        if total == 0 {
            return 0.0;
        }
        let degraded =
            self.generation_fallbacks + self.classification_fallbacks + self.update_fallbacks;
        degraded as f64 / total as f64
    }
}
