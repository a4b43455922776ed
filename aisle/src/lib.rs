//! LLM-driven shoppable category curation.
//!
//! `aisle` turns a free-text shopping goal into a batch of typed, shoppable
//! categories through a hosted language model, then keeps that batch
//! current across follow-up messages: an intent classifier routes each
//! message to either a scoped per-category update or a full regeneration.
//!
//! Model output is treated as hostile input. Responses arrive as untyped
//! JSON envelopes in half a dozen shapes (bare arrays, wrapped objects,
//! fenced markdown, double-encoded strings) and are coerced through a
//! defensive extraction and normalization pipeline. When nothing usable
//! comes back the engine degrades to a deterministic prompt-derived batch
//! rather than surfacing an error; the [`types::DegradedReason`] attached
//! to each outcome is the only trace.

pub mod classify;
pub mod config;
pub mod curator;
pub mod diversity;
pub mod envelope;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod parse;
pub mod prompts;
pub mod types;
pub mod update;

pub use config::{AisleConfig, LlmConfig};
pub use curator::{CurationOutcome, Curator};
pub use error::CuratorError;
pub use llm::{
    LlmProvider, LlmProviderConfig, LlmProviderFactory, LlmProviderInfo, LlmProviderType,
    StubLlmProvider,
};
pub use metrics::{DegradeMetrics, DegradeMetricsSummary};
pub use types::{BatchState, Category, CategoryType, Decision, DegradedReason};
