//! LLM provider abstraction and implementations.

pub mod provider;

pub use provider::{
    HostedInferenceProvider, LlmProvider, LlmProviderConfig, LlmProviderFactory,
    LlmProviderInfo, LlmProviderType, StubLlmProvider,
};
