//! Error taxonomy for the curation pipeline.
//!
//! Every variant below is caught inside the engine and converted into a
//! graceful-degradation action; none of them reach the user as an error
//! state. [`crate::types::DegradedReason`] records which fallback fired so
//! callers can still surface the degradation in telemetry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CuratorError {
    /// No plausible JSON-bearing field was found in the response envelope.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Text was located but could not be coerced into a JSON category array.
    #[error("parse failed: {0}")]
    Parse(String),

    /// The intent-decision response could not be parsed.
    #[error("classification failed: {0}")]
    Classification(String),

    /// The scoped update response was unparseable or empty.
    #[error("update merge failed: {0}")]
    UpdateMerge(String),

    /// Transport-level failure talking to the hosted model.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered, but not in a usable way (bad status, missing
    /// content, unexpected response shape).
    #[error("provider error: {0}")]
    Provider(String),

    /// Configuration problem: missing API key, unreadable file, bad TOML.
    #[error("configuration error: {0}")]
    Config(String),
}
