//! Error taxonomy for the outreach pipeline.
//!
//! Malformed model output deliberately has no variant here: every decode of
//! generated text degrades to a fallback value at its call site (see the
//! `decode` module), so formatting drift from the model never aborts a run.
//! Only transport/credential failures and entry preconditions are errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OutreachError>;

/// Main error type for the outreach engine
#[derive(Error, Debug)]
pub enum OutreachError {
    /// Missing or invalid credential / environment configuration. Fatal,
    /// surfaced immediately, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-2xx response from the generation service. Status and body are
    /// carried for diagnostics; the caller decides whether to retry the
    /// whole pipeline invocation.
    #[error("generation service error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Network-level failure reaching the generation service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Pipeline entry precondition: no evidence snippets exist for the
    /// prospect, so there is nothing to ground drafts on.
    #[error("no research evidence found for prospect")]
    NoResearchFound,

    /// Pipeline entry precondition: referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence-layer failure. Inserts are fire-and-forget in the
    /// orchestrator, so these are usually logged rather than propagated.
    #[error("store error: {0}")]
    Store(String),
}
