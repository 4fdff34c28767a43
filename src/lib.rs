//! Multi-tenant sales-outreach content pipeline.
//!
//! Evidence about a prospect flows through four model-backed stages —
//! profile extraction, draft generation, a simulated-recipient empathy
//! gate, and a bounded rewrite loop — with a deterministic voice lint
//! between generation and the gate. Every stage is generic over
//! [`client::GenerationClient`], so the whole pipeline runs against a
//! mock client in tests and against [`client::AnthropicClient`] in
//! production.
//!
//! Model replies are treated as untrusted throughout: malformed output
//! degrades (raw-text artifact, raw-body draft, conservative failing gate
//! result) instead of erroring, and the non-negotiable scoring rules are
//! re-applied in code after every gate call.

pub mod client;
pub mod decode;
pub mod drafting;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod lint;
pub mod pipeline;
pub mod rewrite;
pub mod store;
pub mod types;

pub use client::{AnthropicClient, Completion, GenerationClient};
pub use drafting::DraftGenerator;
pub use error::{OutreachError, Result};
pub use extractor::ProfileExtractor;
pub use gate::EmpathyGate;
pub use lint::{voice_lint, LintContext, LintResult, ViolationKind};
pub use pipeline::{OutreachPipeline, PipelineReport, PipelineRequest, ScoredDraft};
pub use rewrite::RewriteEngine;
pub use store::{ArtifactStore, DraftRecord, DraftStatus, DraftStore, MemoryStore};
pub use types::{
    ArtifactType, Channel, DraftCandidate, EvidenceSnippet, GateResult, HookType, ProfileArtifact,
    ProspectContext, SenderProfile, TokenUsage,
};
