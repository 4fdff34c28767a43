//! Pipeline orchestrator.
//!
//! Fixed stage order per run: extract (only when no artifacts were
//! supplied) → generate variants → per draft: voice lint → at most one
//! lint repair → empathy gate → at most one gate-driven rewrite with one
//! re-score. The rewrite budget is bounded; a draft that fails its second
//! gate ships as a failing draft with full diagnostics rather than
//! looping. Total generation calls per draft stay within [2, 5].

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::client::GenerationClient;
use crate::drafting::DraftGenerator;
use crate::error::{OutreachError, Result};
use crate::extractor::ProfileExtractor;
use crate::gate::EmpathyGate;
use crate::lint::{voice_lint, LintContext, LintResult};
use crate::rewrite::RewriteEngine;
use crate::store::{ArtifactStore, DraftRecord, DraftStatus, DraftStore};
use crate::types::{
    Channel, DraftCandidate, EvidenceSnippet, GateResult, ProfileArtifact, ProspectContext,
    SenderProfile, TokenUsage,
};

/// Anthropic Sonnet pricing, dollars per thousand tokens.
const INPUT_COST_PER_1K: f64 = 0.003;
const OUTPUT_COST_PER_1K: f64 = 0.015;

/// One pipeline invocation. When `artifacts` is empty the extractor runs
/// first; when it is non-empty extraction is skipped entirely.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub channel: Channel,
    pub variant_count: u32,
    pub prospect: ProspectContext,
    pub sender: SenderProfile,
    /// Persistence key. `None` disables store writes for this run.
    pub prospect_id: Option<Uuid>,
    pub artifacts: Vec<ProfileArtifact>,
    pub evidence: Vec<EvidenceSnippet>,
}

/// Final state of one variant after linting, gating, and any rewrites.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDraft {
    pub draft: DraftCandidate,
    pub lint: LintResult,
    pub gate: GateResult,
    /// A gate-driven rewrite replaced the draft.
    pub was_rewritten: bool,
    /// A lint failure triggered the pre-gate repair rewrite.
    pub lint_repaired: bool,
    /// The pre-rewrite gate result, kept when a rewrite happened so the
    /// report can show what the rewrite fixed (or failed to fix).
    pub original_gate: Option<GateResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub drafts: Vec<ScoredDraft>,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Rewrite calls made across all drafts, lint repairs included.
    pub rewrite_count: usize,
    pub generation_calls: u32,
    pub usage: TokenUsage,
    pub cost_estimate: f64,
}

pub fn estimate_cost(usage: TokenUsage) -> f64 {
    (usage.input_tokens as f64 * INPUT_COST_PER_1K
        + usage.output_tokens as f64 * OUTPUT_COST_PER_1K)
        / 1000.0
}

/// The full content pipeline over one generation client. Stores are
/// optional collaborators; a missing store only disables persistence.
pub struct OutreachPipeline<C> {
    extractor: ProfileExtractor<C>,
    generator: DraftGenerator<C>,
    gate: EmpathyGate<C>,
    rewriter: RewriteEngine<C>,
    artifact_store: Option<Arc<dyn ArtifactStore>>,
    draft_store: Option<Arc<dyn DraftStore>>,
}

impl<C: GenerationClient> OutreachPipeline<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            extractor: ProfileExtractor::new(Arc::clone(&client)),
            generator: DraftGenerator::new(Arc::clone(&client)),
            gate: EmpathyGate::new(Arc::clone(&client)),
            rewriter: RewriteEngine::new(client),
            artifact_store: None,
            draft_store: None,
        }
    }

    pub fn with_artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifact_store = Some(store);
        self
    }

    pub fn with_draft_store(mut self, store: Arc<dyn DraftStore>) -> Self {
        self.draft_store = Some(store);
        self
    }

    /// Run the whole pipeline for one prospect and channel.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineReport> {
        if request.evidence.is_empty() {
            return Err(OutreachError::NoResearchFound);
        }

        let mut usage = TokenUsage::default();
        let mut generation_calls: u32 = 0;
        let mut rewrite_count = 0usize;

        let artifacts = if request.artifacts.is_empty() {
            let (extracted, extract_usage) = self
                .extractor
                .extract(&request.prospect, &request.evidence)
                .await?;
            usage.absorb(extract_usage);
            generation_calls += 1;
            self.persist_artifacts(request.prospect_id, &extracted).await;
            extracted
        } else {
            request.artifacts.clone()
        };

        let (candidates, draft_usage) = self
            .generator
            .generate(
                &request.prospect,
                &request.sender,
                &artifacts,
                request.channel,
                request.variant_count,
            )
            .await?;
        usage.absorb(draft_usage);
        generation_calls += request.variant_count;

        let lint_ctx = LintContext::new(&request.prospect, &request.sender);
        let mut scored = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let mut draft = candidate;
            let mut lint = voice_lint(&draft, &lint_ctx);
            let mut lint_repaired = false;

            if !lint.passed {
                let instruction = format!(
                    "Voice lint failures: {}. Remove all violating content and re-render \
                     strictly within the template.",
                    lint.summary()
                );
                let (repaired, repair_usage) = self
                    .rewriter
                    .rewrite(
                        &draft,
                        None,
                        &request.prospect,
                        &artifacts,
                        Some(&instruction),
                    )
                    .await?;
                usage.absorb(repair_usage);
                generation_calls += 1;
                rewrite_count += 1;
                lint_repaired = true;
                draft = repaired;
                // Re-lint so the report shows the repaired draft's state;
                // a second repair is never attempted.
                lint = voice_lint(&draft, &lint_ctx);
            }

            let (mut gate, gate_usage) = self
                .gate
                .score(
                    &draft,
                    &request.prospect,
                    &artifacts,
                    &request.evidence,
                    request.channel,
                )
                .await?;
            usage.absorb(gate_usage);
            generation_calls += 1;

            let mut was_rewritten = false;
            let mut original_gate = None;

            // One rewrite round, and only when the judge said what to fix.
            // Empty rewrite_actions means a terminal failure.
            if !gate.passes && !gate.rewrite_actions.is_empty() {
                let (rewritten, rewrite_usage) = self
                    .rewriter
                    .rewrite(&draft, Some(&gate), &request.prospect, &artifacts, None)
                    .await?;
                usage.absorb(rewrite_usage);
                generation_calls += 1;
                rewrite_count += 1;

                let (second_gate, regate_usage) = self
                    .gate
                    .score(
                        &rewritten,
                        &request.prospect,
                        &artifacts,
                        &request.evidence,
                        request.channel,
                    )
                    .await?;
                usage.absorb(regate_usage);
                generation_calls += 1;

                original_gate = Some(std::mem::replace(&mut gate, second_gate));
                draft = rewritten;
                was_rewritten = true;
            }

            let entry = ScoredDraft {
                draft,
                lint,
                gate,
                was_rewritten,
                lint_repaired,
                original_gate,
            };
            self.persist_draft(request.prospect_id, &entry).await;
            scored.push(entry);
        }

        let pass_count = scored.iter().filter(|s| s.gate.passes).count();
        let fail_count = scored.len() - pass_count;
        let cost_estimate = estimate_cost(usage);

        tracing::info!(
            prospect = %request.prospect.name,
            channel = %request.channel,
            pass_count,
            fail_count,
            rewrite_count,
            generation_calls,
            cost_estimate,
            "pipeline run complete"
        );

        Ok(PipelineReport {
            drafts: scored,
            pass_count,
            fail_count,
            rewrite_count,
            generation_calls,
            usage,
            cost_estimate,
        })
    }

    /// Store writes are best-effort: a failed insert is logged and the run
    /// continues, the report is still authoritative.
    async fn persist_artifacts(&self, prospect_id: Option<Uuid>, artifacts: &[ProfileArtifact]) {
        let (Some(store), Some(prospect_id)) = (&self.artifact_store, prospect_id) else {
            return;
        };
        if let Err(error) = store
            .insert_artifacts(prospect_id, artifacts, "extraction")
            .await
        {
            tracing::warn!(%prospect_id, %error, "artifact persistence failed");
        }
    }

    async fn persist_draft(&self, prospect_id: Option<Uuid>, entry: &ScoredDraft) {
        let (Some(store), Some(prospect_id)) = (&self.draft_store, prospect_id) else {
            return;
        };
        let record = DraftRecord {
            id: Uuid::new_v4(),
            prospect_id,
            channel: entry.draft.channel,
            variant_number: entry.draft.variant_number,
            subject: entry.draft.subject.clone(),
            body: entry.draft.body.clone(),
            hook_type: entry.draft.hook_type,
            angle: entry.draft.angle.clone(),
            cta_type: entry.draft.cta_type,
            length_bucket: entry.draft.length_bucket,
            open_score: entry.gate.open_score,
            read_score: entry.gate.read_score,
            reply_score: entry.gate.reply_score,
            claims_audit_passed: entry.gate.claims_audit_passed,
            status: DraftStatus::Draft,
            feedback: json!({
                "gate": entry.gate,
                "original_gate": entry.original_gate,
                "lint": entry.lint,
                "was_rewritten": entry.was_rewritten,
                "lint_repaired": entry.lint_repaired,
            }),
            created_at: Utc::now(),
        };
        if let Err(error) = store.insert_draft(&record).await {
            tracing::warn!(%prospect_id, %error, "draft persistence failed");
        }
    }
}
