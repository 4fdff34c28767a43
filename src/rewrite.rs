//! Rewrite engine.
//!
//! Full regeneration of a failing draft conditioned on specific feedback:
//! lint violations, the empathy gate's rewrite actions, or both. Produces
//! a replacement candidate carrying forward only the channel /
//! variant_number / hook_type identity fields. Never calls itself — the
//! orchestrator decides whether a second round happens.

use std::sync::Arc;

use crate::client::GenerationClient;
use crate::decode::split_subject_body;
use crate::error::Result;
use crate::types::{
    summarize_artifacts, DraftCandidate, GateResult, ProfileArtifact, ProspectContext, TokenUsage,
};

const REWRITE_SYSTEM: &str = "You are an elite B2B outreach rewriter. You receive a draft that \
FAILED a quality check. Your job is to rewrite it to pass. Be concise, specific, and remove all \
vendor noise. Keep the sender's voice contract: no digits, at most one question, no meeting ask, \
no third-party company names.";

const REWRITE_MAX_TOKENS: u32 = 2000;

/// Rewrite engine over a generation client.
pub struct RewriteEngine<C> {
    client: Arc<C>,
}

impl<C: GenerationClient> RewriteEngine<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// One rewrite call. `gate` is `None` when invoked purely from a lint
    /// failure; `instruction` carries the explicit fix text.
    pub async fn rewrite(
        &self,
        original: &DraftCandidate,
        gate: Option<&GateResult>,
        prospect: &ProspectContext,
        artifacts: &[ProfileArtifact],
        instruction: Option<&str>,
    ) -> Result<(DraftCandidate, TokenUsage)> {
        let fixes = combined_fix_instructions(gate, instruction);
        let prompt = build_prompt(original, gate, prospect, artifacts, &fixes);

        let completion = self
            .client
            .generate(REWRITE_SYSTEM, &prompt, REWRITE_MAX_TOKENS)
            .await?;

        let draft = replacement_candidate(original, &completion.text);
        tracing::debug!(
            variant = original.variant_number,
            from_gate = gate.is_some(),
            "draft rewritten"
        );
        Ok((draft, completion.usage))
    }
}

/// Concatenate the explicit instruction with a structured summary of the
/// gate feedback into one fix block.
fn combined_fix_instructions(gate: Option<&GateResult>, instruction: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(text) = instruction {
        parts.push(text.to_string());
    }
    if let Some(gate) = gate {
        parts.push(format!("Weakest gate: {}", gate.weakest_gate));
        if !gate.top_3_reasons_to_ignore.is_empty() {
            parts.push(format!(
                "Top reasons to ignore: {}",
                gate.top_3_reasons_to_ignore.join("; ")
            ));
        }
        if !gate.what_would_make_me_respond.is_empty() {
            parts.push(format!(
                "What would make them respond: {}",
                gate.what_would_make_me_respond
            ));
        }
        for action in &gate.rewrite_actions {
            parts.push(format!(
                "Gate {} ({}): {}",
                action.gate, action.action, action.detail
            ));
        }
    }
    parts.join("\n")
}

fn build_prompt(
    original: &DraftCandidate,
    gate: Option<&GateResult>,
    prospect: &ProspectContext,
    artifacts: &[ProfileArtifact],
    fixes: &str,
) -> String {
    let original_block = match &original.subject {
        Some(subject) => format!("Subject: {}\nBody: {}", subject, original.body),
        None => format!("Body: {}", original.body),
    };

    let failure_source = if gate.is_some() {
        "the recipient empathy gate"
    } else {
        "the deterministic voice lint"
    };

    let output_format = if original.subject.is_some() {
        "Output exactly two labeled sections:\nsubject: <subject line>\nbody: <message body>"
    } else {
        "Output ONLY the final message text. No labels, no JSON, no markdown."
    };

    format!(
        r#"rewrite_mode: true

Rewrite this outreach message that failed {failure_source}.

ORIGINAL:
{original_block}

PROSPECT: {name}, {title} at {company}

FIX INSTRUCTIONS:
{fixes}

PROFILE INTELLIGENCE:
{artifact_summary}

RULES:
- Keep the same channel ({channel}) and general angle.
- Fix the specific issues identified.
- No meeting asks in first touch — use micro-commitments.
- Max one question.
- Be specific and evidence-grounded.

{output_format}"#,
        failure_source = failure_source,
        original_block = original_block,
        name = prospect.name,
        title = prospect.title_or_default(),
        company = prospect.company,
        fixes = fixes,
        artifact_summary = summarize_artifacts(artifacts, 3, 300),
        channel = original.channel,
        output_format = output_format,
    )
}

/// Build the replacement candidate from the rewrite reply. Identity fields
/// carry over; subject/body are replaced. A marker-less reply for an email
/// draft keeps the original subject and takes the whole reply as the body.
fn replacement_candidate(original: &DraftCandidate, reply: &str) -> DraftCandidate {
    let mut draft = original.clone();
    if original.subject.is_some() {
        let (subject, body) = split_subject_body(reply);
        if let Some(subject) = subject {
            draft.subject = Some(subject);
        }
        draft.body = body;
    } else {
        draft.body = reply.trim().to_string();
    }
    draft
}
