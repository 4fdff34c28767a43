//! Core data model for the outreach pipeline.
//!
//! Artifacts, evidence, draft candidates, gate results, and token usage.
//! Everything model-facing derives serde with lenient defaults so partially
//! well-formed generation output still lands in a typed value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed taxonomy of structured profile facts about a prospect.
///
/// The five extraction types are produced by the profile extractor; the
/// `linkedin_*` namespace is produced by the profile-upload path and is
/// replaced wholesale on re-upload. `raw_extraction` is the degraded
/// fallback when the extractor's reply fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    RoleSummary,
    PainPoints,
    TriggerEvents,
    CommunicationStyle,
    ConnectionHooks,
    LinkedinRole,
    LinkedinExperience,
    LinkedinEducation,
    LinkedinSkills,
    RawExtraction,
    #[serde(other)]
    Unknown,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::RoleSummary => "role_summary",
            ArtifactType::PainPoints => "pain_points",
            ArtifactType::TriggerEvents => "trigger_events",
            ArtifactType::CommunicationStyle => "communication_style",
            ArtifactType::ConnectionHooks => "connection_hooks",
            ArtifactType::LinkedinRole => "linkedin_role",
            ArtifactType::LinkedinExperience => "linkedin_experience",
            ArtifactType::LinkedinEducation => "linkedin_education",
            ArtifactType::LinkedinSkills => "linkedin_skills",
            ArtifactType::RawExtraction => "raw_extraction",
            ArtifactType::Unknown => "unknown",
        }
    }

    /// True for the upload-originated namespace with replace semantics.
    pub fn is_linkedin(&self) -> bool {
        self.as_str().starts_with("linkedin_")
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured fact bundle about a prospect, owned by that prospect.
/// Immutable once written except for full replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileArtifact {
    pub artifact_type: ArtifactType,
    #[serde(default)]
    pub content: Value,
}

impl ProfileArtifact {
    pub fn new(artifact_type: ArtifactType, content: Value) -> Self {
        Self {
            artifact_type,
            content,
        }
    }

    /// Fallback artifact wrapping an unparseable extractor reply.
    pub fn raw_extraction(text: &str) -> Self {
        Self::new(
            ArtifactType::RawExtraction,
            serde_json::json!({ "text": text }),
        )
    }
}

/// One research snippet about a prospect. The caller pre-sorts by relevance
/// descending and truncates to a bounded count before the pipeline sees it;
/// the bound is a token-cost control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub text: String,
    pub source_id: String,
    #[serde(default)]
    pub relevance: f32,
}

impl EvidenceSnippet {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            relevance: 0.0,
        }
    }
}

/// Outreach channel. The two social channels share the LinkedIn draft
/// format (no subject, short body); they differ only in gate strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    LinkedinDm,
    ConnectionNote,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::LinkedinDm => "linkedin_dm",
            Channel::ConnectionNote => "connection_note",
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Channel::Email)
    }

    /// Email drafts carry a subject line; social drafts do not.
    pub fn uses_subject(&self) -> bool {
        self.is_email()
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rhetorical angle a draft variant opens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    Insight,
    Trigger,
    PeerProof,
    /// Humble fallback used when no verified trigger exists; makes no
    /// trigger claim at all.
    Timing,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::Insight => "insight",
            HookType::Trigger => "trigger",
            HookType::PeerProof => "peer_proof",
            HookType::Timing => "timing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtaType {
    /// Permission-based question, the only CTA the voice contract allows
    /// in a first touch.
    Question,
    Resource,
    Intro,
    Meeting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthBucket {
    Short,
    Medium,
    Long,
}

/// One generated outreach variant. Replaced wholesale by the rewrite
/// engine, never patched in place; a rewrite carries forward only the
/// channel / variant_number / hook_type identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftCandidate {
    pub channel: Channel,
    pub variant_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    pub hook_type: HookType,
    pub angle: String,
    pub cta_type: CtaType,
    pub length_bucket: LengthBucket,
}

impl DraftCandidate {
    /// Subject and body joined, the text most lint checks scan.
    pub fn full_text(&self) -> String {
        match &self.subject {
            Some(s) => format!("{} {}", s, self.body),
            None => self.body.clone(),
        }
    }

    pub fn question_mark_count(&self) -> usize {
        self.full_text().matches('?').count()
    }
}

/// Token usage for one or more generation calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Fold another call's usage into this accumulator.
    pub fn absorb(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// Identity fields for the prospect being written to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectContext {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub company: String,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub persona_segment: Option<String>,
}

impl ProspectContext {
    pub fn new(name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            company: company.into(),
            seniority: None,
            persona_segment: None,
        }
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("Executive")
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Who the message is from. Feeds the identity sentence of every draft and
/// extends the linter's capitalized-token allow-list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderProfile {
    #[serde(default)]
    pub name: Option<String>,
    /// Sender organization, used in the identity line and allowed as a
    /// capitalized token by the org-name heuristic.
    #[serde(default)]
    pub org: Option<String>,
    /// One-line description of what the sender offers.
    #[serde(default)]
    pub offering: Option<String>,
    /// Role types the sender covers, used for the role menu.
    #[serde(default)]
    pub role_types: Vec<String>,
    /// Extra capitalized terms the linter should not flag as third-party
    /// org names (product names, known-benign words).
    #[serde(default)]
    pub allowed_terms: Vec<String>,
}

impl SenderProfile {
    pub fn offering_or_default(&self) -> &str {
        self.offering
            .as_deref()
            .unwrap_or("short-term specialist capacity for enterprise delivery teams")
    }
}

/// Per-gate verdict from the simulated recipient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateCheck {
    pub verdict: String,
    pub probability: i64,
    pub reason: String,
    pub killer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_off_line: Option<String>,
}

impl GateCheck {
    pub fn new(verdict: &str, probability: i64, reason: &str) -> Self {
        Self {
            verdict: verdict.to_string(),
            probability,
            reason: reason.to_string(),
            killer: None,
            drop_off_line: None,
        }
    }

    pub fn clamped_probability(&self) -> u8 {
        self.probability.clamp(0, 100) as u8
    }
}

/// A concrete fix the simulated recipient suggested for one gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteAction {
    pub gate: u8,
    pub action: String,
    pub detail: String,
}

/// Full output of one empathy-gate scoring call.
///
/// Invariants maintained by `gate::apply_hard_rules`:
/// - non-empty `unsupported_claims` implies `claims_audit_passed == false`
///   and `passes == false`;
/// - `open_score` / `read_score` / `reply_score` are exactly the three
///   gates' clamped probabilities, never independently computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateResult {
    pub gate_1_open: GateCheck,
    pub gate_2_read: GateCheck,
    pub gate_3_respond: GateCheck,
    pub passes: bool,
    pub weakest_gate: u8,
    pub perceived_intent: String,
    pub perceived_relevance: String,
    pub inbox_comparison: String,
    pub top_3_reasons_to_ignore: Vec<String>,
    pub what_would_make_me_respond: String,
    pub used_evidence_ids: Vec<String>,
    pub unsupported_claims: Vec<String>,
    pub rewrite_actions: Vec<RewriteAction>,
    // Legacy compatibility scores, derived from gate probabilities.
    pub open_score: u8,
    pub read_score: u8,
    pub reply_score: u8,
    pub claims_audit_passed: bool,
}

/// Render a bounded artifact summary block for prompt construction:
/// `type: {json}` per line, each content truncated to `max_chars`.
pub fn summarize_artifacts(
    artifacts: &[ProfileArtifact],
    max_items: usize,
    max_chars: usize,
) -> String {
    artifacts
        .iter()
        .take(max_items)
        .map(|a| {
            let json = serde_json::to_string(&a.content).unwrap_or_default();
            let truncated: String = json.chars().take(max_chars).collect();
            format!("{}: {}", a.artifact_type, truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_type_serde_names() {
        assert_eq!(
            serde_json::to_string(&ArtifactType::RoleSummary).unwrap(),
            "\"role_summary\""
        );
        let parsed: ArtifactType = serde_json::from_str("\"trigger_events\"").unwrap();
        assert_eq!(parsed, ArtifactType::TriggerEvents);
        // Unknown strings degrade instead of failing the whole artifact.
        let parsed: ArtifactType = serde_json::from_str("\"something_else\"").unwrap();
        assert_eq!(parsed, ArtifactType::Unknown);
    }

    #[test]
    fn linkedin_namespace_detection() {
        assert!(ArtifactType::LinkedinRole.is_linkedin());
        assert!(!ArtifactType::RoleSummary.is_linkedin());
    }

    #[test]
    fn usage_accumulates() {
        let mut total = TokenUsage::default();
        total.absorb(TokenUsage::new(100, 50));
        total.absorb(TokenUsage::new(10, 5));
        assert_eq!(total, TokenUsage::new(110, 55));
    }

    #[test]
    fn question_mark_count_spans_subject_and_body() {
        let draft = DraftCandidate {
            channel: Channel::Email,
            variant_number: 1,
            subject: Some("really?".into()),
            body: "Want a menu?".into(),
            hook_type: HookType::Insight,
            angle: "x".into(),
            cta_type: CtaType::Question,
            length_bucket: LengthBucket::Medium,
        };
        assert_eq!(draft.question_mark_count(), 2);
    }

    #[test]
    fn gate_probability_clamps() {
        let check = GateCheck::new("OPEN", 180, "r");
        assert_eq!(check.clamped_probability(), 100);
        let check = GateCheck::new("SKIP", -5, "r");
        assert_eq!(check.clamped_probability(), 0);
    }
}
