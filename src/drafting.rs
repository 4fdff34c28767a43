//! Draft generator.
//!
//! Produces N outreach variants with **one generation call per variant**:
//! cost traded for per-variant strategy diversity and failure isolation —
//! one variant's malformed reply cannot corrupt the others. Each variant
//! rotates through a distinct hook over at most three verified triggers;
//! with zero triggers every variant falls back to the humble timing hook.

use std::sync::Arc;

use crate::client::GenerationClient;
use crate::decode::split_subject_body;
use crate::error::Result;
use crate::types::{
    summarize_artifacts, ArtifactType, Channel, CtaType, DraftCandidate, HookType, LengthBucket,
    ProfileArtifact, ProspectContext, SenderProfile, TokenUsage,
};

const EMAIL_SYSTEM: &str = include_str!("prompts/email_voice_system.md");
const LINKEDIN_SYSTEM: &str = include_str!("prompts/linkedin_dm_system.md");

const DRAFT_MAX_TOKENS: u32 = 1024;

/// Applied when the reply carries no usable subject marker.
const DEFAULT_SUBJECT: &str = "quick note";

/// At most this many verified triggers participate in hook rotation.
const MAX_TRIGGERS: usize = 3;

/// Relevance phrase bank for the social-channel plan. Read-only reference
/// table, rotated per variant.
const RELEVANCE_PHRASES: &[&str] = &[
    "In builds like this, it can be tough to avoid short-term gaps without extra capacity.",
    "In a ramp like this, it can be hard to keep delivery moving without short burst coverage.",
    "When programs like this pick up, teams often need short-term help in a couple roles.",
    "In transitions like this, it can be tough to keep momentum without some short-term support.",
    "When initiatives like this scale up, it can be hard to fill gaps quickly enough.",
];

/// Permission-based CTA library. Every entry is a single question asking
/// to send something short — never a meeting ask.
const CTA_LIBRARY: &[&str] = &[
    "Want me to send a short role menu?",
    "Should I send a short role menu?",
    "Would it be useful if I sent a short overview?",
    "Should I send a short role menu of where we can plug in?",
    "Want me to send a short note on how we typically support teams here?",
];

/// Persona segment to specific role pair. Vague role language is a lint
/// violation, so the plan always names concrete roles.
const ROLE_MAP: &[(&str, [&str; 2])] = &[
    ("technical", ["data engineer", "ML engineer"]),
    ("platform", ["platform engineer", "data engineer"]),
    ("product", ["delivery lead", "product delivery lead"]),
    ("engineering", ["data engineer", "platform engineer"]),
    ("data", ["data engineer", "ML engineer"]),
];

const DEFAULT_ROLES: [&str; 2] = ["delivery lead", "program support lead"];

const ALLOWED_ANGLES: &[&str] = &[
    "partner_capacity_intro",
    "program_ramp_support",
    "role_transition_support",
];

/// Hook assignment for one variant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HookPlan {
    pub hook_type: HookType,
    pub angle: String,
    /// Verified trigger text this variant may reference; `None` means the
    /// draft must make no trigger claim at all.
    pub trigger: Option<String>,
}

/// Rotate hook strategy and trigger across variants. Zero triggers means
/// every variant uses the humble timing hook with no trigger claim.
pub(crate) fn plan_hook(triggers: &[String], variant_index: usize) -> HookPlan {
    if triggers.is_empty() {
        return HookPlan {
            hook_type: HookType::Timing,
            angle: "humble timing".to_string(),
            trigger: None,
        };
    }
    let hooks = [HookType::Insight, HookType::Trigger, HookType::PeerProof];
    let bounded = &triggers[..triggers.len().min(MAX_TRIGGERS)];
    let trigger = bounded[variant_index % bounded.len()].clone();
    HookPlan {
        hook_type: hooks[variant_index % hooks.len()],
        angle: trigger.clone(),
        trigger: Some(trigger),
    }
}

/// Pull verified trigger texts out of the `trigger_events` artifact.
pub(crate) fn verified_triggers(artifacts: &[ProfileArtifact]) -> Vec<String> {
    artifacts
        .iter()
        .find(|a| a.artifact_type == ArtifactType::TriggerEvents)
        .and_then(|a| a.content.get("events"))
        .and_then(|e| e.as_array())
        .map(|events| {
            events
                .iter()
                .filter_map(|e| e.get("event").and_then(|v| v.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Pre-built plan for one social-channel variant, assembled from the
/// phrase banks before the model sees anything.
#[derive(Debug, Clone)]
struct LinkedinPlan {
    trigger_line: String,
    relevance_line: String,
    identity_line: String,
    role_1: String,
    role_2: String,
    cta_line: String,
    angle: String,
}

fn build_linkedin_plan(
    prospect: &ProspectContext,
    sender: &SenderProfile,
    hook: &HookPlan,
    variant_index: usize,
) -> LinkedinPlan {
    let first_name = prospect.first_name();
    let trigger_line = match &hook.trigger {
        Some(text) => format!("{}, saw the {} work at {}.", first_name, text, prospect.company),
        None => format!(
            "{}, noticed some of the recent work at {}.",
            first_name, prospect.company
        ),
    };

    let relevance_line = RELEVANCE_PHRASES[variant_index % RELEVANCE_PHRASES.len()].to_string();
    let identity_line = identity_line(sender, &prospect.company);

    let (role_1, role_2) = pick_roles(prospect, sender);
    let cta_line = CTA_LIBRARY[variant_index % CTA_LIBRARY.len()].to_string();
    let angle = ALLOWED_ANGLES[variant_index % ALLOWED_ANGLES.len()].to_string();

    LinkedinPlan {
        trigger_line,
        relevance_line,
        identity_line,
        role_1,
        role_2,
        cta_line,
        angle,
    }
}

fn identity_line(sender: &SenderProfile, company: &str) -> String {
    match &sender.org {
        Some(org) => format!("I lead {}'s partnership work with {}.", org, company),
        None => format!("I lead our partnership work with {}.", company),
    }
}

fn pick_roles(prospect: &ProspectContext, sender: &SenderProfile) -> (String, String) {
    if sender.role_types.len() >= 2 {
        return (sender.role_types[0].clone(), sender.role_types[1].clone());
    }
    let persona = prospect
        .persona_segment
        .as_deref()
        .unwrap_or("default")
        .to_lowercase();
    let roles = ROLE_MAP
        .iter()
        .find(|(key, _)| persona.contains(key))
        .map(|(_, roles)| *roles)
        .unwrap_or(DEFAULT_ROLES);
    (roles[0].to_string(), roles[1].to_string())
}

/// Draft generator over a generation client.
pub struct DraftGenerator<C> {
    client: Arc<C>,
}

impl<C: GenerationClient> DraftGenerator<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Generate `variant_count` draft candidates, one call each,
    /// sequentially folding usage.
    pub async fn generate(
        &self,
        prospect: &ProspectContext,
        sender: &SenderProfile,
        artifacts: &[ProfileArtifact],
        channel: Channel,
        variant_count: u32,
    ) -> Result<(Vec<DraftCandidate>, TokenUsage)> {
        let triggers = verified_triggers(artifacts);
        let mut drafts = Vec::with_capacity(variant_count as usize);
        let mut usage = TokenUsage::default();

        for index in 0..variant_count as usize {
            let hook = plan_hook(&triggers, index);
            let (draft, call_usage) = self
                .generate_variant(prospect, sender, artifacts, channel, index, &hook)
                .await?;
            tracing::debug!(
                variant = index + 1,
                hook = hook.hook_type.as_str(),
                channel = %channel,
                "draft variant generated"
            );
            usage.absorb(call_usage);
            drafts.push(draft);
        }

        Ok((drafts, usage))
    }

    async fn generate_variant(
        &self,
        prospect: &ProspectContext,
        sender: &SenderProfile,
        artifacts: &[ProfileArtifact],
        channel: Channel,
        variant_index: usize,
        hook: &HookPlan,
    ) -> Result<(DraftCandidate, TokenUsage)> {
        let variant_number = variant_index as u32 + 1;
        if channel.is_email() {
            let prompt = self.email_prompt(prospect, sender, artifacts, hook, variant_index);
            let completion = self
                .client
                .generate(EMAIL_SYSTEM, &prompt, DRAFT_MAX_TOKENS)
                .await?;
            // Marker-less replies degrade to raw-body with a default subject.
            let (subject, body) = split_subject_body(&completion.text);
            let draft = DraftCandidate {
                channel,
                variant_number,
                subject: Some(subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string())),
                body,
                hook_type: hook.hook_type,
                angle: hook.angle.clone(),
                cta_type: CtaType::Question,
                length_bucket: LengthBucket::Medium,
            };
            Ok((draft, completion.usage))
        } else {
            let plan = build_linkedin_plan(prospect, sender, hook, variant_index);
            let prompt = self.linkedin_prompt(&plan);
            let completion = self
                .client
                .generate(LINKEDIN_SYSTEM, &prompt, DRAFT_MAX_TOKENS)
                .await?;
            // The whole reply is the body for the short channel.
            let draft = DraftCandidate {
                channel,
                variant_number,
                subject: None,
                body: completion.text.trim().to_string(),
                hook_type: hook.hook_type,
                angle: plan.angle,
                cta_type: CtaType::Question,
                length_bucket: LengthBucket::Short,
            };
            Ok((draft, completion.usage))
        }
    }

    fn email_prompt(
        &self,
        prospect: &ProspectContext,
        sender: &SenderProfile,
        artifacts: &[ProfileArtifact],
        hook: &HookPlan,
        variant_index: usize,
    ) -> String {
        let hook_instruction = match hook.hook_type {
            HookType::Insight => {
                "Insight-led hook: open with a specific observation drawn from the verified trigger."
            }
            HookType::Trigger => {
                "Trigger-event hook: open by referencing the verified trigger as a recent change."
            }
            HookType::PeerProof => {
                "Peer-proof hook: open from the sender's experience with similar teams, without naming any third-party company."
            }
            HookType::Timing => {
                "Humble timing hook: no verified trigger exists, so open with a modest, honest timing note. Make no trigger claim."
            }
        };

        let trigger_block = match &hook.trigger {
            Some(t) => format!("VERIFIED TRIGGER: {}", t),
            None => "VERIFIED TRIGGER: none — make no trigger claim.".to_string(),
        };

        let (role_1, role_2) = pick_roles(prospect, sender);

        format!(
            r#"Render one first-touch email for:

PROSPECT: {name}, {title} at {company}
PERSONA: {persona}

{trigger_block}

HOOK: {hook_instruction}

PROFILE INTELLIGENCE:
{artifact_summary}

IDENTITY LINE: {identity_line}
OFFER: {offering} (roles to name if needed: {role_1}, {role_2})
CTA LINE: {cta_line}

Render the email now in the required output format."#,
            name = prospect.name,
            title = prospect.title_or_default(),
            company = prospect.company,
            persona = prospect.persona_segment.as_deref().unwrap_or("decision_maker"),
            trigger_block = trigger_block,
            hook_instruction = hook_instruction,
            artifact_summary = summarize_artifacts(artifacts, 8, 500),
            identity_line = identity_line(sender, &prospect.company),
            offering = sender.offering_or_default(),
            role_1 = role_1,
            role_2 = role_2,
            cta_line = CTA_LIBRARY[variant_index % CTA_LIBRARY.len()],
        )
    }

    fn linkedin_prompt(&self, plan: &LinkedinPlan) -> String {
        format!(
            r#"Assemble the DM from this plan:

trigger_line: {trigger_line}
relevance_line: {relevance_line}
identity_line: {identity_line}
role_1: {role_1}
role_2: {role_2}
cta_line: {cta_line}

Output the final message text only."#,
            trigger_line = plan.trigger_line,
            relevance_line = plan.relevance_line,
            identity_line = plan.identity_line,
            role_1 = plan.role_1,
            role_2 = plan.role_2,
            cta_line = plan.cta_line,
        )
    }
}
