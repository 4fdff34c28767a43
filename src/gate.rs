//! Empathy gate: the simulated-recipient judge.
//!
//! One generation call per draft. The system prompt puts the model in
//! first person as the prospect — judge realism comes from simulating
//! inbox behavior, not from asking for an abstract quality score. The
//! reply is untrusted: a malformed reply degrades to a conservative
//! failing result, and the non-negotiable automatic-fail rules are
//! re-applied in code regardless of what the model claimed.

use std::sync::Arc;

use serde_json::Value;

use crate::client::GenerationClient;
use crate::decode::decode_json;
use crate::error::Result;
use crate::lint::MEETING_PHRASES;
use crate::types::{
    ArtifactType, Channel, DraftCandidate, EvidenceSnippet, GateCheck, GateResult,
    ProfileArtifact, ProspectContext, TokenUsage,
};

const GATE_MAX_TOKENS: u32 = 3000;

/// Evidence snippets shown to the judge; a token-cost bound.
const EVIDENCE_LIMIT: usize = 10;
const EVIDENCE_SNIPPET_CHARS: usize = 300;

/// Empathy gate over a generation client.
pub struct EmpathyGate<C> {
    client: Arc<C>,
}

impl<C: GenerationClient> EmpathyGate<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Score one draft through the three-gate funnel.
    pub async fn score(
        &self,
        draft: &DraftCandidate,
        prospect: &ProspectContext,
        artifacts: &[ProfileArtifact],
        evidence: &[EvidenceSnippet],
        channel: Channel,
    ) -> Result<(GateResult, TokenUsage)> {
        let system = build_system_prompt(prospect, artifacts, evidence, channel);
        let prompt = build_user_prompt(draft);

        let completion = self.client.generate(&system, &prompt, GATE_MAX_TOKENS).await?;

        let mut gate = match decode_json(&completion.text)
            .and_then(|v| serde_json::from_value::<GateResult>(v).ok())
        {
            Some(parsed) => parsed,
            None => {
                tracing::warn!(
                    variant = draft.variant_number,
                    "gate reply did not parse, using conservative failing result"
                );
                conservative_failure()
            }
        };

        apply_hard_rules(&mut gate, draft, channel);

        tracing::info!(
            variant = draft.variant_number,
            passes = gate.passes,
            weakest_gate = gate.weakest_gate,
            "empathy gate scored draft"
        );
        Ok((gate, completion.usage))
    }
}

/// Conservative failing result used when the judge's reply is malformed.
/// The pipeline must proceed even on a garbled reply.
pub(crate) fn conservative_failure() -> GateResult {
    GateResult {
        gate_1_open: GateCheck::new("MAYBE", 50, "Could not parse judge reply"),
        gate_2_read: GateCheck::new("SKIM", 50, "Could not parse judge reply"),
        gate_3_respond: GateCheck::new("SAVE", 30, "Could not parse judge reply"),
        passes: false,
        weakest_gate: 3,
        perceived_intent: "unknown".into(),
        perceived_relevance: "unknown".into(),
        inbox_comparison: "unknown".into(),
        top_3_reasons_to_ignore: vec!["Parse error".into()],
        what_would_make_me_respond: "unknown".into(),
        ..Default::default()
    }
}

/// Deterministic post-rules. Non-negotiable regardless of the numeric
/// probabilities or the model's own `passes` claim:
/// - non-empty `unsupported_claims` fails the claims audit and the gate;
/// - more than one question mark is a Gate-2/3 killer;
/// - a meeting ask in a first touch is a Gate-3 killer;
/// - channel verdict thresholds are re-checked;
/// - legacy scores are the three gates' probabilities, and `weakest_gate`
///   defaults to the lowest-probability gate when the model omits it.
pub(crate) fn apply_hard_rules(gate: &mut GateResult, draft: &DraftCandidate, channel: Channel) {
    let mut forced_fail = false;

    if draft.question_mark_count() > 1 {
        let note = "more than one question mark";
        if gate.gate_2_read.killer.is_none() {
            gate.gate_2_read.killer = Some(note.into());
        }
        if gate.gate_3_respond.killer.is_none() {
            gate.gate_3_respond.killer = Some(note.into());
        }
        forced_fail = true;
    }

    let body_lower = draft.full_text().to_lowercase();
    if MEETING_PHRASES.iter().any(|p| body_lower.contains(p)) {
        if gate.gate_3_respond.killer.is_none() {
            gate.gate_3_respond.killer = Some("meeting ask in first touch".into());
        }
        forced_fail = true;
    }

    gate.claims_audit_passed = gate.unsupported_claims.is_empty();
    gate.open_score = gate.gate_1_open.clamped_probability();
    gate.read_score = gate.gate_2_read.clamped_probability();
    gate.reply_score = gate.gate_3_respond.clamped_probability();

    gate.passes = gate.claims_audit_passed && !forced_fail && verdicts_pass(gate, channel);

    if !(1..=3).contains(&gate.weakest_gate) {
        gate.weakest_gate = weakest_by_probability(gate);
    }
}

/// Channel-specific pass thresholds. Email requires the single best
/// verdict per gate; the social channels accept either of two verdicts at
/// gates 1-2 because recipient curiosity there tolerates more ambiguity.
fn verdicts_pass(gate: &GateResult, channel: Channel) -> bool {
    let g1 = gate.gate_1_open.verdict.to_uppercase();
    let g2 = gate.gate_2_read.verdict.to_uppercase();
    let g3 = gate.gate_3_respond.verdict.to_uppercase();
    match channel {
        Channel::Email => g1 == "OPEN" && g2 == "READ" && g3 == "RESPOND",
        Channel::LinkedinDm | Channel::ConnectionNote => {
            matches!(g1.as_str(), "OPEN" | "MAYBE")
                && matches!(g2.as_str(), "READ" | "SKIM")
                && g3 == "RESPOND"
        }
    }
}

fn weakest_by_probability(gate: &GateResult) -> u8 {
    let probs = [
        gate.gate_1_open.clamped_probability(),
        gate.gate_2_read.clamped_probability(),
        gate.gate_3_respond.clamped_probability(),
    ];
    let (index, _) = probs
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| **p)
        .unwrap_or((2, &0));
    index as u8 + 1
}

fn artifact_content<'a>(
    artifacts: &'a [ProfileArtifact],
    types: &[ArtifactType],
) -> Option<&'a Value> {
    artifacts
        .iter()
        .find(|a| types.contains(&a.artifact_type))
        .map(|a| &a.content)
}

fn join_strings(value: Option<&Value>, path: &str, field: Option<&str>) -> Option<String> {
    let items = value?.get(path)?.as_array()?;
    let joined: Vec<&str> = items
        .iter()
        .filter_map(|item| match field {
            Some(f) => item.get(f).and_then(|v| v.as_str()),
            None => item.as_str(),
        })
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(", "))
    }
}

fn build_system_prompt(
    prospect: &ProspectContext,
    artifacts: &[ProfileArtifact],
    evidence: &[EvidenceSnippet],
    channel: Channel,
) -> String {
    let role = artifact_content(
        artifacts,
        &[ArtifactType::RoleSummary, ArtifactType::LinkedinRole],
    );
    let pains = artifact_content(artifacts, &[ArtifactType::PainPoints]);
    let triggers = artifact_content(artifacts, &[ArtifactType::TriggerEvents]);
    let comm = artifact_content(artifacts, &[ArtifactType::CommunicationStyle]);

    let verified_initiatives =
        join_strings(role, "key_initiatives", None).unwrap_or_else(|| "unknown".into());
    let trigger_events = triggers
        .and_then(|t| t.get("events"))
        .and_then(|e| e.as_array())
        .map(|events| {
            events
                .iter()
                .filter_map(|e| {
                    let event = e.get("event")?.as_str()?;
                    let date = e
                        .get("date_approx")
                        .and_then(|d| d.as_str())
                        .unwrap_or("recent");
                    Some(format!("{} ({})", event, date))
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "none identified".into());
    let tone = comm
        .and_then(|c| c.get("tone"))
        .and_then(|t| t.as_str())
        .unwrap_or("professional");
    let pain_hypotheses =
        join_strings(pains, "pains", Some("topic")).unwrap_or_else(|| "unknown".into());
    let func_area = role
        .and_then(|r| r.get("responsibilities"))
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .and_then(|r| r.as_str())
        .unwrap_or("enterprise operations");

    let evidence_block = evidence
        .iter()
        .take(EVIDENCE_LIMIT)
        .enumerate()
        .map(|(i, s)| {
            let snippet: String = s.text.chars().take(EVIDENCE_SNIPPET_CHARS).collect();
            format!("[E{}] {}", i + 1, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"RECIPIENT EMPATHY GATE

You are not a sales assistant. You are not an analyst. You are the prospect.

IDENTITY:
You are {name}, {title} at {company}.

YOUR CONTEXT (VERIFIED ONLY):
- Seniority: {seniority}
- Function: {func_area}
- Verified initiatives: {verified_initiatives}
- Verified triggers: {trigger_events}
- Observed tone: {tone}
- Role pain hypotheses: {pain_hypotheses}

YOUR CURRENT STATE (PRIORS):
- Awareness: problem_aware
- Mode: execution
- Inbox tolerance: low
- Risk posture: risk_averse
- Likely objections: "too busy", "already have vendors", "not the right time"

EVIDENCE (for claims verification):
{evidence_block}

EVIDENCE RULES:
- You may only credit relevance claims if supported by evidence IDs above.
- If the message makes unsupported claims, list them in unsupported_claims and FAIL.
- List which evidence IDs were used in used_evidence_ids.

CHANNEL: {channel}

TASK: Simulate your real inbox behavior using a 3-gate funnel.

BEHAVIORAL REALITY:
- You pattern-match sales outreach in one to two seconds. Default is ignore.
- You reward brevity, specificity, and low-pressure micro-commitments.
- You punish generic praise, capability lists, hype, and meeting asks in message one.

GATE 1 (OPEN): Does subject/preview stand out from vendor noise? Concrete trigger or why-now?
GATE 2 (READ): Do the first two lines prove this was written for me? Immediate relevance?
GATE 3 (RESPOND): Low-friction ask? No sales trap? Clear reason to respond now?

AUTOMATIC FAILS:
- Non-empty unsupported_claims = fail, must include a needs_more_research rewrite action.
- More than one question = Gate 2/3 killer.
- Meeting ask in first touch = Gate 3 killer.

PASS RULES for {channel}:
- email: gate_1=OPEN, gate_2=READ, gate_3=RESPOND
- linkedin_dm: gate_1=OPEN|MAYBE, gate_2=READ|SKIM, gate_3=RESPOND
- connection_note: gate_1=OPEN|MAYBE, gate_2=READ|SKIM, gate_3=RESPOND

Answer in first person as the prospect. Be blunt and time-protective.
Output ONLY valid JSON matching the schema. No markdown, no explanation."#,
        name = prospect.name,
        title = prospect.title_or_default(),
        company = prospect.company,
        seniority = prospect.seniority.as_deref().unwrap_or("Senior"),
        func_area = func_area,
        verified_initiatives = verified_initiatives,
        trigger_events = trigger_events,
        tone = tone,
        pain_hypotheses = pain_hypotheses,
        evidence_block = evidence_block,
        channel = channel,
    )
}

fn build_user_prompt(draft: &DraftCandidate) -> String {
    let message = match &draft.subject {
        Some(subject) => format!(
            "EMAIL SUBJECT: <<<{}>>>\nBODY: <<<{}>>>",
            subject, draft.body
        ),
        None => format!("MESSAGE: <<<{}>>>", draft.body),
    };

    format!(
        r#"Score this outreach message:

{message}

Hook type: {hook}
Angle: {angle}

Return JSON with this exact schema:
{{
  "gate_1_open": {{ "verdict": "OPEN"|"MAYBE"|"SKIP", "probability": 0-100, "reason": "...", "killer": null|"..." }},
  "gate_2_read": {{ "verdict": "READ"|"SKIM"|"STOP", "probability": 0-100, "reason": "...", "killer": null|"...", "drop_off_line": null|"..." }},
  "gate_3_respond": {{ "verdict": "RESPOND"|"SAVE"|"DELETE", "probability": 0-100, "reason": "...", "killer": null|"..." }},
  "passes": true|false,
  "weakest_gate": 1|2|3,
  "perceived_intent": "...",
  "perceived_relevance": "...",
  "inbox_comparison": "...",
  "top_3_reasons_to_ignore": ["...", "...", "..."],
  "what_would_make_me_respond": "...",
  "used_evidence_ids": ["E1"],
  "unsupported_claims": [],
  "rewrite_actions": [{{ "gate": 1|2|3, "action": "...", "detail": "..." }}]
}}"#,
        message = message,
        hook = draft.hook_type.as_str(),
        angle = draft.angle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Completion;
    use crate::types::{CtaType, HookType, LengthBucket};
    use async_trait::async_trait;

    struct FixedClient(String);

    #[async_trait]
    impl GenerationClient for FixedClient {
        async fn generate(&self, _system: &str, _user: &str, _max: u32) -> Result<Completion> {
            Ok(Completion {
                text: self.0.clone(),
                usage: TokenUsage::new(300, 120),
            })
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn draft(channel: Channel, body: &str) -> DraftCandidate {
        DraftCandidate {
            channel,
            variant_number: 1,
            subject: channel.is_email().then(|| "quick thought".to_string()),
            body: body.into(),
            hook_type: HookType::Insight,
            angle: "expansion".into(),
            cta_type: CtaType::Question,
            length_bucket: LengthBucket::Medium,
        }
    }

    fn passing_reply() -> String {
        serde_json::json!({
            "gate_1_open": {"verdict": "OPEN", "probability": 80, "reason": "specific trigger", "killer": null},
            "gate_2_read": {"verdict": "READ", "probability": 75, "reason": "written for me", "killer": null, "drop_off_line": null},
            "gate_3_respond": {"verdict": "RESPOND", "probability": 60, "reason": "easy ask", "killer": null},
            "passes": true,
            "weakest_gate": 3,
            "perceived_intent": "offer help",
            "perceived_relevance": "high",
            "inbox_comparison": "stands out",
            "top_3_reasons_to_ignore": [],
            "what_would_make_me_respond": "nothing more",
            "used_evidence_ids": ["E1"],
            "unsupported_claims": [],
            "rewrite_actions": []
        })
        .to_string()
    }

    fn prospect() -> ProspectContext {
        ProspectContext::new("Jessica Alvarez", "Schneider Electric")
    }

    #[tokio::test]
    async fn passing_reply_passes_and_derives_scores() {
        let gate = EmpathyGate::new(Arc::new(FixedClient(passing_reply())));
        let (result, usage) = gate
            .score(
                &draft(Channel::Email, "Jessica, saw the work. Want a menu?"),
                &prospect(),
                &[],
                &[EvidenceSnippet::new("E1", "expansion evidence")],
                Channel::Email,
            )
            .await
            .unwrap();
        assert!(result.passes);
        assert_eq!(
            (result.open_score, result.read_score, result.reply_score),
            (80, 75, 60)
        );
        assert!(result.claims_audit_passed);
        assert_eq!(usage, TokenUsage::new(300, 120));
    }

    #[tokio::test]
    async fn malformed_reply_degrades_to_conservative_failure() {
        let gate = EmpathyGate::new(Arc::new(FixedClient("not json at all".into())));
        let (result, _) = gate
            .score(
                &draft(Channel::Email, "Body. Want a menu?"),
                &prospect(),
                &[],
                &[],
                Channel::Email,
            )
            .await
            .unwrap();
        assert!(!result.passes);
        assert_eq!(result.gate_1_open.verdict, "MAYBE");
        assert_eq!(result.gate_3_respond.verdict, "SAVE");
        assert!(result.rewrite_actions.is_empty());
    }

    #[tokio::test]
    async fn unsupported_claims_force_failure() {
        let mut value: serde_json::Value = serde_json::from_str(&passing_reply()).unwrap();
        value["unsupported_claims"] = serde_json::json!(["claims we worked together"]);
        let gate = EmpathyGate::new(Arc::new(FixedClient(value.to_string())));
        let (result, _) = gate
            .score(
                &draft(Channel::Email, "Body. Want a menu?"),
                &prospect(),
                &[],
                &[],
                Channel::Email,
            )
            .await
            .unwrap();
        assert!(!result.passes);
        assert!(!result.claims_audit_passed);
    }

    #[tokio::test]
    async fn two_questions_kill_gates_even_when_model_passes() {
        let gate = EmpathyGate::new(Arc::new(FixedClient(passing_reply())));
        let (result, _) = gate
            .score(
                &draft(Channel::LinkedinDm, "Does this land? Want a menu?"),
                &prospect(),
                &[],
                &[],
                Channel::LinkedinDm,
            )
            .await
            .unwrap();
        assert!(!result.passes);
        assert!(result.gate_2_read.killer.is_some());
        assert!(result.gate_3_respond.killer.is_some());
    }

    #[tokio::test]
    async fn meeting_ask_is_gate_three_killer() {
        let gate = EmpathyGate::new(Arc::new(FixedClient(passing_reply())));
        let (result, _) = gate
            .score(
                &draft(Channel::Email, "Open to a quick call?"),
                &prospect(),
                &[],
                &[],
                Channel::Email,
            )
            .await
            .unwrap();
        assert!(!result.passes);
        assert_eq!(
            result.gate_3_respond.killer.as_deref(),
            Some("meeting ask in first touch")
        );
    }

    #[test]
    fn social_channel_accepts_maybe_and_skim() {
        let mut gate = GateResult {
            gate_1_open: GateCheck::new("MAYBE", 55, "r"),
            gate_2_read: GateCheck::new("SKIM", 50, "r"),
            gate_3_respond: GateCheck::new("RESPOND", 60, "r"),
            ..Default::default()
        };
        let d = draft(Channel::LinkedinDm, "One line. Want a menu?");
        apply_hard_rules(&mut gate, &d, Channel::LinkedinDm);
        assert!(gate.passes);

        // The same verdicts fail the stricter email channel.
        let mut gate = GateResult {
            gate_1_open: GateCheck::new("MAYBE", 55, "r"),
            gate_2_read: GateCheck::new("SKIM", 50, "r"),
            gate_3_respond: GateCheck::new("RESPOND", 60, "r"),
            ..Default::default()
        };
        let d = draft(Channel::Email, "One line. Want a menu?");
        apply_hard_rules(&mut gate, &d, Channel::Email);
        assert!(!gate.passes);
    }

    #[test]
    fn weakest_gate_defaults_to_lowest_probability() {
        let mut gate = GateResult {
            gate_1_open: GateCheck::new("OPEN", 80, "r"),
            gate_2_read: GateCheck::new("READ", 20, "r"),
            gate_3_respond: GateCheck::new("RESPOND", 60, "r"),
            weakest_gate: 0,
            ..Default::default()
        };
        let d = draft(Channel::Email, "Body. Want a menu?");
        apply_hard_rules(&mut gate, &d, Channel::Email);
        assert_eq!(gate.weakest_gate, 2);
    }
}
