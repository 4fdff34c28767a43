//! Deterministic voice linter.
//!
//! Pure functions, no network. Catches the failures a cheap syntactic pass
//! can find reliably — digits, question-mark count, banned phrase banks,
//! suspected third-party org names — so the expensive simulated-recipient
//! call is reserved for relevance and tone.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Channel, DraftCandidate, ProspectContext, SenderProfile};

/// Jargon the voice contract bans outright, both channels.
const BANNED_JARGON: &[&str] = &[
    "synergy",
    "leverage",
    "cutting-edge",
    "best-in-class",
    "state-of-the-art",
    "streamline",
    "win-win",
    "circle back",
    "low-hanging fruit",
    "move the needle",
    "patterns",
    "framework",
    "playbook",
    "what we learned",
    "what we've learned",
    "lessons",
    "architecture decisions",
    "technical brief",
    "competitive intelligence",
    "deep dive",
    "ai-native",
    "ecosystem push",
    "integration bottleneck",
    "thought leadership",
];

/// Scheduling language. A meeting ask in a first touch is banned; the
/// empathy gate independently treats it as a Gate-3 killer.
pub(crate) const MEETING_PHRASES: &[&str] = &[
    "quick call",
    "hop on a call",
    "jump on a call",
    "get on a call",
    "schedule a meeting",
    "schedule a call",
    "book a meeting",
    "book some time",
    "grab time",
    "find time on your calendar",
    "get on your calendar",
    "set up a call",
    "set up a meeting",
    "meet for coffee",
    "minutes this week",
    "minutes next week",
];

const FLATTERY_PHRASES: &[&str] = &[
    "impressive",
    "congratulations",
    "congrats",
    "big fan",
    "huge fan",
    "love what",
    "amazing work",
    "great work you",
];

const FILLER_PHRASES_EMAIL: &[&str] = &[
    "i hope this finds you well",
    "hope you're doing well",
    "just reaching out",
    "just wanted to",
    "touching base",
    "i know you're busy",
    "my name is",
];

/// Social channel adds the presumptive/insight-teaser phrases that kill
/// authority in a short DM.
const FILLER_PHRASES_SOCIAL: &[&str] = &[
    "i hope this finds you well",
    "just reaching out",
    "just wanted to",
    "touching base",
    "from what i can tell",
    "the hardest part is",
    "you are likely",
    "you must be dealing with",
];

const SOCIAL_PROOF_PHRASES_EMAIL: &[&str] = &[
    "case study",
    "we helped",
    "we've helped",
    "our clients",
    "clients like you",
    "companies like yours",
    "similar companies",
];

const SOCIAL_PROOF_PHRASES_SOCIAL: &[&str] = &[
    "case study",
    "we helped",
    "we've helped",
    "our clients",
    "clients like you",
    "companies like yours",
    "similar companies",
    "worth sharing",
    "worth sending",
];

/// Capitalized words that are never third-party org names. The heuristic
/// is a best-effort pre-filter; false positives are acceptable.
const BENIGN_CAPITALIZED: &[&str] = &[
    "I",
    "I'm",
    "I'd",
    "I'll",
    "I've",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
    "Hi",
    "Hey",
    "Hello",
    "Thanks",
    "Thank",
    "Best",
    "Regards",
    "Cheers",
    "LinkedIn",
    "CTO",
    "CIO",
    "CFO",
    "VP",
    "ESG",
    "ERP",
    "ML",
    "AI",
];

const LINKEDIN_MAX_CHARS: usize = 450;
/// Slack above the 65-105 word target so borderline drafts go to the gate
/// instead of burning a rewrite.
const EMAIL_MAX_WORDS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    Digit,
    MultiQuestion,
    NoCta,
    BannedWord,
    MeetingAsk,
    Flattery,
    Filler,
    SocialProof,
    TooLong,
    OrgName,
}

impl ViolationKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ViolationKind::Digit => "DIGIT",
            ViolationKind::MultiQuestion => "MULTI_QUESTION",
            ViolationKind::NoCta => "NO_CTA",
            ViolationKind::BannedWord => "BANNED_WORD",
            ViolationKind::MeetingAsk => "MEETING_ASK",
            ViolationKind::Flattery => "FLATTERY",
            ViolationKind::Filler => "FILLER",
            ViolationKind::SocialProof => "SOCIAL_PROOF",
            ViolationKind::TooLong => "TOO_LONG",
            ViolationKind::OrgName => "ORG_NAME",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub detail: String,
}

impl Violation {
    fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.tag(), self.detail)
    }
}

/// Ephemeral lint outcome; computed fresh each time, folded into the
/// pipeline decision, never persisted standalone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintResult {
    pub passed: bool,
    pub violations: Vec<Violation>,
}

impl LintResult {
    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Joined violation summary, used as the lint-repair fix instruction.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Allow-list context for the org-name heuristic: the prospect's own
/// name/company tokens, the sender's identity, and any caller-supplied
/// extra terms are never flagged.
#[derive(Debug, Clone)]
pub struct LintContext {
    allowed: HashSet<String>,
}

impl LintContext {
    pub fn new(prospect: &ProspectContext, sender: &SenderProfile) -> Self {
        let mut allowed: HashSet<String> = BENIGN_CAPITALIZED
            .iter()
            .map(|w| w.to_lowercase())
            .collect();
        let mut absorb = |text: &str| {
            for token in text.split_whitespace() {
                let cleaned = clean_token(token);
                if !cleaned.is_empty() {
                    allowed.insert(cleaned.to_lowercase());
                }
            }
        };
        absorb(&prospect.name);
        absorb(&prospect.company);
        if let Some(name) = &sender.name {
            absorb(name);
        }
        if let Some(org) = &sender.org {
            absorb(org);
        }
        for term in &sender.allowed_terms {
            absorb(term);
        }
        Self { allowed }
    }

    fn is_allowed(&self, token: &str) -> bool {
        self.allowed.contains(&token.to_lowercase())
    }
}

/// Run every deterministic check against a draft. All checks are
/// independent; all must pass for `passed = true`.
pub fn voice_lint(draft: &DraftCandidate, ctx: &LintContext) -> LintResult {
    let mut violations = Vec::new();
    let full_text = draft.full_text();
    let lower = full_text.to_lowercase();
    let social = !draft.channel.is_email();

    // 1. No digits anywhere in subject + body.
    if let Some(digit) = full_text.chars().find(|c| c.is_ascii_digit()) {
        violations.push(Violation::new(
            ViolationKind::Digit,
            format!("found digit '{}' in draft text", digit),
        ));
    }

    // 2. Question-mark count. The CTA is the only allowed question; the
    // social channels additionally require it to be present.
    let q_count = full_text.matches('?').count();
    if q_count > 1 {
        violations.push(Violation::new(
            ViolationKind::MultiQuestion,
            format!("{} question marks, max 1 allowed", q_count),
        ));
    }
    if social && q_count == 0 {
        violations.push(Violation::new(
            ViolationKind::NoCta,
            "no question mark found, CTA question required",
        ));
    }

    // 3. Banned jargon.
    for phrase in BANNED_JARGON {
        if lower.contains(phrase) {
            violations.push(Violation::new(
                ViolationKind::BannedWord,
                format!("\"{}\"", phrase),
            ));
        }
    }

    // 4. Meeting / scheduling asks.
    for phrase in MEETING_PHRASES {
        if lower.contains(phrase) {
            violations.push(Violation::new(
                ViolationKind::MeetingAsk,
                format!("\"{}\"", phrase),
            ));
        }
    }

    // 5. Flattery, filler, social proof (channel-dependent lists).
    for phrase in FLATTERY_PHRASES {
        if lower.contains(phrase) {
            violations.push(Violation::new(
                ViolationKind::Flattery,
                format!("\"{}\"", phrase),
            ));
        }
    }
    let filler: &[&str] = if social {
        FILLER_PHRASES_SOCIAL
    } else {
        FILLER_PHRASES_EMAIL
    };
    for phrase in filler {
        if lower.contains(phrase) {
            violations.push(Violation::new(
                ViolationKind::Filler,
                format!("\"{}\"", phrase),
            ));
        }
    }
    let social_proof: &[&str] = if social {
        SOCIAL_PROOF_PHRASES_SOCIAL
    } else {
        SOCIAL_PROOF_PHRASES_EMAIL
    };
    for phrase in social_proof {
        if lower.contains(phrase) {
            violations.push(Violation::new(
                ViolationKind::SocialProof,
                format!("\"{}\"", phrase),
            ));
        }
    }

    // 6. Length window.
    if social {
        if draft.body.chars().count() > LINKEDIN_MAX_CHARS {
            violations.push(Violation::new(
                ViolationKind::TooLong,
                format!(
                    "{} chars, max {}",
                    draft.body.chars().count(),
                    LINKEDIN_MAX_CHARS
                ),
            ));
        }
    } else {
        let words = draft.body.split_whitespace().count();
        if words > EMAIL_MAX_WORDS {
            violations.push(Violation::new(
                ViolationKind::TooLong,
                format!("{} words, max {}", words, EMAIL_MAX_WORDS),
            ));
        }
    }

    // 7. Heuristic third-party org detection.
    for suspect in org_name_suspects(&draft.body, ctx) {
        violations.push(Violation::new(
            ViolationKind::OrgName,
            format!("possible third-party org name \"{}\"", suspect),
        ));
    }

    LintResult {
        passed: violations.is_empty(),
        violations,
    }
}

/// Capitalized tokens that are not at a sentence start and not in the
/// allow-list. Intentionally a heuristic: a pre-filter, not ground truth.
fn org_name_suspects(text: &str, ctx: &LintContext) -> Vec<String> {
    let mut suspects = Vec::new();
    for line in text.lines() {
        let mut sentence_start = true;
        for raw in line.split_whitespace() {
            let token = clean_token(raw);
            if token.is_empty() {
                continue;
            }
            let capitalized = token.chars().next().is_some_and(|c| c.is_uppercase());
            if capitalized && !sentence_start && !ctx.is_allowed(&token) {
                suspects.push(token);
            }
            sentence_start = raw.ends_with(['.', '!', '?', ':']);
        }
    }
    suspects.dedup();
    suspects
}

/// Strip punctuation and a trailing possessive from a token.
fn clean_token(raw: &str) -> String {
    let trimmed: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '\'' || *c == '-')
        .collect();
    let trimmed = trimmed.trim_matches(['\'', '-']);
    trimmed
        .strip_suffix("'s")
        .unwrap_or(trimmed)
        .to_string()
}
