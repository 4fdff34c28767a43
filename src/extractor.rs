//! Profile extractor.
//!
//! Turns ordered evidence snippets into the fixed five-member artifact
//! taxonomy with one generation call. The reply is untrusted: a parse
//! failure degrades to a single `raw_extraction` artifact, never an error.

use std::sync::Arc;

use crate::client::GenerationClient;
use crate::decode::decode_json;
use crate::error::Result;
use crate::types::{EvidenceSnippet, ProfileArtifact, ProspectContext, TokenUsage};

const EXTRACTION_SYSTEM: &str = "You are an expert B2B sales research analyst. Extract structured \
profile data from raw research evidence about a prospect. Return valid JSON only — no markdown, \
no explanation.";

const EXTRACTION_MAX_TOKENS: u32 = 3000;

/// Profile extractor over a generation client.
pub struct ProfileExtractor<C> {
    client: Arc<C>,
}

impl<C: GenerationClient> ProfileExtractor<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Run one extraction call. Evidence must already be bounded and
    /// relevance-ordered by the caller.
    pub async fn extract(
        &self,
        prospect: &ProspectContext,
        evidence: &[EvidenceSnippet],
    ) -> Result<(Vec<ProfileArtifact>, TokenUsage)> {
        let prompt = build_prompt(prospect, evidence);
        let completion = self
            .client
            .generate(EXTRACTION_SYSTEM, &prompt, EXTRACTION_MAX_TOKENS)
            .await?;

        let artifacts = parse_artifacts(&completion.text);
        tracing::info!(
            prospect = %prospect.name,
            artifact_count = artifacts.len(),
            "profile extraction complete"
        );
        Ok((artifacts, completion.usage))
    }
}

fn build_prompt(prospect: &ProspectContext, evidence: &[EvidenceSnippet]) -> String {
    let evidence_block = evidence
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}", i + 1, s.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Analyze this research about {name} ({title}) at {company}.

EVIDENCE:
{evidence_block}

Extract these profile artifacts as a JSON array. Each object has "artifact_type" and "content":

1. "role_summary" — content: {{ summary, responsibilities[], key_initiatives[] }}
2. "pain_points" — content: {{ pains[] }} where each pain has {{ topic, description, evidence_index }}
3. "trigger_events" — content: {{ events[] }} where each event has {{ event, date_approx, relevance }}
4. "communication_style" — content: {{ tone, formality, interests[], preferred_topics[] }}
5. "connection_hooks" — content: {{ hooks[] }} where each hook has {{ type, detail, angle }}

Return ONLY the JSON array. If evidence is insufficient for an artifact, include it with minimal content."#,
        name = prospect.name,
        title = prospect.title.as_deref().unwrap_or("Unknown title"),
        company = prospect.company,
        evidence_block = evidence_block,
    )
}

/// Tolerant decode of the extraction reply. Anything that is not a JSON
/// array of artifacts becomes one `raw_extraction` artifact wrapping the
/// raw text; the prompted output format is not guaranteed.
fn parse_artifacts(reply: &str) -> Vec<ProfileArtifact> {
    if let Some(value) = decode_json(reply) {
        if let Ok(artifacts) = serde_json::from_value::<Vec<ProfileArtifact>>(value) {
            if !artifacts.is_empty() {
                return artifacts;
            }
        }
    }
    tracing::warn!("extraction reply did not parse as artifact array, degrading to raw_extraction");
    vec![ProfileArtifact::raw_extraction(reply)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Completion;
    use crate::types::ArtifactType;
    use async_trait::async_trait;

    struct FixedClient(String);

    #[async_trait]
    impl GenerationClient for FixedClient {
        async fn generate(&self, _system: &str, _user: &str, _max: u32) -> Result<Completion> {
            Ok(Completion {
                text: self.0.clone(),
                usage: TokenUsage::new(120, 40),
            })
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn prospect() -> ProspectContext {
        ProspectContext::new("Jessica Alvarez", "Schneider Electric")
    }

    #[tokio::test]
    async fn well_formed_reply_parses_into_taxonomy() {
        let reply = r#"[
            {"artifact_type": "role_summary", "content": {"summary": "VP", "responsibilities": ["digital transformation"], "key_initiatives": []}},
            {"artifact_type": "pain_points", "content": {"pains": []}},
            {"artifact_type": "trigger_events", "content": {"events": []}}
        ]"#;
        let extractor = ProfileExtractor::new(Arc::new(FixedClient(reply.into())));
        let (artifacts, usage) = extractor
            .extract(&prospect(), &[EvidenceSnippet::new("E1", "some evidence")])
            .await
            .unwrap();
        assert_eq!(artifacts.len(), 3);
        assert_eq!(artifacts[0].artifact_type, ArtifactType::RoleSummary);
        assert_eq!(usage, TokenUsage::new(120, 40));
    }

    #[tokio::test]
    async fn fenced_reply_is_repaired() {
        let reply = "```json\n[{\"artifact_type\": \"pain_points\", \"content\": {}}]\n```";
        let extractor = ProfileExtractor::new(Arc::new(FixedClient(reply.into())));
        let (artifacts, _) = extractor
            .extract(&prospect(), &[EvidenceSnippet::new("E1", "x")])
            .await
            .unwrap();
        assert_eq!(artifacts[0].artifact_type, ArtifactType::PainPoints);
    }

    #[tokio::test]
    async fn malformed_reply_degrades_to_raw_extraction() {
        let extractor = ProfileExtractor::new(Arc::new(FixedClient(
            "Sorry, I can't produce JSON today.".into(),
        )));
        let (artifacts, _) = extractor
            .extract(&prospect(), &[EvidenceSnippet::new("E1", "x")])
            .await
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].artifact_type, ArtifactType::RawExtraction);
        assert!(artifacts[0].content["text"]
            .as_str()
            .unwrap()
            .contains("Sorry"));
    }

    #[tokio::test]
    async fn unknown_artifact_type_degrades_per_entry() {
        let reply = r#"[{"artifact_type": "mystery_block", "content": {"a": 1}}]"#;
        let extractor = ProfileExtractor::new(Arc::new(FixedClient(reply.into())));
        let (artifacts, _) = extractor
            .extract(&prospect(), &[EvidenceSnippet::new("E1", "x")])
            .await
            .unwrap();
        assert_eq!(artifacts[0].artifact_type, ArtifactType::Unknown);
    }
}
