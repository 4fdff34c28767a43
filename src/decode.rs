//! Tolerant decoding of generation-service replies.
//!
//! Every model reply is untrusted, possibly-malformed data. These helpers
//! never fail: they return `None` (or a raw-text fallback) and let each
//! call site substitute its own conservative default.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("static regex"));

/// Parse JSON out of a model reply with repair attempts for the common
/// failure modes: markdown code fences and prose wrapped around the
/// payload. Returns `None` when no JSON value can be recovered.
pub fn decode_json(content: &str) -> Option<Value> {
    // Direct parse first.
    if let Ok(v) = serde_json::from_str(content) {
        return Some(v);
    }

    // Markdown code block.
    if let Some(caps) = JSON_BLOCK_RE.captures(content) {
        if let Ok(v) = serde_json::from_str(&caps[1]) {
            tracing::debug!("extracted JSON from markdown code block");
            return Some(v);
        }
    }

    // Outermost object embedded in prose.
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str(&content[start..=end]) {
                tracing::debug!("extracted JSON object from content");
                return Some(v);
            }
        }
    }

    // Outermost array embedded in prose.
    if let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) {
        if start < end {
            if let Ok(v) = serde_json::from_str(&content[start..=end]) {
                tracing::debug!("extracted JSON array from content");
                return Some(v);
            }
        }
    }

    None
}

/// Split a draft reply on its `subject:` / `body:` marker pair.
///
/// The email generator is prompted to emit exactly those two labeled
/// sections. When the markers are missing the whole reply becomes the
/// body and the caller supplies a default subject — a parse failure
/// degrades the draft, it never fails the call.
pub fn split_subject_body(reply: &str) -> (Option<String>, String) {
    let trimmed = reply.trim();
    // ASCII lowercasing preserves byte length, so marker positions found
    // here are valid offsets into `trimmed` even for non-ASCII replies.
    let lower = trimmed.to_ascii_lowercase();

    let subject_pos = lower.find("subject:");
    let body_pos = lower.find("body:");

    match (subject_pos, body_pos) {
        (Some(s), Some(b)) if s < b => {
            let subject = trimmed[s + "subject:".len()..b]
                .trim()
                .trim_matches('"')
                .to_string();
            let body = trimmed[b + "body:".len()..].trim().to_string();
            let subject = if subject.is_empty() {
                None
            } else {
                Some(subject)
            };
            (subject, body)
        }
        (None, Some(b)) => (None, trimmed[b + "body:".len()..].trim().to_string()),
        _ => (None, trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_direct() {
        let v = decode_json(r#"{"name": "Test"}"#).unwrap();
        assert_eq!(v["name"], "Test");
    }

    #[test]
    fn decode_markdown_block() {
        let content = "Here's the result:\n\n```json\n{\"name\": \"Test Corp\"}\n```\n\nDone.";
        let v = decode_json(content).unwrap();
        assert_eq!(v["name"], "Test Corp");
    }

    #[test]
    fn decode_embedded_object() {
        let content = r#"The gate says {"passes": false} which means..."#;
        let v = decode_json(content).unwrap();
        assert_eq!(v["passes"], false);
    }

    #[test]
    fn decode_embedded_array() {
        let content = r#"Artifacts: [{"artifact_type": "role_summary", "content": {}}] end"#;
        let v = decode_json(content).unwrap();
        assert!(v.is_array());
    }

    #[test]
    fn decode_gives_up_on_prose() {
        assert!(decode_json("I could not produce the requested output.").is_none());
    }

    #[test]
    fn split_labeled_reply() {
        let (subject, body) = split_subject_body(
            "subject: quick thought on hiring\nbody: Jessica, saw the expansion work.\n\nMore text.",
        );
        assert_eq!(subject.as_deref(), Some("quick thought on hiring"));
        assert!(body.starts_with("Jessica, saw"));
        assert!(body.contains("More text."));
    }

    #[test]
    fn split_without_markers_falls_back_to_body() {
        let (subject, body) = split_subject_body("Just a plain reply with no labels.");
        assert!(subject.is_none());
        assert_eq!(body, "Just a plain reply with no labels.");
    }

    #[test]
    fn split_body_only() {
        let (subject, body) = split_subject_body("body: short message here");
        assert!(subject.is_none());
        assert_eq!(body, "short message here");
    }

    #[test]
    fn split_survives_multibyte_text_before_markers() {
        // Characters whose Unicode lowercase expands in byte length must
        // not shift the marker offsets or slice mid-character.
        let (subject, body) = split_subject_body("İ subject: hello\nbody: world");
        assert_eq!(subject.as_deref(), Some("hello"));
        assert_eq!(body, "world");

        let (subject, body) = split_subject_body("İİİİİİbody: x");
        assert!(subject.is_none());
        assert_eq!(body, "x");
    }

    #[test]
    fn split_markers_match_case_insensitively() {
        let (subject, body) = split_subject_body("Subject: Quick note\nBODY: Hello there.");
        assert_eq!(subject.as_deref(), Some("Quick note"));
        assert_eq!(body, "Hello there.");
    }
}
