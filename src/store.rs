//! Persistence seams.
//!
//! The relational layer is an external collaborator; the pipeline only
//! needs these trait shapes. Inserts are independent rows with no
//! transactional grouping — partial failure of one insert does not roll
//! back others, each record is independently useful.
//!
//! Dedup policy: extraction-run artifacts are always-insert (a retried
//! run may duplicate rows); only the upload-originated `linkedin_*`
//! namespace uses delete-then-insert replace semantics.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Channel, CtaType, HookType, LengthBucket, ProfileArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Approved,
    Sent,
    Rejected,
}

/// One persisted draft row: the candidate plus its authoritative
/// GateResult-derived score triple, claims-audit flag, and a serialized
/// feedback blob (gate verdicts + rewrite provenance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRecord {
    pub id: Uuid,
    pub prospect_id: Uuid,
    pub channel: Channel,
    pub variant_number: u32,
    pub subject: Option<String>,
    pub body: String,
    pub hook_type: HookType,
    pub angle: String,
    pub cta_type: CtaType,
    pub length_bucket: LengthBucket,
    pub open_score: u8,
    pub read_score: u8,
    pub reply_score: u8,
    pub claims_audit_passed: bool,
    pub status: DraftStatus,
    /// Gate verdicts, rewrite provenance, and any pre-rewrite gate
    /// summary, serialized as auxiliary metadata.
    pub feedback: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: Uuid,
    pub prospect_id: Uuid,
    pub artifact: ProfileArtifact,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Insert artifact rows for a prospect. Always-insert: no dedup.
    async fn insert_artifacts(
        &self,
        prospect_id: Uuid,
        artifacts: &[ProfileArtifact],
        source: &str,
    ) -> Result<()>;

    /// Delete all prior rows whose artifact type starts with `prefix`,
    /// then insert the new set. Used by the profile-upload path for the
    /// `linkedin_*` namespace.
    async fn replace_namespace(
        &self,
        prospect_id: Uuid,
        prefix: &str,
        artifacts: &[ProfileArtifact],
        source: &str,
    ) -> Result<()>;

    async fn artifacts_for(&self, prospect_id: Uuid) -> Result<Vec<ProfileArtifact>>;
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn insert_draft(&self, record: &DraftRecord) -> Result<Uuid>;
}

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct MemoryStore {
    artifacts: Mutex<HashMap<Uuid, Vec<ArtifactRecord>>>,
    drafts: Mutex<Vec<DraftRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drafts(&self) -> Vec<DraftRecord> {
        self.drafts.lock().expect("store lock").clone()
    }

    pub fn artifact_records(&self, prospect_id: Uuid) -> Vec<ArtifactRecord> {
        self.artifacts
            .lock()
            .expect("store lock")
            .get(&prospect_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn insert_artifacts(
        &self,
        prospect_id: Uuid,
        artifacts: &[ProfileArtifact],
        source: &str,
    ) -> Result<()> {
        let mut guard = self.artifacts.lock().expect("store lock");
        let rows = guard.entry(prospect_id).or_default();
        for artifact in artifacts {
            rows.push(ArtifactRecord {
                id: Uuid::new_v4(),
                prospect_id,
                artifact: artifact.clone(),
                source: source.to_string(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn replace_namespace(
        &self,
        prospect_id: Uuid,
        prefix: &str,
        artifacts: &[ProfileArtifact],
        source: &str,
    ) -> Result<()> {
        let mut guard = self.artifacts.lock().expect("store lock");
        let rows = guard.entry(prospect_id).or_default();
        rows.retain(|r| !r.artifact.artifact_type.as_str().starts_with(prefix));
        for artifact in artifacts {
            rows.push(ArtifactRecord {
                id: Uuid::new_v4(),
                prospect_id,
                artifact: artifact.clone(),
                source: source.to_string(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn artifacts_for(&self, prospect_id: Uuid) -> Result<Vec<ProfileArtifact>> {
        Ok(self
            .artifacts
            .lock()
            .expect("store lock")
            .get(&prospect_id)
            .map(|rows| rows.iter().map(|r| r.artifact.clone()).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn insert_draft(&self, record: &DraftRecord) -> Result<Uuid> {
        self.drafts.lock().expect("store lock").push(record.clone());
        Ok(record.id)
    }
}
