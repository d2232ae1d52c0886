//! Audit trail for plan generation and catch-up
//!
//! Every plan version written by the coordinator leaves one record. Records
//! keep a snapshot of the milestones plus SHA256 fingerprints so a stored
//! plan can be checked against what was produced.

use crate::models::DynamicMilestone;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Generated,
    CatchUp,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditKind::Generated => write!(f, "generated"),
            AuditKind::CatchUp => write!(f, "catch_up"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: Uuid,
    pub plan_id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub kind: AuditKind,
    /// Fingerprint of the request or progress report that produced the plan
    pub input_fingerprint: String,
    pub milestones: Arc<Vec<DynamicMilestone>>,
    pub milestones_fingerprint: String,
    pub feasibility_score: f64,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Audit trail storage
pub struct AuditLog {
    records: Arc<RwLock<HashMap<Uuid, AuditRecord>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store an audit record
    pub async fn record(&self, record: AuditRecord) -> Result<Uuid> {
        let audit_id = record.audit_id;
        let mut records = self.records.write().await;
        records.insert(audit_id, record);
        Ok(audit_id)
    }

    pub async fn get(&self, audit_id: Uuid) -> Result<Option<AuditRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&audit_id).cloned())
    }

    /// Audit IDs for a goal, oldest first
    pub async fn list_for_goal(&self, goal_id: Uuid) -> Result<Vec<Uuid>> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records
            .iter()
            .filter(|(_, record)| record.goal_id == goal_id)
            .map(|(id, record)| (*id, record.created_at))
            .collect();

        items.sort_by_key(|(_, created_at)| *created_at);

        Ok(items.into_iter().map(|(id, _)| id).collect())
    }

    /// Recompute the milestone fingerprint of a stored record
    pub async fn verify_integrity(&self, audit_id: Uuid) -> Result<bool> {
        let records = self.records.read().await;

        match records.get(&audit_id) {
            Some(record) => {
                let current = compute_fingerprint(record.milestones.as_ref())?;
                Ok(current == record.milestones_fingerprint)
            }
            None => Ok(false),
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA256 of the JSON form of `value`, hex encoded.
/// Serialization streams straight into the hasher.
pub fn compute_fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut HashWriter(&mut hasher), value)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
