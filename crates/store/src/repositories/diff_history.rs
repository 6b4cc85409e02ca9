use adpush_core::{AdPushDiff, BoundedHistory};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::RepositoryError;
use crate::store::JsonStore;

pub const DEFAULT_DIFF_HISTORY_CAPACITY: usize = 100;

const HISTORY_KEY: &str = "diffs/history.json";

/// Index entry for one persisted diff artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffHistoryEntry {
    pub run_id: String,
    pub tenant_id: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub entity_count: usize,
    pub breach_count: usize,
    pub critical_breach_count: usize,
}

impl DiffHistoryEntry {
    fn from_diff(diff: &AdPushDiff) -> Self {
        Self {
            run_id: diff.run_id.clone(),
            tenant_id: diff.tenant_id.clone(),
            generated_at: diff.generated_at,
            entity_count: diff.entities.len(),
            breach_count: diff.guardrails.len(),
            critical_breach_count: diff.critical_breach_count(),
        }
    }
}

/// Persists diff artifacts per run and keeps a bounded most-recent-first
/// index of past runs.
pub struct DiffHistoryRepository<'a, S: JsonStore> {
    store: &'a S,
    capacity: usize,
}

impl<'a, S: JsonStore> DiffHistoryRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, capacity: DEFAULT_DIFF_HISTORY_CAPACITY }
    }

    pub fn with_capacity(store: &'a S, capacity: usize) -> Self {
        Self { store, capacity }
    }

    pub fn save(&self, diff: &AdPushDiff) -> Result<(), RepositoryError> {
        let artifact = serde_json::to_value(diff)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        self.store.save(&artifact_key(&diff.tenant_id, &diff.run_id), &artifact)?;

        let mut history = BoundedHistory::from_entries(self.capacity, self.history()?);
        history.push_front(DiffHistoryEntry::from_diff(diff));
        let document = serde_json::to_value(history.entries())
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        self.store.save(HISTORY_KEY, &document)?;

        info!(
            event_name = "diff.saved",
            tenant_id = %diff.tenant_id,
            run_id = %diff.run_id,
            entity_count = diff.entities.len(),
            "diff artifact persisted"
        );
        Ok(())
    }

    pub fn load(&self, tenant_id: &str, run_id: &str) -> Result<Option<AdPushDiff>, RepositoryError> {
        match self.store.load(&artifact_key(tenant_id, run_id))? {
            None => Ok(None),
            Some(document) => serde_json::from_value(document)
                .map(Some)
                .map_err(|error| RepositoryError::Decode(format!("diff artifact: {error}"))),
        }
    }

    pub fn history(&self) -> Result<Vec<DiffHistoryEntry>, RepositoryError> {
        match self.store.load(HISTORY_KEY)? {
            None => Ok(Vec::new()),
            Some(document) => serde_json::from_value(document)
                .map_err(|error| RepositoryError::Decode(format!("diff history: {error}"))),
        }
    }
}

fn artifact_key(tenant_id: &str, run_id: &str) -> String {
    format!("diffs/{tenant_id}/{run_id}.json")
}
