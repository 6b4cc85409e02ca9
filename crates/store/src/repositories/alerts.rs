use adpush_core::{
    AlertRecorder, AutomationAlert, RollbackManifest, DEFAULT_ALERT_HISTORY_CAPACITY,
};
use tracing::info;

use super::RepositoryError;
use crate::store::JsonStore;

const HISTORY_KEY: &str = "alerts/history.json";

/// Bounded, most-recent-first automation alert history.
pub struct AlertHistoryRepository<'a, S: JsonStore> {
    store: &'a S,
    capacity: usize,
}

impl<'a, S: JsonStore> AlertHistoryRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, capacity: DEFAULT_ALERT_HISTORY_CAPACITY }
    }

    pub fn with_capacity(store: &'a S, capacity: usize) -> Self {
        Self { store, capacity }
    }

    /// Runs the alert recorder over the persisted history: appends one
    /// alert when the manifest is critical, otherwise leaves the file
    /// untouched.
    pub fn record_manifest(
        &self,
        manifest: &RollbackManifest,
    ) -> Result<Option<AutomationAlert>, RepositoryError> {
        let mut recorder = AlertRecorder::from_entries(self.capacity, self.history()?);
        let Some(alert) = recorder.record_manifest(manifest) else {
            return Ok(None);
        };

        let document = serde_json::to_value(recorder.history())
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        self.store.save(HISTORY_KEY, &document)?;
        info!(
            event_name = "alert.recorded",
            tenant_id = %alert.tenant_id,
            run_id = %alert.run_id,
            "critical guardrail alert appended to history"
        );
        Ok(Some(alert))
    }

    pub fn history(&self) -> Result<Vec<AutomationAlert>, RepositoryError> {
        match self.store.load(HISTORY_KEY)? {
            None => Ok(Vec::new()),
            Some(document) => serde_json::from_value(document)
                .map_err(|error| RepositoryError::Decode(format!("alert history: {error}"))),
        }
    }
}
