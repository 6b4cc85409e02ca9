use uuid::Uuid;

use crate::domain::guardrail::GuardrailSeverity;
use crate::domain::rollback::{AutomationAlert, RollbackManifest};
use crate::history::BoundedHistory;

pub const DEFAULT_ALERT_HISTORY_CAPACITY: usize = 50;

/// Turns critical manifests into alerts on a bounded most-recent-first
/// history. Warning-only manifests record nothing.
#[derive(Clone, Debug)]
pub struct AlertRecorder {
    history: BoundedHistory<AutomationAlert>,
}

impl Default for AlertRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertRecorder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALERT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { history: BoundedHistory::new(capacity) }
    }

    pub fn from_entries(capacity: usize, entries: Vec<AutomationAlert>) -> Self {
        Self { history: BoundedHistory::from_entries(capacity, entries) }
    }

    /// Records exactly one alert for a critical manifest, or nothing.
    pub fn record_manifest(&mut self, manifest: &RollbackManifest) -> Option<AutomationAlert> {
        if !manifest.rollback_recommended() {
            return None;
        }

        let codes = manifest.critical_guardrail_codes();
        let alert = AutomationAlert {
            alert_id: Uuid::new_v4().to_string(),
            run_id: manifest.run_id.clone(),
            tenant_id: manifest.tenant_id.clone(),
            generated_at: manifest.generated_at,
            severity: GuardrailSeverity::Critical,
            message: format!(
                "run {} for tenant {} breached {} critical guardrail(s); rollback recommended",
                manifest.run_id,
                manifest.tenant_id,
                manifest.critical_guardrails().len()
            ),
            codes,
            notes: manifest.notes.clone(),
        };
        self.history.push_front(alert.clone());
        Some(alert)
    }

    pub fn history(&self) -> &[AutomationAlert] {
        self.history.entries()
    }

    pub fn into_history(self) -> Vec<AutomationAlert> {
        self.history.into_entries()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::AlertRecorder;
    use crate::domain::guardrail::{
        GuardrailBreach, GuardrailSettings, GuardrailSeverity, BREACH_SPEND_BELOW_MINIMUM,
    };
    use crate::domain::rollback::RollbackManifest;

    fn manifest(run_id: &str, severity: GuardrailSeverity) -> RollbackManifest {
        RollbackManifest {
            run_id: run_id.to_string(),
            tenant_id: "acme".to_string(),
            generated_at: Utc::now(),
            baseline: json!({"entities": []}),
            proposed: json!({"entities": []}),
            guardrails: GuardrailSettings::default(),
            guardrail_breaches: vec![GuardrailBreach::new(
                BREACH_SPEND_BELOW_MINIMUM,
                severity,
                "spend below minimum",
                Some(75.0),
                Some(20.0),
            )],
            notes: Vec::new(),
        }
    }

    #[test]
    fn critical_manifest_appends_exactly_one_alert() {
        let mut recorder = AlertRecorder::new();
        let alert = recorder
            .record_manifest(&manifest("run-1", GuardrailSeverity::Critical))
            .expect("alert");

        assert_eq!(recorder.history().len(), 1);
        assert_eq!(alert.run_id, "run-1");
        assert_eq!(alert.severity, GuardrailSeverity::Critical);
        assert_eq!(alert.codes, vec!["spend_below_minimum".to_string()]);
        assert!(alert.message.contains("rollback recommended"));
    }

    #[test]
    fn warning_only_manifest_records_nothing() {
        let mut recorder = AlertRecorder::new();
        assert!(recorder.record_manifest(&manifest("run-2", GuardrailSeverity::Warning)).is_none());
        assert!(recorder.history().is_empty());
    }

    #[test]
    fn history_is_most_recent_first_and_bounded() {
        let mut recorder = AlertRecorder::with_capacity(2);
        recorder.record_manifest(&manifest("run-1", GuardrailSeverity::Critical));
        recorder.record_manifest(&manifest("run-2", GuardrailSeverity::Critical));
        recorder.record_manifest(&manifest("run-3", GuardrailSeverity::Critical));

        let runs: Vec<&str> =
            recorder.history().iter().map(|alert| alert.run_id.as_str()).collect();
        assert_eq!(runs, vec!["run-3", "run-2"]);
    }
}
