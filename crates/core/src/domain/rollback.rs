use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::diff::{AdPushDiff, ChangeDirection};
use crate::domain::entity::EntityType;
use crate::domain::guardrail::{GuardrailBreach, GuardrailSettings, GuardrailSeverity};

/// Durable record of one automation run: the diff's guardrail outcome
/// plus the raw (pre-normalization) payloads, so rollback can be
/// simulated later without re-running the diff builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackManifest {
    pub run_id: String,
    pub tenant_id: String,
    pub generated_at: DateTime<Utc>,
    pub baseline: Value,
    pub proposed: Value,
    pub guardrails: GuardrailSettings,
    #[serde(default)]
    pub guardrail_breaches: Vec<GuardrailBreach>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl RollbackManifest {
    /// Wraps a completed diff. Breaches and notes are copied verbatim;
    /// the payloads are stored raw so the manifest is self-sufficient.
    pub fn from_diff(
        diff: &AdPushDiff,
        baseline: Value,
        proposed: Value,
        guardrails: GuardrailSettings,
    ) -> Self {
        Self {
            run_id: diff.run_id.clone(),
            tenant_id: diff.tenant_id.clone(),
            generated_at: diff.generated_at,
            baseline,
            proposed,
            guardrails,
            guardrail_breaches: diff.guardrails.clone(),
            notes: diff.notes.clone(),
        }
    }

    pub fn critical_guardrails(&self) -> Vec<&GuardrailBreach> {
        self.guardrail_breaches.iter().filter(|breach| breach.is_critical()).collect()
    }

    pub fn rollback_recommended(&self) -> bool {
        self.guardrail_breaches.iter().any(GuardrailBreach::is_critical)
    }

    /// Critical breach codes, deduplicated, first occurrence order.
    pub fn critical_guardrail_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for breach in self.critical_guardrails() {
            if !codes.iter().any(|code| code == &breach.code) {
                codes.push(breach.code.clone());
            }
        }
        codes
    }
}

/// Alert raised when a manifest recommends rollback. Appended to a
/// bounded most-recent-first history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationAlert {
    pub alert_id: String,
    pub run_id: String,
    pub tenant_id: String,
    pub generated_at: DateTime<Utc>,
    pub severity: GuardrailSeverity,
    #[serde(default)]
    pub codes: Vec<String>,
    pub message: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// One concrete undo step: push a numeric field back from its proposed
/// value to its baseline value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    pub field_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_label: Option<String>,
    pub proposed_value: f64,
    pub baseline_value: f64,
    pub rollback_delta: f64,
    pub direction: ChangeDirection,
}

impl RollbackAction {
    pub fn new(
        entity_type: Option<EntityType>,
        entity_id: Option<String>,
        entity_name: Option<String>,
        field_path: String,
        field_label: Option<String>,
        proposed_value: f64,
        baseline_value: f64,
    ) -> Self {
        let rollback_delta = baseline_value - proposed_value;
        let direction = if rollback_delta > 0.0 {
            ChangeDirection::Increase
        } else {
            ChangeDirection::Decrease
        };
        Self {
            entity_type,
            entity_id,
            entity_name,
            field_path,
            field_label,
            proposed_value,
            baseline_value,
            rollback_delta,
            direction,
        }
    }
}
