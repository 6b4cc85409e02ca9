use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::entity::EntityType;
use crate::domain::rollback::{RollbackAction, RollbackManifest};
use crate::numeric::{coerce_numeric, EPSILON};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuardrailSummary {
    pub total: usize,
    pub critical_count: usize,
    #[serde(default)]
    pub critical_codes: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackSpendSummary {
    pub total_proposed_spend: f64,
    pub total_baseline_spend: f64,
    pub total_rollback_delta: f64,
}

/// The rollback simulation artifact: what undoing one run would change,
/// and by how much.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollbackSimulation {
    pub run_id: String,
    pub tenant_id: String,
    pub manifest_generated_at: DateTime<Utc>,
    pub simulated_at: DateTime<Utc>,
    pub rollback_recommended: bool,
    #[serde(default)]
    pub critical_guardrail_codes: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub guardrail_summary: GuardrailSummary,
    #[serde(default)]
    pub actions: Vec<RollbackAction>,
    pub action_count: usize,
    pub rollback_ready: bool,
    pub spend_summary: RollbackSpendSummary,
}

/// Derives the undo actions for a persisted manifest.
///
/// Works on the manifest's raw payloads, not the diff artifact, so it
/// can run later in another process with only the manifest at hand.
/// Only entities present in both payloads produce actions; a rollback
/// cannot restore what the baseline never had.
pub fn simulate(manifest: &RollbackManifest, simulated_at: DateTime<Utc>) -> RollbackSimulation {
    let baseline_index = index_raw_entities(&manifest.baseline);
    let proposed_index = index_raw_entities(&manifest.proposed);

    let shared_keys: BTreeSet<&String> = baseline_index
        .keys()
        .filter(|key| proposed_index.contains_key(key.as_str()))
        .collect();

    let mut actions = Vec::new();
    let mut baseline_spend = 0.0;
    let mut proposed_spend = 0.0;

    for key in shared_keys {
        let baseline_record = baseline_index[key];
        let proposed_record = proposed_index[key];
        let baseline_leaves = numeric_leaves(baseline_record);
        let proposed_leaves = numeric_leaves(proposed_record);

        let entity_type = proposed_record
            .get("entity_type")
            .and_then(Value::as_str)
            .and_then(EntityType::parse);
        let entity_id = record_identifier(proposed_record, "entity_id")
            .or_else(|| record_identifier(baseline_record, "entity_id"));
        let entity_name = record_identifier(proposed_record, "name")
            .or_else(|| record_identifier(baseline_record, "name"));

        for (path, proposed_leaf) in &proposed_leaves {
            let Some(baseline_leaf) = baseline_leaves.get(path) else {
                continue;
            };

            if is_budget_path(path) {
                baseline_spend += baseline_leaf.value;
                proposed_spend += proposed_leaf.value;
            }

            if (proposed_leaf.value - baseline_leaf.value).abs() < EPSILON {
                continue;
            }
            actions.push(RollbackAction::new(
                entity_type,
                entity_id.clone(),
                entity_name.clone(),
                path.clone(),
                proposed_leaf.label.clone().or_else(|| baseline_leaf.label.clone()),
                proposed_leaf.value,
                baseline_leaf.value,
            ));
        }
    }

    let critical_codes = manifest.critical_guardrail_codes();
    let action_count = actions.len();
    RollbackSimulation {
        run_id: manifest.run_id.clone(),
        tenant_id: manifest.tenant_id.clone(),
        manifest_generated_at: manifest.generated_at,
        simulated_at,
        rollback_recommended: manifest.rollback_recommended(),
        critical_guardrail_codes: critical_codes.clone(),
        notes: manifest.notes.clone(),
        guardrail_summary: GuardrailSummary {
            total: manifest.guardrail_breaches.len(),
            critical_count: manifest.critical_guardrails().len(),
            critical_codes,
        },
        rollback_ready: action_count > 0,
        action_count,
        actions,
        spend_summary: RollbackSpendSummary {
            total_proposed_spend: proposed_spend,
            total_baseline_spend: baseline_spend,
            total_rollback_delta: baseline_spend - proposed_spend,
        },
    }
}

/// Identity here is deliberately simpler than the normalizer's chain:
/// `entity_type:entity_id`, falling back to `entity_type:name`. Raw
/// payload records carry no synthetic anchors.
fn index_raw_entities(payload: &Value) -> BTreeMap<String, &Map<String, Value>> {
    let members: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(record) => match record.get("entities").or_else(|| record.get("nodes")) {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![payload],
        },
        _ => Vec::new(),
    };

    let mut index = BTreeMap::new();
    for member in members {
        let Some(record) = member.as_object() else {
            continue;
        };
        let Some(entity_type) = record.get("entity_type").and_then(Value::as_str) else {
            continue;
        };
        let Some(tail) = record_identifier(record, "entity_id")
            .or_else(|| record_identifier(record, "name"))
        else {
            continue;
        };
        index.insert(format!("{entity_type}:{tail}"), record);
    }
    index
}

struct NumericLeaf {
    value: f64,
    label: Option<String>,
}

fn numeric_leaves(record: &Map<String, Value>) -> BTreeMap<String, NumericLeaf> {
    let mut leaves = BTreeMap::new();
    let Some(Value::Object(sections)) = record.get("sections") else {
        return leaves;
    };

    for (section, fields) in sections {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        for (key, raw_field) in fields {
            let field_record = raw_field
                .as_object()
                .filter(|candidate| candidate.contains_key("value"));
            let value = field_record.map_or(raw_field, |record| &record["value"]);
            let Some(number) = coerce_numeric(value) else {
                continue;
            };
            let path = field_record
                .and_then(|record| record.get("field_path"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{section}.{key}"));
            let label = field_record
                .and_then(|record| record.get("label"))
                .and_then(Value::as_str)
                .map(str::to_string);
            leaves.insert(path, NumericLeaf { value: number, label });
        }
    }
    leaves
}

fn record_identifier(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}

fn is_budget_path(path: &str) -> bool {
    path.ends_with("daily_budget") || path.ends_with("lifetime_budget")
}
