use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entity::{EntityType, SectionType};
use crate::domain::guardrail::GuardrailBreach;
use crate::domain::spend::SpendGuardrailReport;
use crate::numeric::approx_zero;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Delete,
    Update,
    Noop,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Noop => "noop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Some(Self::Create),
            "delete" => Some(Self::Delete),
            "update" => Some(Self::Update),
            "noop" => Some(Self::Noop),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Flat,
    Increase,
    Decrease,
}

impl ChangeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flat" => Some(Self::Flat),
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            _ => None,
        }
    }

    pub fn for_delta(delta: f64) -> Self {
        if approx_zero(delta) {
            Self::Flat
        } else if delta > 0.0 {
            Self::Increase
        } else {
            Self::Decrease
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetric {
    pub key: String,
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<ChangeDirection>,
}

/// One field-level difference. Only ever constructed for real changes:
/// true no-ops are suppressed before this type exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_path: String,
    pub label: String,
    pub before: Value,
    pub after: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_delta: Option<f64>,
    #[serde(default)]
    pub guardrails: Vec<GuardrailBreach>,
}

impl FieldChange {
    pub fn is_usd(&self) -> bool {
        self.unit.as_deref().is_some_and(|unit| unit.eq_ignore_ascii_case("usd"))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionDiff {
    pub section: SectionType,
    #[serde(default)]
    pub summary: Vec<SummaryMetric>,
    #[serde(default)]
    pub changes: Vec<FieldChange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDiff {
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub change_type: ChangeType,
    #[serde(default)]
    pub sections: Vec<SectionDiff>,
    #[serde(default)]
    pub guardrails: Vec<GuardrailBreach>,
}

impl EntityDiff {
    pub fn has_changes(&self) -> bool {
        self.sections.iter().any(|section| !section.changes.is_empty())
    }
}

/// The per-run diff artifact. Field names are part of the audit
/// contract and must stay stable across releases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdPushDiff {
    pub run_id: String,
    pub tenant_id: String,
    pub generation_mode: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: Vec<SummaryMetric>,
    #[serde(default)]
    pub entities: Vec<EntityDiff>,
    #[serde(default)]
    pub guardrails: Vec<GuardrailBreach>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_guardrail_report: Option<SpendGuardrailReport>,
}

impl AdPushDiff {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn critical_breach_count(&self) -> usize {
        self.guardrails.iter().filter(|breach| breach.is_critical()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeDirection, ChangeType};

    #[test]
    fn change_type_round_trips() {
        for change_type in
            [ChangeType::Create, ChangeType::Delete, ChangeType::Update, ChangeType::Noop]
        {
            assert_eq!(ChangeType::parse(change_type.as_str()), Some(change_type));
        }
    }

    #[test]
    fn change_direction_round_trips() {
        for direction in
            [ChangeDirection::Flat, ChangeDirection::Increase, ChangeDirection::Decrease]
        {
            assert_eq!(ChangeDirection::parse(direction.as_str()), Some(direction));
        }
    }

    #[test]
    fn direction_for_delta_treats_near_zero_as_flat() {
        assert_eq!(ChangeDirection::for_delta(0.0), ChangeDirection::Flat);
        assert_eq!(ChangeDirection::for_delta(5e-10), ChangeDirection::Flat);
        assert_eq!(ChangeDirection::for_delta(40.0), ChangeDirection::Increase);
        assert_eq!(ChangeDirection::for_delta(-80.0), ChangeDirection::Decrease);
    }
}
