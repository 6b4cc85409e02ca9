use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;
use crate::numeric::coerce_numeric;

pub const BREACH_BUDGET_DELTA_EXCEEDS_LIMIT: &str = "budget_delta_exceeds_limit";
pub const BREACH_SPEND_BELOW_MINIMUM: &str = "spend_below_minimum";
pub const BREACH_PLATFORM_SPEND_DELTA_EXCEEDS_LIMIT: &str = "platform_spend_delta_exceeds_limit";
pub const BREACH_PLATFORM_SPEND_BELOW_MINIMUM: &str = "platform_spend_below_minimum";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailSeverity {
    Warning,
    Critical,
}

impl GuardrailSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// One detected guardrail violation. Immutable once created and carried
/// verbatim into diff artifacts and rollback manifests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuardrailBreach {
    pub code: String,
    pub severity: GuardrailSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
}

impl GuardrailBreach {
    pub fn new(
        code: &str,
        severity: GuardrailSeverity,
        message: impl Into<String>,
        limit: Option<f64>,
        observed: Option<f64>,
    ) -> Self {
        Self { code: code.to_string(), severity, message: message.into(), limit, observed }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == GuardrailSeverity::Critical
    }
}

/// Organization-configured spend thresholds. Guardrails are advisory:
/// breaches are reported, never auto-corrected.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuardrailSettings {
    pub max_daily_budget_delta_pct: f64,
    pub min_daily_spend: f64,
}

impl Default for GuardrailSettings {
    fn default() -> Self {
        // min_daily_spend of 0 disables the minimum-spend rule.
        Self { max_daily_budget_delta_pct: 20.0, min_daily_spend: 0.0 }
    }
}

impl GuardrailSettings {
    /// Parses a guardrail configuration record, applying defaults for
    /// omitted keys. Anything that is not record-shaped is rejected.
    pub fn from_value(value: &Value) -> Result<Self, DomainError> {
        let record = match value {
            Value::Object(record) => record,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(DomainError::malformed(format!(
                    "guardrail configuration must be an object, got {}",
                    json_type_name(other)
                )))
            }
        };

        let defaults = Self::default();
        let max_daily_budget_delta_pct = match record.get("max_daily_budget_delta_pct") {
            None | Some(Value::Null) => defaults.max_daily_budget_delta_pct,
            Some(raw) => coerce_numeric(raw).ok_or_else(|| {
                DomainError::malformed("guardrail max_daily_budget_delta_pct is not numeric")
            })?,
        };
        let min_daily_spend = match record.get("min_daily_spend") {
            None | Some(Value::Null) => defaults.min_daily_spend,
            Some(raw) => coerce_numeric(raw)
                .ok_or_else(|| DomainError::malformed("guardrail min_daily_spend is not numeric"))?,
        };

        Ok(Self { max_daily_budget_delta_pct, min_daily_spend })
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
