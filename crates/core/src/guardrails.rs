use crate::domain::diff::FieldChange;
use crate::domain::entity::EntityType;
use crate::domain::guardrail::{
    GuardrailBreach, GuardrailSettings, GuardrailSeverity, BREACH_BUDGET_DELTA_EXCEEDS_LIMIT,
    BREACH_SPEND_BELOW_MINIMUM,
};

/// Field-level guardrail evaluation. Total by design: missing units or
/// non-numeric values yield no breach, never an error, so a diff always
/// completes regardless of configuration.
pub fn evaluate_field(
    entity_type: EntityType,
    change: &FieldChange,
    settings: &GuardrailSettings,
) -> Vec<GuardrailBreach> {
    if !change.is_usd() {
        return Vec::new();
    }

    let mut breaches = Vec::new();

    if let Some(percent_delta) = change.percent_delta {
        let limit = settings.max_daily_budget_delta_pct;
        if limit >= 0.0 && percent_delta.abs() > limit {
            breaches.push(GuardrailBreach::new(
                BREACH_BUDGET_DELTA_EXCEEDS_LIMIT,
                GuardrailSeverity::Warning,
                format!(
                    "{} {} moved {:.1}% against a {:.1}% limit",
                    entity_type.as_str(),
                    change.label,
                    percent_delta,
                    limit
                ),
                Some(limit),
                Some(percent_delta),
            ));
        }
    }

    if let Some(after) = change.after.as_f64() {
        let minimum = settings.min_daily_spend;
        if minimum > 0.0 && after < minimum {
            breaches.push(GuardrailBreach::new(
                BREACH_SPEND_BELOW_MINIMUM,
                GuardrailSeverity::Critical,
                format!(
                    "{} {} lands at {:.2} USD, below the {:.2} USD minimum",
                    entity_type.as_str(),
                    change.label,
                    after,
                    minimum
                ),
                Some(minimum),
                Some(after),
            ));
        }
    }

    breaches
}
