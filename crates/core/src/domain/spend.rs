use serde::{Deserialize, Serialize};

use crate::domain::diff::ChangeDirection;
use crate::domain::guardrail::GuardrailBreach;
use crate::numeric::percent_delta;

/// USD totals accumulated across every spend field change in a diff.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpendGuardrailTotals {
    pub baseline: f64,
    pub proposed: f64,
    pub delta: f64,
    pub percent_delta: f64,
    pub direction: ChangeDirection,
}

impl SpendGuardrailTotals {
    pub fn from_sums(baseline: f64, proposed: f64) -> Self {
        let delta = proposed - baseline;
        Self {
            baseline,
            proposed,
            delta,
            percent_delta: percent_delta(baseline, proposed),
            direction: ChangeDirection::for_delta(delta),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpendGuardrailPlatformReport {
    pub platform: String,
    pub totals: SpendGuardrailTotals,
    #[serde(default)]
    pub guardrails: Vec<GuardrailBreach>,
}

/// Cross-entity spend report: overall totals plus one entry per ad
/// platform, with aggregate-level guardrail breaches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpendGuardrailReport {
    pub totals: SpendGuardrailTotals,
    #[serde(default)]
    pub platforms: Vec<SpendGuardrailPlatformReport>,
    #[serde(default)]
    pub guardrails: Vec<GuardrailBreach>,
}
