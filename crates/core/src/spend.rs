use std::collections::BTreeMap;

use crate::domain::guardrail::{
    GuardrailBreach, GuardrailSettings, GuardrailSeverity,
    BREACH_PLATFORM_SPEND_BELOW_MINIMUM, BREACH_PLATFORM_SPEND_DELTA_EXCEEDS_LIMIT,
};
use crate::domain::spend::{
    SpendGuardrailPlatformReport, SpendGuardrailReport, SpendGuardrailTotals,
};

pub const UNKNOWN_PLATFORM: &str = "unknown";

#[derive(Clone, Copy, Debug, Default)]
struct SpendSums {
    baseline: f64,
    proposed: f64,
}

/// Accumulates USD spend per platform during the diff walk, then
/// evaluates the aggregate guardrail rules once the walk finishes.
#[derive(Clone, Debug, Default)]
pub struct SpendGuardrailAggregator {
    overall: SpendSums,
    platforms: BTreeMap<String, SpendSums>,
    observed: bool,
}

impl SpendGuardrailAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one USD field change. Absent or non-numeric sides
    /// contribute zero to the totals.
    pub fn observe(&mut self, platform: Option<&str>, before: Option<f64>, after: Option<f64>) {
        let platform = platform.unwrap_or(UNKNOWN_PLATFORM);
        let before = before.unwrap_or(0.0);
        let after = after.unwrap_or(0.0);

        self.observed = true;
        self.overall.baseline += before;
        self.overall.proposed += after;
        let sums = self.platforms.entry(platform.to_string()).or_default();
        sums.baseline += before;
        sums.proposed += after;
    }

    pub fn overall_sums(&self) -> (f64, f64) {
        (self.overall.baseline, self.overall.proposed)
    }

    pub fn has_observations(&self) -> bool {
        self.observed
    }

    /// Produces the cross-entity spend report, or nothing when the diff
    /// contained no USD changes at all.
    pub fn finish(self, settings: &GuardrailSettings) -> Option<SpendGuardrailReport> {
        if !self.observed {
            return None;
        }

        let mut platforms = Vec::with_capacity(self.platforms.len());
        let mut guardrails = Vec::new();
        for (platform, sums) in self.platforms {
            let totals = SpendGuardrailTotals::from_sums(sums.baseline, sums.proposed);
            let breaches = evaluate_platform(&platform, &totals, settings);
            guardrails.extend(breaches.iter().cloned());
            platforms.push(SpendGuardrailPlatformReport { platform, totals, guardrails: breaches });
        }

        Some(SpendGuardrailReport {
            totals: SpendGuardrailTotals::from_sums(self.overall.baseline, self.overall.proposed),
            platforms,
            guardrails,
        })
    }
}

fn evaluate_platform(
    platform: &str,
    totals: &SpendGuardrailTotals,
    settings: &GuardrailSettings,
) -> Vec<GuardrailBreach> {
    let mut breaches = Vec::new();

    let limit = settings.max_daily_budget_delta_pct;
    if limit >= 0.0 && totals.percent_delta.abs() > limit {
        breaches.push(GuardrailBreach::new(
            BREACH_PLATFORM_SPEND_DELTA_EXCEEDS_LIMIT,
            GuardrailSeverity::Warning,
            format!(
                "{platform} spend moved {:.1}% against a {:.1}% limit",
                totals.percent_delta, limit
            ),
            Some(limit),
            Some(totals.percent_delta),
        ));
    }

    let minimum = settings.min_daily_spend;
    if minimum > 0.0 && totals.proposed < minimum {
        breaches.push(GuardrailBreach::new(
            BREACH_PLATFORM_SPEND_BELOW_MINIMUM,
            GuardrailSeverity::Critical,
            format!(
                "{platform} spend lands at {:.2} USD, below the {:.2} USD minimum",
                totals.proposed, minimum
            ),
            Some(minimum),
            Some(totals.proposed),
        ));
    }

    breaches
}

#[cfg(test)]
mod tests {
    use super::SpendGuardrailAggregator;
    use crate::domain::diff::ChangeDirection;
    use crate::domain::guardrail::GuardrailSettings;

    #[test]
    fn no_usd_observations_yields_no_report() {
        let aggregator = SpendGuardrailAggregator::new();
        assert!(aggregator.finish(&GuardrailSettings::default()).is_none());
    }

    #[test]
    fn totals_and_platforms_accumulate_independently() {
        let mut aggregator = SpendGuardrailAggregator::new();
        aggregator.observe(Some("meta"), Some(100.0), Some(160.0));
        aggregator.observe(Some("google"), Some(120.0), Some(40.0));

        let settings = GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 0.0 };
        let report = aggregator.finish(&settings).expect("report");

        assert_eq!(report.totals.baseline, 220.0);
        assert_eq!(report.totals.proposed, 200.0);
        assert_eq!(report.totals.direction, ChangeDirection::Decrease);

        // BTreeMap keys: alphabetical platform order.
        assert_eq!(report.platforms[0].platform, "google");
        assert_eq!(report.platforms[1].platform, "meta");
        assert_eq!(report.platforms[1].totals.proposed, 160.0);
    }

    #[test]
    fn per_platform_breaches_fire_even_when_overall_delta_is_small() {
        let mut aggregator = SpendGuardrailAggregator::new();
        aggregator.observe(Some("meta"), Some(100.0), Some(160.0));
        aggregator.observe(Some("google"), Some(120.0), Some(40.0));

        let settings = GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 0.0 };
        let report = aggregator.finish(&settings).expect("report");

        // Overall moved about -9%, inside the limit; each platform is out.
        assert!(report.totals.percent_delta.abs() < settings.max_daily_budget_delta_pct);
        for platform in &report.platforms {
            assert_eq!(platform.guardrails.len(), 1);
            assert_eq!(platform.guardrails[0].code, "platform_spend_delta_exceeds_limit");
        }
        assert_eq!(report.guardrails.len(), 2);
    }

    #[test]
    fn platform_below_minimum_is_critical() {
        let mut aggregator = SpendGuardrailAggregator::new();
        aggregator.observe(Some("google"), Some(120.0), Some(40.0));

        let settings = GuardrailSettings { max_daily_budget_delta_pct: 200.0, min_daily_spend: 75.0 };
        let report = aggregator.finish(&settings).expect("report");
        assert_eq!(report.platforms[0].guardrails.len(), 1);
        assert_eq!(report.platforms[0].guardrails[0].code, "platform_spend_below_minimum");
        assert!(report.platforms[0].guardrails[0].is_critical());
    }

    #[test]
    fn missing_platform_falls_back_to_unknown() {
        let mut aggregator = SpendGuardrailAggregator::new();
        aggregator.observe(None, None, Some(50.0));

        let report = aggregator.finish(&GuardrailSettings::default()).expect("report");
        assert_eq!(report.platforms[0].platform, "unknown");
        assert_eq!(report.platforms[0].totals.baseline, 0.0);
        assert_eq!(report.platforms[0].totals.percent_delta, 100.0);
    }
}
