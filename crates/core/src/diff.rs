use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::diff::{
    AdPushDiff, ChangeDirection, ChangeType, EntityDiff, FieldChange, SectionDiff, SummaryMetric,
};
use crate::domain::entity::{EntityType, NormalisedField, NormalisedNode, SectionType};
use crate::domain::guardrail::{GuardrailBreach, GuardrailSettings};
use crate::guardrails::evaluate_field;
use crate::numeric::{approx_zero, percent_delta};
use crate::spend::SpendGuardrailAggregator;

pub const METRIC_ENTITIES_CHANGED: &str = "entities_changed";
pub const METRIC_TOTAL_SPEND: &str = "total_spend";
pub const METRIC_TOTAL_SPEND_DELTA: &str = "total_spend_delta";

/// Run identity and context for one diff build.
#[derive(Clone, Debug)]
pub struct DiffRequest {
    pub tenant_id: String,
    pub run_id: String,
    pub generation_mode: String,
    pub generated_at: DateTime<Utc>,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub notes: Vec<String>,
    pub source_plan_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DiffBuilder {
    settings: GuardrailSettings,
}

impl DiffBuilder {
    pub fn new(settings: GuardrailSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GuardrailSettings {
        &self.settings
    }

    /// Diffs two normalised entity collections into the per-run
    /// artifact. Entities are matched by identity key and walked in
    /// sorted key order; artifacts are hashed downstream, so ordering
    /// is a correctness requirement here, not a nicety.
    pub fn build(
        &self,
        baseline: &[NormalisedNode],
        proposed: &[NormalisedNode],
        request: DiffRequest,
    ) -> AdPushDiff {
        let baseline_index = index_nodes(baseline);
        let proposed_index = index_nodes(proposed);

        let mut keys: BTreeSet<&String> = BTreeSet::new();
        keys.extend(baseline_index.keys());
        keys.extend(proposed_index.keys());

        let mut aggregator = SpendGuardrailAggregator::new();
        let mut entities = Vec::new();
        let mut guardrails: Vec<GuardrailBreach> = Vec::new();

        for key in keys {
            let before = baseline_index.get(key).copied();
            let after = proposed_index.get(key).copied();
            let Some(entity) = self.diff_entity(before, after, &mut aggregator) else {
                continue;
            };
            if entity.change_type == ChangeType::Noop {
                continue;
            }
            guardrails.extend(entity.guardrails.iter().cloned());
            entities.push(entity);
        }

        let summary = build_summary(entities.len(), &aggregator);
        let spend_guardrail_report = aggregator.finish(&self.settings);
        if let Some(report) = &spend_guardrail_report {
            guardrails.extend(report.guardrails.iter().cloned());
        }

        AdPushDiff {
            run_id: request.run_id,
            tenant_id: request.tenant_id,
            generation_mode: request.generation_mode,
            generated_at: request.generated_at,
            window_start: request.window_start,
            window_end: request.window_end,
            summary,
            entities,
            guardrails,
            notes: request.notes,
            source_plan_id: request.source_plan_id,
            spend_guardrail_report,
        }
    }

    fn diff_entity(
        &self,
        before: Option<&NormalisedNode>,
        after: Option<&NormalisedNode>,
        aggregator: &mut SpendGuardrailAggregator,
    ) -> Option<EntityDiff> {
        let node = after.or(before)?;
        let entity_type = node.entity_type;
        let platform = after
            .and_then(NormalisedNode::platform)
            .or_else(|| before.and_then(NormalisedNode::platform));

        let mut sections = Vec::new();
        let mut guardrails = Vec::new();
        for section in SectionType::ALL {
            let before_fields = before.and_then(|node| node.section(section));
            let after_fields = after.and_then(|node| node.section(section));
            if let Some(section_diff) = self.diff_section(
                entity_type,
                section,
                before_fields,
                after_fields,
                platform.as_deref(),
                aggregator,
            ) {
                guardrails.extend(section_diff.changes.iter().flat_map(|change| {
                    change.guardrails.iter().cloned()
                }));
                sections.push(section_diff);
            }
        }

        let change_type = match (before.is_some(), after.is_some()) {
            (false, true) => ChangeType::Create,
            (true, false) => ChangeType::Delete,
            _ if sections.iter().any(|s| !s.changes.is_empty()) => ChangeType::Update,
            _ => ChangeType::Noop,
        };

        Some(EntityDiff {
            entity_type,
            entity_id: node.entity_id.clone(),
            name: node.name.clone(),
            change_type,
            sections,
            guardrails,
        })
    }

    fn diff_section(
        &self,
        entity_type: EntityType,
        section: SectionType,
        before: Option<&BTreeMap<String, NormalisedField>>,
        after: Option<&BTreeMap<String, NormalisedField>>,
        platform: Option<&str>,
        aggregator: &mut SpendGuardrailAggregator,
    ) -> Option<SectionDiff> {
        let mut names: BTreeSet<&String> = BTreeSet::new();
        if let Some(fields) = before {
            names.extend(fields.keys());
        }
        if let Some(fields) = after {
            names.extend(fields.keys());
        }
        if names.is_empty() {
            return None;
        }

        let mut changes = Vec::new();
        let mut usd_before = 0.0;
        let mut usd_after = 0.0;
        let mut usd_seen = false;

        for name in names {
            let before_field = before.and_then(|fields| fields.get(name));
            let after_field = after.and_then(|fields| fields.get(name));
            let Some(mut change) = field_change(before_field, after_field) else {
                continue;
            };

            // Evaluator first, aggregator second; breach order in the
            // artifact depends on it.
            change.guardrails = evaluate_field(entity_type, &change, &self.settings);
            if change.is_usd() {
                let before_amount = before_field.and_then(NormalisedField::numeric_value);
                let after_amount = after_field.and_then(NormalisedField::numeric_value);
                aggregator.observe(platform, before_amount, after_amount);
                usd_before += before_amount.unwrap_or(0.0);
                usd_after += after_amount.unwrap_or(0.0);
                usd_seen = true;
            }
            changes.push(change);
        }

        if changes.is_empty() {
            return None;
        }

        let summary = section_summary(usd_seen, usd_before, usd_after);
        Some(SectionDiff { section, summary, changes })
    }
}

fn index_nodes(nodes: &[NormalisedNode]) -> BTreeMap<String, &NormalisedNode> {
    nodes
        .iter()
        .enumerate()
        .map(|(position, node)| (node.identity_key(position), node))
        .collect()
}

/// Builds one field-level change, or nothing for a true no-op. A no-op
/// requires both sides to exist with equal canonical values; creates
/// and deletes always surface, even when the present side looks equal
/// to the absent one.
fn field_change(
    before: Option<&NormalisedField>,
    after: Option<&NormalisedField>,
) -> Option<FieldChange> {
    let meta = after.or(before)?;

    let before_value = before.map_or(Value::Null, NormalisedField::normalised_value);
    let after_value = after.map_or(Value::Null, NormalisedField::normalised_value);

    let before_amount = before.and_then(NormalisedField::numeric_value);
    let after_amount = after.and_then(NormalisedField::numeric_value);
    let (delta, pct) = match (before_amount, after_amount) {
        (Some(b), Some(a)) => (Some(a - b), Some(percent_delta(b, a))),
        _ => (None, None),
    };

    let both_present = before.is_some() && after.is_some();
    if both_present && before_value == after_value && delta.map_or(true, approx_zero) {
        return None;
    }

    Some(FieldChange {
        field_path: meta.field_path.clone(),
        label: meta.label.clone(),
        before: before_value,
        after: after_value,
        delta,
        percent_delta: pct,
        unit: meta.unit.clone(),
        forecast_delta: meta.forecast_delta,
        guardrails: Vec::new(),
    })
}

fn section_summary(usd_seen: bool, before_total: f64, after_total: f64) -> Vec<SummaryMetric> {
    if !usd_seen || (approx_zero(before_total) && approx_zero(after_total)) {
        return Vec::new();
    }

    let mut summary = vec![SummaryMetric {
        key: METRIC_TOTAL_SPEND.to_string(),
        label: "Section spend".to_string(),
        value: after_total,
        unit: Some("usd".to_string()),
        direction: None,
    }];

    let delta = after_total - before_total;
    if !approx_zero(delta) {
        summary.push(SummaryMetric {
            key: METRIC_TOTAL_SPEND_DELTA.to_string(),
            label: "Section spend delta".to_string(),
            value: delta,
            unit: Some("usd".to_string()),
            direction: Some(ChangeDirection::for_delta(delta)),
        });
    }
    summary
}

fn build_summary(entity_count: usize, aggregator: &SpendGuardrailAggregator) -> Vec<SummaryMetric> {
    let mut summary = Vec::new();
    if entity_count > 0 {
        summary.push(SummaryMetric {
            key: METRIC_ENTITIES_CHANGED.to_string(),
            label: "Entities changed".to_string(),
            value: entity_count as f64,
            unit: None,
            direction: None,
        });
    }

    if aggregator.has_observations() {
        let (baseline_total, proposed_total) = aggregator.overall_sums();
        summary.push(SummaryMetric {
            key: METRIC_TOTAL_SPEND.to_string(),
            label: "Total proposed spend".to_string(),
            value: proposed_total,
            unit: Some("usd".to_string()),
            direction: None,
        });

        let delta = proposed_total - baseline_total;
        if !approx_zero(delta) {
            summary.push(SummaryMetric {
                key: METRIC_TOTAL_SPEND_DELTA.to_string(),
                label: "Total spend delta".to_string(),
                value: delta,
                unit: Some("usd".to_string()),
                direction: Some(ChangeDirection::for_delta(delta)),
            });
        }
    }
    summary
}
