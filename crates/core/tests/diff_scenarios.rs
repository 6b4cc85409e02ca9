use chrono::{TimeZone, Utc};
use serde_json::json;

use adpush_core::{
    normalize_payload, simulate, AdPushDiff, AlertRecorder, ChangeDirection, ChangeType,
    DiffBuilder, DiffRequest, GuardrailSettings, GuardrailSeverity, RollbackManifest,
};

fn request(run_id: &str) -> DiffRequest {
    DiffRequest {
        tenant_id: "acme".to_string(),
        run_id: run_id.to_string(),
        generation_mode: "automated".to_string(),
        generated_at: Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap(),
        window_start: None,
        window_end: None,
        notes: vec!["allocator v3".to_string()],
        source_plan_id: Some("plan-77".to_string()),
    }
}

fn budget_entity(entity_id: &str, platform: &str, daily_budget: f64) -> serde_json::Value {
    json!({
        "entity_type": "ad_set",
        "entity_id": entity_id,
        "name": format!("Ad set {entity_id}"),
        "metadata": {"platform": platform},
        "sections": {
            "spend": {
                "daily_budget": {
                    "field_path": "spend.daily_budget",
                    "label": "Daily budget",
                    "kind": "numeric",
                    "unit": "usd",
                    "value": daily_budget
                }
            }
        }
    })
}

fn build_diff(
    baseline: serde_json::Value,
    proposed: serde_json::Value,
    settings: GuardrailSettings,
    run_id: &str,
) -> AdPushDiff {
    let baseline = normalize_payload(&baseline).expect("baseline normalizes");
    let proposed = normalize_payload(&proposed).expect("proposed normalizes");
    DiffBuilder::new(settings).build(&baseline, &proposed, request(run_id))
}

#[test]
fn scenario_a_raised_budget_breaches_delta_limit() {
    let settings = GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 0.0 };
    let diff = build_diff(
        json!({"entities": [budget_entity("as-1", "meta", 100.0)]}),
        json!({"entities": [budget_entity("as-1", "meta", 140.0)]}),
        settings,
        "run-a",
    );

    assert_eq!(diff.entities.len(), 1);
    let change = &diff.entities[0].sections[0].changes[0];
    assert_eq!(change.delta, Some(40.0));
    assert!((change.percent_delta.expect("percent delta") - 40.0).abs() < 1e-9);
    assert_eq!(change.guardrails.len(), 1);
    assert_eq!(change.guardrails[0].code, "budget_delta_exceeds_limit");
    assert_eq!(change.guardrails[0].severity, GuardrailSeverity::Warning);

    let spend_delta = diff
        .summary
        .iter()
        .find(|metric| metric.key == "total_spend_delta")
        .expect("spend delta metric");
    assert_eq!(spend_delta.value, 40.0);
    assert_eq!(spend_delta.direction, Some(ChangeDirection::Increase));
}

#[test]
fn scenario_b_created_entity_below_minimum_spend_is_critical() {
    let settings = GuardrailSettings { max_daily_budget_delta_pct: 500.0, min_daily_spend: 75.0 };
    let diff = build_diff(
        json!({"entities": []}),
        json!({"entities": [budget_entity("as-new", "meta", 20.0)]}),
        settings,
        "run-b",
    );

    assert_eq!(diff.entities[0].change_type, ChangeType::Create);
    let change = &diff.entities[0].sections[0].changes[0];
    assert_eq!(change.before, json!(null));
    assert_eq!(change.after, json!(20.0));

    let breach = change
        .guardrails
        .iter()
        .find(|breach| breach.code == "spend_below_minimum")
        .expect("minimum spend breach");
    assert_eq!(breach.severity, GuardrailSeverity::Critical);
    assert!(diff.critical_breach_count() >= 1);
}

#[test]
fn scenario_c_platform_totals_breach_individually() {
    let settings = GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 75.0 };
    let diff = build_diff(
        json!({"entities": [
            budget_entity("as-up", "meta", 100.0),
            budget_entity("as-down", "google", 120.0),
        ]}),
        json!({"entities": [
            budget_entity("as-up", "meta", 160.0),
            budget_entity("as-down", "google", 40.0),
        ]}),
        settings,
        "run-c",
    );

    let report = diff.spend_guardrail_report.as_ref().expect("spend report");
    assert_eq!(report.totals.baseline, 220.0);
    assert_eq!(report.totals.proposed, 200.0);

    // Overall delta is about -9%, within the limit; each platform is not.
    assert!(report.totals.percent_delta.abs() < 15.0);
    for platform in &report.platforms {
        assert!(platform
            .guardrails
            .iter()
            .any(|breach| breach.code == "platform_spend_delta_exceeds_limit"));
    }

    let google = report
        .platforms
        .iter()
        .find(|platform| platform.platform == "google")
        .expect("google platform");
    assert!(google
        .guardrails
        .iter()
        .any(|breach| breach.code == "platform_spend_below_minimum" && breach.is_critical()));

    let meta = report.platforms.iter().find(|p| p.platform == "meta").expect("meta platform");
    assert!(!meta.guardrails.iter().any(|b| b.code == "platform_spend_below_minimum"));

    // Platform breaches roll up into the diff-level union.
    assert!(diff.guardrails.iter().any(|b| b.code == "platform_spend_delta_exceeds_limit"));
}

#[test]
fn scenario_d_alerts_only_for_critical_manifests() {
    let settings = GuardrailSettings { max_daily_budget_delta_pct: 500.0, min_daily_spend: 75.0 };
    let baseline = json!({"entities": []});
    let proposed = json!({"entities": [budget_entity("as-new", "meta", 20.0)]});
    let diff = build_diff(baseline.clone(), proposed.clone(), settings, "run-d1");
    let critical_manifest = RollbackManifest::from_diff(&diff, baseline, proposed, settings);
    assert!(critical_manifest.rollback_recommended());

    let warning_settings =
        GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 0.0 };
    let baseline = json!({"entities": [budget_entity("as-1", "meta", 100.0)]});
    let proposed = json!({"entities": [budget_entity("as-1", "meta", 140.0)]});
    let warning_diff = build_diff(baseline.clone(), proposed.clone(), warning_settings, "run-d2");
    let warning_manifest =
        RollbackManifest::from_diff(&warning_diff, baseline, proposed, warning_settings);
    assert!(!warning_manifest.rollback_recommended());

    let mut recorder = AlertRecorder::new();
    assert!(recorder.record_manifest(&critical_manifest).is_some());
    assert!(recorder.record_manifest(&warning_manifest).is_none());
    assert_eq!(recorder.history().len(), 1);
    assert_eq!(recorder.history()[0].run_id, "run-d1");
}

#[test]
fn union_completeness_across_create_update_delete() {
    let settings = GuardrailSettings::default();
    let diff = build_diff(
        json!({"entities": [
            budget_entity("as-kept", "meta", 100.0),
            budget_entity("as-gone", "meta", 50.0),
        ]}),
        json!({"entities": [
            budget_entity("as-kept", "meta", 110.0),
            budget_entity("as-added", "meta", 60.0),
        ]}),
        settings,
        "run-union",
    );

    let mut seen: Vec<(Option<&str>, ChangeType)> = diff
        .entities
        .iter()
        .map(|entity| (entity.entity_id.as_deref(), entity.change_type))
        .collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            (Some("as-added"), ChangeType::Create),
            (Some("as-gone"), ChangeType::Delete),
            (Some("as-kept"), ChangeType::Update),
        ]
    );
}

#[test]
fn diff_artifact_round_trips_through_json() {
    let settings = GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 75.0 };
    let diff = build_diff(
        json!({"entities": [budget_entity("as-1", "meta", 100.0)]}),
        json!({"entities": [budget_entity("as-1", "meta", 140.0)]}),
        settings,
        "run-rt",
    );

    let encoded = serde_json::to_value(&diff).expect("encode");
    assert_eq!(encoded["run_id"], json!("run-rt"));
    assert_eq!(encoded["generation_mode"], json!("automated"));
    let decoded: AdPushDiff = serde_json::from_value(encoded).expect("decode");
    assert_eq!(decoded, diff);
}

#[test]
fn manifest_feeds_simulation_without_the_diff() {
    let settings = GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 75.0 };
    let baseline = json!({"entities": [
        budget_entity("as-up", "meta", 100.0),
        budget_entity("as-down", "google", 120.0),
    ]});
    let proposed = json!({"entities": [
        budget_entity("as-up", "meta", 160.0),
        budget_entity("as-down", "google", 40.0),
    ]});
    let diff = build_diff(baseline.clone(), proposed.clone(), settings, "run-sim");
    let manifest = RollbackManifest::from_diff(&diff, baseline, proposed, settings);

    let simulation = simulate(&manifest, Utc::now());
    assert_eq!(simulation.run_id, "run-sim");
    assert_eq!(simulation.action_count, 2);
    assert!(simulation.rollback_ready);
    assert!(simulation.rollback_recommended);
    assert_eq!(simulation.spend_summary.total_baseline_spend, 220.0);
    assert_eq!(simulation.spend_summary.total_proposed_spend, 200.0);
    assert_eq!(simulation.spend_summary.total_rollback_delta, 20.0);

    let raise_back = simulation
        .actions
        .iter()
        .find(|action| action.entity_id.as_deref() == Some("as-down"))
        .expect("lowered entity action");
    assert_eq!(raise_back.rollback_delta, 80.0);
    assert_eq!(raise_back.direction, ChangeDirection::Increase);
}
