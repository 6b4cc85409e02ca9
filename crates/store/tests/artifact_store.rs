use adpush_core::{
    normalize_payload, DiffBuilder, DiffRequest, GuardrailBreach, GuardrailSettings,
    GuardrailSeverity, RollbackManifest,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use adpush_store::{
    AlertHistoryRepository, DiffHistoryRepository, FileStore, JsonStore, ManifestRepository,
    RepositoryError, SimulationRepository,
};

fn manifest(run_id: &str, severity: GuardrailSeverity) -> RollbackManifest {
    RollbackManifest {
        run_id: run_id.to_string(),
        tenant_id: "acme".to_string(),
        generated_at: Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap(),
        baseline: json!({"entities": []}),
        proposed: json!({"entities": []}),
        guardrails: GuardrailSettings::default(),
        guardrail_breaches: vec![GuardrailBreach::new(
            "spend_below_minimum",
            severity,
            "spend below minimum",
            Some(75.0),
            Some(20.0),
        )],
        notes: vec!["allocator v3".to_string()],
    }
}

fn sample_diff(run_id: &str) -> adpush_core::AdPushDiff {
    let baseline = normalize_payload(&json!({"entities": [{
        "entity_type": "campaign",
        "entity_id": "c-1",
        "sections": {"spend": {"daily_budget": {
            "kind": "numeric", "unit": "usd", "value": 100.0
        }}}
    }]}))
    .expect("baseline");
    let proposed = normalize_payload(&json!({"entities": [{
        "entity_type": "campaign",
        "entity_id": "c-1",
        "sections": {"spend": {"daily_budget": {
            "kind": "numeric", "unit": "usd", "value": 140.0
        }}}
    }]}))
    .expect("proposed");

    DiffBuilder::new(GuardrailSettings { max_daily_budget_delta_pct: 15.0, min_daily_spend: 0.0 })
        .build(
            &baseline,
            &proposed,
            DiffRequest {
                tenant_id: "acme".to_string(),
                run_id: run_id.to_string(),
                generation_mode: "automated".to_string(),
                generated_at: Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap(),
                window_start: None,
                window_end: None,
                notes: Vec::new(),
                source_plan_id: None,
            },
        )
}

#[test]
fn manifest_round_trips_and_keeps_a_latest_copy() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());
    let repository = ManifestRepository::new(&store);

    let original = manifest("run-1", GuardrailSeverity::Critical);
    repository.save(&original).expect("save");

    let loaded = repository.load("acme", "run-1").expect("load");
    assert_eq!(loaded, original);

    let latest = repository.load_latest("acme").expect("latest");
    assert_eq!(latest, original);
}

#[test]
fn stored_manifest_record_carries_derived_fields() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());
    ManifestRepository::new(&store)
        .save(&manifest("run-1", GuardrailSeverity::Critical))
        .expect("save");

    let record = store.load("manifests/acme/run-1.json").expect("load").expect("record");
    assert_eq!(record["rollback_recommended"], json!(true));
    assert_eq!(record["critical_guardrail_codes"], json!(["spend_below_minimum"]));
}

#[test]
fn missing_manifest_is_a_not_found_error() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());
    let error = ManifestRepository::new(&store).load("acme", "run-404").unwrap_err();
    assert!(matches!(
        error,
        RepositoryError::ManifestNotFound { ref tenant_id, ref run_id }
            if tenant_id == "acme" && run_id == "run-404"
    ));
}

#[test]
fn alert_history_appends_only_critical_manifests() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());
    let repository = AlertHistoryRepository::new(&store);

    let recorded = repository
        .record_manifest(&manifest("run-1", GuardrailSeverity::Critical))
        .expect("record");
    assert!(recorded.is_some());

    let skipped = repository
        .record_manifest(&manifest("run-2", GuardrailSeverity::Warning))
        .expect("record");
    assert!(skipped.is_none());

    let history = repository.history().expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].run_id, "run-1");
}

#[test]
fn alert_history_is_bounded_and_most_recent_first() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());
    let repository = AlertHistoryRepository::with_capacity(&store, 2);

    for run_id in ["run-1", "run-2", "run-3"] {
        repository
            .record_manifest(&manifest(run_id, GuardrailSeverity::Critical))
            .expect("record");
    }

    let runs: Vec<String> = repository
        .history()
        .expect("history")
        .into_iter()
        .map(|alert| alert.run_id)
        .collect();
    assert_eq!(runs, vec!["run-3".to_string(), "run-2".to_string()]);
}

#[test]
fn diff_artifacts_round_trip_with_history_index() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());
    let repository = DiffHistoryRepository::new(&store);

    let diff = sample_diff("run-1");
    repository.save(&diff).expect("save");

    let loaded = repository.load("acme", "run-1").expect("load").expect("artifact");
    assert_eq!(loaded, diff);

    let history = repository.history().expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].run_id, "run-1");
    assert_eq!(history[0].entity_count, 1);
    assert_eq!(history[0].breach_count, diff.guardrails.len());
}

#[test]
fn diff_history_index_is_bounded() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());
    let repository = DiffHistoryRepository::with_capacity(&store, 2);

    for run_id in ["run-1", "run-2", "run-3"] {
        repository.save(&sample_diff(run_id)).expect("save");
    }

    let runs: Vec<String> =
        repository.history().expect("history").into_iter().map(|entry| entry.run_id).collect();
    assert_eq!(runs, vec!["run-3".to_string(), "run-2".to_string()]);
}

#[test]
fn simulation_artifacts_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileStore::new(dir.path());

    let source = manifest("run-1", GuardrailSeverity::Critical);
    let simulation = adpush_core::simulate(&source, Utc.with_ymd_and_hms(2026, 8, 29, 13, 0, 0).unwrap());

    let repository = SimulationRepository::new(&store);
    repository.save(&simulation).expect("save");
    let loaded = repository.load("acme", "run-1").expect("load").expect("artifact");
    assert_eq!(loaded, simulation);
}
