use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use adpush_core::{
    normalize_payload, DiffBuilder, DiffRequest, GuardrailSettings, RollbackManifest,
};
use adpush_store::{
    AlertHistoryRepository, DiffHistoryRepository, FileStore, ManifestRepository,
};

use super::CommandResult;

#[derive(Debug, Clone)]
pub struct DiffArgs {
    pub baseline: PathBuf,
    pub proposed: PathBuf,
    pub guardrails: Option<PathBuf>,
    pub tenant_id: String,
    pub run_id: String,
    pub mode: String,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub notes: Vec<String>,
    pub source_plan_id: Option<String>,
    pub store_dir: PathBuf,
}

/// Builds the diff for one automation run, persists the diff artifact
/// and rollback manifest, and records an alert when the run breaches a
/// critical guardrail.
pub fn run(args: DiffArgs) -> CommandResult {
    let baseline = match read_json(&args.baseline) {
        Ok(value) => value,
        Err(error) => return CommandResult::failure("diff", "baseline_read", format!("{error:#}"), 2),
    };
    let proposed = match read_json(&args.proposed) {
        Ok(value) => value,
        Err(error) => return CommandResult::failure("diff", "proposed_read", format!("{error:#}"), 3),
    };

    let settings = match &args.guardrails {
        None => GuardrailSettings::default(),
        Some(path) => {
            let raw = match read_json(path) {
                Ok(value) => value,
                Err(error) => {
                    return CommandResult::failure("diff", "guardrails_read", format!("{error:#}"), 4)
                }
            };
            match GuardrailSettings::from_value(&raw) {
                Ok(settings) => settings,
                Err(error) => {
                    return CommandResult::failure("diff", "guardrails_parse", error.to_string(), 4)
                }
            }
        }
    };

    let baseline_nodes = match normalize_payload(&baseline) {
        Ok(nodes) => nodes,
        Err(error) => {
            return CommandResult::failure("diff", "baseline_normalize", error.to_string(), 5)
        }
    };
    let proposed_nodes = match normalize_payload(&proposed) {
        Ok(nodes) => nodes,
        Err(error) => {
            return CommandResult::failure("diff", "proposed_normalize", error.to_string(), 5)
        }
    };

    let diff = DiffBuilder::new(settings).build(
        &baseline_nodes,
        &proposed_nodes,
        DiffRequest {
            tenant_id: args.tenant_id.clone(),
            run_id: args.run_id.clone(),
            generation_mode: args.mode.clone(),
            generated_at: Utc::now(),
            window_start: args.window_start,
            window_end: args.window_end,
            notes: args.notes.clone(),
            source_plan_id: args.source_plan_id.clone(),
        },
    );
    let manifest = RollbackManifest::from_diff(&diff, baseline, proposed, settings);

    let store = FileStore::new(&args.store_dir);
    if let Err(error) = DiffHistoryRepository::new(&store).save(&diff) {
        return CommandResult::failure("diff", "diff_persist", error.to_string(), 6);
    }
    if let Err(error) = ManifestRepository::new(&store).save(&manifest) {
        return CommandResult::failure("diff", "manifest_persist", error.to_string(), 6);
    }
    let alert = match AlertHistoryRepository::new(&store).record_manifest(&manifest) {
        Ok(alert) => alert,
        Err(error) => return CommandResult::failure("diff", "alert_persist", error.to_string(), 6),
    };

    CommandResult::success(json!({
        "command": "diff",
        "status": "ok",
        "run_id": diff.run_id,
        "tenant_id": diff.tenant_id,
        "entities_changed": diff.entities.len(),
        "guardrail_breaches": diff.guardrails.len(),
        "critical_breaches": diff.critical_breach_count(),
        "rollback_recommended": manifest.rollback_recommended(),
        "alert_recorded": alert.is_some(),
        "artifacts": {
            "diff": format!("diffs/{}/{}.json", diff.tenant_id, diff.run_id),
            "manifest": format!("manifests/{}/{}.json", diff.tenant_id, diff.run_id),
        },
    }))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid json", path.display()))
}
