use std::path::PathBuf;

use chrono::Utc;
use serde_json::json;

use adpush_core::simulate;
use adpush_store::{FileStore, ManifestRepository, RepositoryError, SimulationRepository};

use super::CommandResult;

#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub tenant_id: String,
    /// When absent, the tenant's latest manifest is simulated.
    pub run_id: Option<String>,
    pub store_dir: PathBuf,
}

/// Re-derives the rollback actions for a persisted manifest and writes
/// the simulation artifact next to it.
pub fn run(args: SimulateArgs) -> CommandResult {
    let store = FileStore::new(&args.store_dir);
    let manifests = ManifestRepository::new(&store);

    let manifest = match &args.run_id {
        Some(run_id) => manifests.load(&args.tenant_id, run_id),
        None => manifests.load_latest(&args.tenant_id),
    };
    let manifest = match manifest {
        Ok(manifest) => manifest,
        Err(error @ RepositoryError::ManifestNotFound { .. }) => {
            return CommandResult::failure("simulate", "manifest_not_found", error.to_string(), 2)
        }
        Err(error) => {
            return CommandResult::failure("simulate", "manifest_load", error.to_string(), 3)
        }
    };

    let simulation = simulate(&manifest, Utc::now());
    if let Err(error) = SimulationRepository::new(&store).save(&simulation) {
        return CommandResult::failure("simulate", "simulation_persist", error.to_string(), 4);
    }

    let simulation_json = match serde_json::to_value(&simulation) {
        Ok(value) => value,
        Err(error) => {
            return CommandResult::failure("simulate", "simulation_encode", error.to_string(), 5)
        }
    };

    CommandResult::success(json!({
        "command": "simulate",
        "status": "ok",
        "tenant_id": simulation.tenant_id,
        "run_id": simulation.run_id,
        "rollback_ready": simulation.rollback_ready,
        "rollback_recommended": simulation.rollback_recommended,
        "action_count": simulation.action_count,
        "artifact": format!("rollbacks/{}/{}.json", simulation.tenant_id, simulation.run_id),
        "simulation": simulation_json,
    }))
}
