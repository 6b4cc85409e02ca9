use adpush_core::RollbackManifest;
use serde_json::{json, Value};
use tracing::info;

use super::RepositoryError;
use crate::store::JsonStore;

/// Persists rollback manifests keyed by `(tenant_id, run_id)`, with a
/// `latest.json` convenience copy per tenant.
pub struct ManifestRepository<'a, S: JsonStore> {
    store: &'a S,
}

impl<'a, S: JsonStore> ManifestRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn save(&self, manifest: &RollbackManifest) -> Result<(), RepositoryError> {
        let record = manifest_record(manifest)?;
        let key = manifest_key(&manifest.tenant_id, &manifest.run_id);
        self.store.save(&key, &record)?;
        self.store.save(&latest_key(&manifest.tenant_id), &record)?;
        info!(
            event_name = "manifest.saved",
            tenant_id = %manifest.tenant_id,
            run_id = %manifest.run_id,
            rollback_recommended = manifest.rollback_recommended(),
            "rollback manifest persisted"
        );
        Ok(())
    }

    pub fn load(&self, tenant_id: &str, run_id: &str) -> Result<RollbackManifest, RepositoryError> {
        let record = self.store.load(&manifest_key(tenant_id, run_id))?.ok_or_else(|| {
            RepositoryError::ManifestNotFound {
                tenant_id: tenant_id.to_string(),
                run_id: run_id.to_string(),
            }
        })?;
        decode_manifest(record)
    }

    pub fn load_latest(&self, tenant_id: &str) -> Result<RollbackManifest, RepositoryError> {
        let record = self.store.load(&latest_key(tenant_id))?.ok_or_else(|| {
            RepositoryError::ManifestNotFound {
                tenant_id: tenant_id.to_string(),
                run_id: "latest".to_string(),
            }
        })?;
        decode_manifest(record)
    }
}

fn manifest_key(tenant_id: &str, run_id: &str) -> String {
    format!("manifests/{tenant_id}/{run_id}.json")
}

fn latest_key(tenant_id: &str) -> String {
    format!("manifests/{tenant_id}/latest.json")
}

/// Stored shape is the manifest plus derived fields, so readers that do
/// not want to recompute the recommendation can read it directly.
fn manifest_record(manifest: &RollbackManifest) -> Result<Value, RepositoryError> {
    let mut record = serde_json::to_value(manifest)
        .map_err(|error| RepositoryError::Encode(error.to_string()))?;
    record["rollback_recommended"] = json!(manifest.rollback_recommended());
    record["critical_guardrail_codes"] = json!(manifest.critical_guardrail_codes());
    Ok(record)
}

fn decode_manifest(record: Value) -> Result<RollbackManifest, RepositoryError> {
    serde_json::from_value(record)
        .map_err(|error| RepositoryError::Decode(format!("rollback manifest: {error}")))
}
