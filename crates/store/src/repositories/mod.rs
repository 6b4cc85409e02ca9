pub mod alerts;
pub mod diff_history;
pub mod manifest;
pub mod simulation;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no rollback manifest stored for tenant {tenant_id} run {run_id}")]
    ManifestNotFound { tenant_id: String, run_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored artifact could not be decoded: {0}")]
    Decode(String),
    #[error("artifact could not be encoded: {0}")]
    Encode(String),
}
