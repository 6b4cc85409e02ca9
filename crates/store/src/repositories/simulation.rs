use adpush_core::RollbackSimulation;
use tracing::info;

use super::RepositoryError;
use crate::store::JsonStore;

/// Persists rollback simulation artifacts per `(tenant_id, run_id)`.
pub struct SimulationRepository<'a, S: JsonStore> {
    store: &'a S,
}

impl<'a, S: JsonStore> SimulationRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn save(&self, simulation: &RollbackSimulation) -> Result<(), RepositoryError> {
        let document = serde_json::to_value(simulation)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        self.store.save(&simulation_key(&simulation.tenant_id, &simulation.run_id), &document)?;
        info!(
            event_name = "simulation.saved",
            tenant_id = %simulation.tenant_id,
            run_id = %simulation.run_id,
            action_count = simulation.action_count,
            "rollback simulation persisted"
        );
        Ok(())
    }

    pub fn load(
        &self,
        tenant_id: &str,
        run_id: &str,
    ) -> Result<Option<RollbackSimulation>, RepositoryError> {
        match self.store.load(&simulation_key(tenant_id, run_id))? {
            None => Ok(None),
            Some(document) => serde_json::from_value(document)
                .map(Some)
                .map_err(|error| RepositoryError::Decode(format!("rollback simulation: {error}"))),
        }
    }
}

fn simulation_key(tenant_id: &str, run_id: &str) -> String {
    format!("rollbacks/{tenant_id}/{run_id}.json")
}
