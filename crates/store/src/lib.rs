pub mod repositories;
pub mod store;

pub use repositories::alerts::AlertHistoryRepository;
pub use repositories::diff_history::{
    DiffHistoryEntry, DiffHistoryRepository, DEFAULT_DIFF_HISTORY_CAPACITY,
};
pub use repositories::manifest::ManifestRepository;
pub use repositories::simulation::SimulationRepository;
pub use repositories::RepositoryError;
pub use store::{FileStore, JsonStore, StoreError};
