pub mod alerts;
pub mod diff;
pub mod domain;
pub mod errors;
pub mod guardrails;
pub mod history;
pub mod normalizer;
pub mod numeric;
pub mod rollback;
pub mod spend;

pub use alerts::{AlertRecorder, DEFAULT_ALERT_HISTORY_CAPACITY};
pub use diff::{DiffBuilder, DiffRequest};
pub use domain::diff::{
    AdPushDiff, ChangeDirection, ChangeType, EntityDiff, FieldChange, SectionDiff, SummaryMetric,
};
pub use domain::entity::{EntityType, FieldKind, NormalisedField, NormalisedNode, SectionType};
pub use domain::guardrail::{GuardrailBreach, GuardrailSettings, GuardrailSeverity};
pub use domain::rollback::{AutomationAlert, RollbackAction, RollbackManifest};
pub use domain::spend::{
    SpendGuardrailPlatformReport, SpendGuardrailReport, SpendGuardrailTotals,
};
pub use errors::DomainError;
pub use guardrails::evaluate_field;
pub use history::BoundedHistory;
pub use normalizer::normalize_payload;
pub use rollback::{simulate, GuardrailSummary, RollbackSimulation, RollbackSpendSummary};
pub use spend::SpendGuardrailAggregator;
