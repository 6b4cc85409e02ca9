pub mod diff;
pub mod entity;
pub mod guardrail;
pub mod rollback;
pub mod spend;
