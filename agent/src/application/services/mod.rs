//! Application services: use-case orchestration.
//!
//! Services import only from `crate::domain` and `crate::application::ports`
//! and never from `crate::infra`, `crate::commands`, or `crate::output`.

pub mod engine;
pub mod serialized;

pub use engine::{AddOutcome, EngineOptions, ReconciliationEngine};
pub use serialized::SerializedEngine;
