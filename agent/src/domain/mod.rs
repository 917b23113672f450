//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod crontab;
pub mod error;
pub mod job;
pub mod marker;
pub mod reconcile;
pub mod task;

pub use config::{AgentConfig, SchedulerBackend};
pub use error::{CommandError, ConfigError, SchedulerError};
pub use job::{DiscoveredJob, JobEntry};
pub use reconcile::{Anomaly, ReconcilePlan, ReconcileReport};
