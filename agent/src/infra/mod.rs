//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! native scheduler adapters, config file and manifest directory access.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod crontab;
pub mod manifests;
pub mod task_scheduler;

pub use command_runner::TokioCommandRunner;
pub use config::YamlConfigStore;
pub use crontab::CrontabStore;
pub use task_scheduler::TaskSchedulerStore;
