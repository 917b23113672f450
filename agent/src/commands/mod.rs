//! Command implementations

pub mod add;
pub mod config;
pub mod discover;
pub mod get;
pub mod list;
pub mod reconcile;
pub mod remove;
pub mod run;
pub mod version;
