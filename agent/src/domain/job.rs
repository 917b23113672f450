//! Store-independent validation of job entries.
//!
//! Pure functions only: no I/O, no async.

pub use crontopus_common::{DiscoveredJob, JobEntry};

use crate::domain::error::SchedulerError;
use crate::domain::marker::{self, MARKER_KEYWORD};

/// Validate an entry before any native tool is invoked.
///
/// Schedule syntax is left to the native tool; only shape constraints that
/// would break the single-line native encoding are checked here.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidEntry` describing the first violation.
pub fn validate_entry(entry: &JobEntry) -> Result<(), SchedulerError> {
    marker::encode(&entry.id)?;
    check_field(&entry.id, "schedule", &entry.schedule)?;
    check_field(&entry.id, "command", &entry.command)?;
    if entry.command.contains(MARKER_KEYWORD) {
        return Err(SchedulerError::invalid(
            &entry.id,
            format!("command must not contain the reserved word {MARKER_KEYWORD}"),
        ));
    }
    if entry.name.contains(['\n', '\r']) {
        return Err(SchedulerError::invalid(&entry.id, "name must be a single line"));
    }
    Ok(())
}

fn check_field(id: &str, field: &str, value: &str) -> Result<(), SchedulerError> {
    if value.trim().is_empty() {
        return Err(SchedulerError::invalid(id, format!("{field} must not be empty")));
    }
    if value.contains(['\n', '\r']) {
        return Err(SchedulerError::invalid(id, format!("{field} must be a single line")));
    }
    if value.trim() != value {
        return Err(SchedulerError::invalid(
            id,
            format!("{field} must not have leading or trailing whitespace"),
        ));
    }
    Ok(())
}
