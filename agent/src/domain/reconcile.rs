//! Reconciliation planning: diff a desired job set against managed entries.
//!
//! Pure functions only: no I/O, no async.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::job::JobEntry;

/// A data-quality issue noticed while planning. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// The desired set lists the same id more than once; the last one wins.
    DuplicateDesired { id: String, occurrences: usize },
    /// The native store holds the same managed id more than once.
    DuplicateManaged { id: String, occurrences: usize },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateDesired { id, occurrences } => write!(
                f,
                "desired job '{id}' appears {occurrences} times; using the last definition"
            ),
            Self::DuplicateManaged { id, occurrences } => write!(
                f,
                "managed job '{id}' is installed {occurrences} times in the native scheduler"
            ),
        }
    }
}

/// The mutations needed to converge managed entries onto a desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    /// Desired but not installed, in desired order.
    pub create: Vec<JobEntry>,
    /// Installed with a different schedule or command, in desired order.
    pub update: Vec<JobEntry>,
    /// Installed but no longer desired, in native order.
    pub delete: Vec<String>,
    pub unchanged: usize,
    pub anomalies: Vec<Anomaly>,
}

impl ReconcilePlan {
    /// Returns `true` if applying the plan would change the native store.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !(self.create.is_empty() && self.update.is_empty() && self.delete.is_empty())
            || self
                .anomalies
                .iter()
                .any(|a| matches!(a, Anomaly::DuplicateManaged { .. }))
    }
}

/// Compute the plan. Matching is by id only; names are ignored.
#[must_use]
pub fn plan(current: &[JobEntry], desired: &[JobEntry]) -> ReconcilePlan {
    let mut anomalies = Vec::new();

    let (desired, desired_counts) = dedupe_last_wins(desired);
    for (id, occurrences) in duplicates(&desired, &desired_counts) {
        anomalies.push(Anomaly::DuplicateDesired { id, occurrences });
    }

    let mut installed: HashMap<&str, &JobEntry> = HashMap::new();
    let mut installed_counts: HashMap<&str, usize> = HashMap::new();
    for entry in current {
        installed.entry(entry.id.as_str()).or_insert(entry);
        *installed_counts.entry(entry.id.as_str()).or_default() += 1;
    }
    let mut seen_managed = Vec::new();
    for entry in current {
        let count = installed_counts[entry.id.as_str()];
        if count > 1 && !seen_managed.contains(&entry.id) {
            seen_managed.push(entry.id.clone());
            anomalies.push(Anomaly::DuplicateManaged {
                id: entry.id.clone(),
                occurrences: count,
            });
        }
    }

    let mut out = ReconcilePlan {
        anomalies,
        ..ReconcilePlan::default()
    };
    for entry in &desired {
        match installed.get(entry.id.as_str()) {
            None => out.create.push(entry.clone()),
            // Duplicated ids are rewritten as one entry even when a copy matches.
            Some(existing)
                if existing.same_content(entry) && installed_counts[entry.id.as_str()] == 1 =>
            {
                out.unchanged += 1;
            }
            Some(_) => out.update.push(entry.clone()),
        }
    }
    for entry in current {
        let wanted = desired.iter().any(|d| d.id == entry.id);
        if !wanted && !out.delete.contains(&entry.id) {
            out.delete.push(entry.id.clone());
        }
    }
    out
}

/// Collapse duplicate ids, keeping the first position and the last definition.
fn dedupe_last_wins(desired: &[JobEntry]) -> (Vec<JobEntry>, HashMap<String, usize>) {
    let mut out: Vec<JobEntry> = Vec::with_capacity(desired.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in desired {
        *counts.entry(entry.id.clone()).or_default() += 1;
        if let Some(&i) = index.get(&entry.id) {
            out[i] = entry.clone();
        } else {
            index.insert(entry.id.clone(), out.len());
            out.push(entry.clone());
        }
    }
    (out, counts)
}

fn duplicates(order: &[JobEntry], counts: &HashMap<String, usize>) -> Vec<(String, usize)> {
    order
        .iter()
        .filter_map(|e| {
            let n = counts.get(&e.id).copied().unwrap_or(0);
            (n > 1).then(|| (e.id.clone(), n))
        })
        .collect()
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Which mutation an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// A single failed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub id: String,
    pub operation: Operation,
    pub error: String,
}

/// Aggregate outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: usize,
    pub failures: Vec<EntryFailure>,
    pub anomalies: Vec<Anomaly>,
}

impl ReconcileReport {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, anomalies: Vec<Anomaly>, unchanged: usize) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            unchanged,
            failures: Vec::new(),
            anomalies,
        }
    }

    /// Record the outcome of one mutation.
    pub fn record(&mut self, id: &str, operation: Operation, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => match operation {
                Operation::Create => self.created.push(id.to_string()),
                Operation::Update => self.updated.push(id.to_string()),
                Operation::Delete => self.deleted.push(id.to_string()),
            },
            Err(error) => self.failures.push(EntryFailure {
                id: id.to_string(),
                operation,
                error,
            }),
        }
    }

    /// Number of mutations applied successfully.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
