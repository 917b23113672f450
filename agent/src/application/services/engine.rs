//! Application service: the reconciliation engine.
//!
//! Every public operation re-reads the native store; nothing is cached
//! between calls. Imports only from `crate::domain` and
//! `crate::application::ports`.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::application::ports::{NativeStore, Snapshot};
use crate::domain::error::SchedulerError;
use crate::domain::job::{self, DiscoveredJob, JobEntry};
use crate::domain::reconcile::{self, Operation, ReconcilePlan, ReconcileReport};

/// Tunables for [`ReconciliationEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Re-read the store before each write and refuse to commit if it
    /// changed since the read the write is based on.
    pub verify_before_write: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            verify_before_write: true,
        }
    }
}

/// What [`ReconciliationEngine::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    /// An entry with the same id was replaced in place.
    Updated,
    /// An identical entry was already installed; nothing was written.
    Unchanged,
}

impl AddOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// List/Add/Remove/Reconcile over a single native store.
pub struct ReconciliationEngine<S> {
    store: S,
    options: EngineOptions,
}

impl<S: NativeStore> ReconciliationEngine<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_options(store, EngineOptions::default())
    }

    #[must_use]
    pub fn with_options(store: S, options: EngineOptions) -> Self {
        Self { store, options }
    }

    /// Managed entries in the store's native order.
    ///
    /// # Errors
    ///
    /// Returns the store's read failure.
    pub async fn list(&self) -> Result<Vec<JobEntry>, SchedulerError> {
        Ok(self.read().await?.managed)
    }

    /// The managed entry with `id`, if installed.
    ///
    /// # Errors
    ///
    /// Returns the store's read failure.
    pub async fn get(&self, id: &str) -> Result<Option<JobEntry>, SchedulerError> {
        Ok(self.list().await?.into_iter().find(|e| e.id == id))
    }

    /// Install `entry`, replacing an installed entry with the same id in place.
    ///
    /// # Errors
    ///
    /// - `InvalidEntry` before any native command runs.
    /// - `Conflict` if the store already holds the id more than once.
    /// - `NativeRejection` with the native tool's diagnostic.
    pub async fn add(&self, entry: &JobEntry) -> Result<AddOutcome, SchedulerError> {
        self.upsert(entry, false).await
    }

    /// Remove every managed entry with `id`.
    ///
    /// Returns `false` (and writes nothing) when no such entry exists.
    ///
    /// # Errors
    ///
    /// `InvalidEntry` for an empty id, otherwise the store's failure.
    pub async fn remove(&self, id: &str) -> Result<bool, SchedulerError> {
        if id.is_empty() {
            return Err(SchedulerError::invalid(id, "id must not be empty"));
        }
        let snapshot = self.read().await?;
        if !snapshot.managed.iter().any(|e| e.id == id) {
            debug!(id, "nothing to remove");
            return Ok(false);
        }
        let managed: Vec<JobEntry> = snapshot
            .managed
            .iter()
            .filter(|e| e.id != id)
            .cloned()
            .collect();

        self.commit(&managed, &snapshot).await?;
        info!(id, store = self.store.name(), "removed job");
        Ok(true)
    }

    /// The changes [`reconcile`](Self::reconcile) would make. Read-only.
    ///
    /// # Errors
    ///
    /// Returns the store's read failure.
    pub async fn plan(&self, desired: &[JobEntry]) -> Result<ReconcilePlan, SchedulerError> {
        let current = self.list().await?;
        Ok(reconcile::plan(&current, desired))
    }

    /// Converge the managed set onto `desired`.
    ///
    /// Deletes are applied first, then updates, then creates. A failing
    /// entry is recorded in the report and the pass continues.
    ///
    /// # Errors
    ///
    /// Only for failures no entry can recover from: the initial read, or the
    /// native tool becoming unavailable mid-pass.
    pub async fn reconcile(&self, desired: &[JobEntry]) -> Result<ReconcileReport, SchedulerError> {
        let started_at = Utc::now();
        let plan = self.plan(desired).await?;
        for anomaly in &plan.anomalies {
            warn!(%anomaly, "reconcile anomaly");
        }
        let mut report = ReconcileReport::new(started_at, plan.anomalies.clone(), plan.unchanged);

        for id in &plan.delete {
            let result = self.remove(id).await.map(drop);
            settle(&mut report, id, Operation::Delete, result)?;
        }
        for entry in &plan.update {
            let result = self.upsert(entry, true).await.map(drop);
            settle(&mut report, &entry.id, Operation::Update, result)?;
        }
        for entry in &plan.create {
            let result = self.upsert(entry, true).await.map(drop);
            settle(&mut report, &entry.id, Operation::Create, result)?;
        }

        report.finished_at = Utc::now();
        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            unchanged = report.unchanged,
            failed = report.failures.len(),
            "reconcile finished"
        );
        Ok(report)
    }

    /// Foreign entries that look like jobs. Read-only.
    ///
    /// # Errors
    ///
    /// Returns the store's read failure.
    pub async fn discover(&self) -> Result<Vec<DiscoveredJob>, SchedulerError> {
        self.store.discover().await
    }

    /// Install `entry`. With `collapse`, an id managed more than once is
    /// rewritten as a single entry in the slot of its first copy.
    async fn upsert(&self, entry: &JobEntry, collapse: bool) -> Result<AddOutcome, SchedulerError> {
        job::validate_entry(entry)?;
        self.store.validate(entry)?;

        let snapshot = self.read().await?;
        let existing: Vec<usize> = snapshot
            .managed
            .iter()
            .enumerate()
            .filter_map(|(i, e)| (e.id == entry.id).then_some(i))
            .collect();

        let mut managed = snapshot.managed.clone();
        let outcome = match existing.as_slice() {
            [] => {
                managed.push(entry.clone());
                AddOutcome::Created
            }
            [i] if managed[*i].same_content(entry) => {
                debug!(id = %entry.id, "entry already installed");
                return Ok(AddOutcome::Unchanged);
            }
            [i] => {
                managed[*i] = entry.clone();
                AddOutcome::Updated
            }
            [first, ..] if collapse => {
                warn!(id = %entry.id, copies = existing.len(), "collapsing duplicate managed entries");
                managed[*first] = entry.clone();
                let mut index = 0;
                managed.retain(|e| {
                    let keep = index == *first || e.id != entry.id;
                    index += 1;
                    keep
                });
                AddOutcome::Updated
            }
            _ => {
                return Err(SchedulerError::Conflict {
                    id: entry.id.clone(),
                });
            }
        };

        self.commit(&managed, &snapshot).await?;
        info!(id = %entry.id, store = self.store.name(), ?outcome, "installed job");
        Ok(outcome)
    }

    async fn read(&self) -> Result<Snapshot<S::Layout>, SchedulerError> {
        let snapshot = self.store.read().await?;
        for line in &snapshot.ambiguous {
            warn!(store = self.store.name(), entry = %line, "entry mentions the ownership marker but is not managed; leaving it untouched");
        }
        Ok(snapshot)
    }

    async fn commit(
        &self,
        managed: &[JobEntry],
        base: &Snapshot<S::Layout>,
    ) -> Result<(), SchedulerError> {
        if self.options.verify_before_write {
            let current = self.store.read().await?;
            if current.layout != base.layout || current.managed != base.managed {
                warn!(store = self.store.name(), "native store changed since it was read");
                return Err(SchedulerError::ConcurrentModification);
            }
        }
        self.store.write(managed, base).await
    }
}

fn settle(
    report: &mut ReconcileReport,
    id: &str,
    operation: Operation,
    result: Result<(), SchedulerError>,
) -> Result<(), SchedulerError> {
    match result {
        Ok(()) => report.record(id, operation, Ok(())),
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            warn!(id, %operation, error = %err, "reconcile step failed");
            report.record(id, operation, Err(err.to_string()));
        }
    }
    Ok(())
}
