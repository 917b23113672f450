//! Application service: serialized access to one engine.
//!
//! Every trigger in the agent (timer ticks, manual signals, administrative
//! commands) goes through a [`SerializedEngine`] so no two operations run
//! against the same native store at once.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::application::ports::NativeStore;
use crate::application::services::engine::{AddOutcome, ReconciliationEngine};
use crate::domain::error::SchedulerError;
use crate::domain::job::{DiscoveredJob, JobEntry};
use crate::domain::reconcile::{ReconcilePlan, ReconcileReport};

/// A cloneable handle that serializes calls into a [`ReconciliationEngine`].
pub struct SerializedEngine<S> {
    inner: Arc<Mutex<ReconciliationEngine<S>>>,
}

impl<S> Clone for SerializedEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: NativeStore> SerializedEngine<S> {
    #[must_use]
    pub fn new(engine: ReconciliationEngine<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// # Errors
    ///
    /// See [`ReconciliationEngine::list`].
    pub async fn list(&self) -> Result<Vec<JobEntry>, SchedulerError> {
        self.inner.lock().await.list().await
    }

    /// # Errors
    ///
    /// See [`ReconciliationEngine::get`].
    pub async fn get(&self, id: &str) -> Result<Option<JobEntry>, SchedulerError> {
        self.inner.lock().await.get(id).await
    }

    /// # Errors
    ///
    /// See [`ReconciliationEngine::add`].
    pub async fn add(&self, entry: &JobEntry) -> Result<AddOutcome, SchedulerError> {
        self.inner.lock().await.add(entry).await
    }

    /// # Errors
    ///
    /// See [`ReconciliationEngine::remove`].
    pub async fn remove(&self, id: &str) -> Result<bool, SchedulerError> {
        self.inner.lock().await.remove(id).await
    }

    /// # Errors
    ///
    /// See [`ReconciliationEngine::plan`].
    pub async fn plan(&self, desired: &[JobEntry]) -> Result<ReconcilePlan, SchedulerError> {
        self.inner.lock().await.plan(desired).await
    }

    /// # Errors
    ///
    /// See [`ReconciliationEngine::reconcile`].
    pub async fn reconcile(&self, desired: &[JobEntry]) -> Result<ReconcileReport, SchedulerError> {
        self.inner.lock().await.reconcile(desired).await
    }

    /// Reconcile only when the plan shows drift, holding the lock across
    /// both steps. Returns `None` when already converged.
    ///
    /// # Errors
    ///
    /// See [`ReconciliationEngine::reconcile`].
    pub async fn reconcile_if_drifted(
        &self,
        desired: &[JobEntry],
    ) -> Result<Option<ReconcileReport>, SchedulerError> {
        let engine = self.inner.lock().await;
        let plan = engine.plan(desired).await?;
        if !plan.has_drift() {
            debug!(unchanged = plan.unchanged, "no drift; skipping reconcile");
            return Ok(None);
        }
        engine.reconcile(desired).await.map(Some)
    }

    /// # Errors
    ///
    /// See [`ReconciliationEngine::discover`].
    pub async fn discover(&self) -> Result<Vec<DiscoveredJob>, SchedulerError> {
        self.inner.lock().await.discover().await
    }
}
