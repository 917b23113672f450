//! Windows native store: one Task Scheduler task per managed job, kept in a
//! dedicated folder and driven through `schtasks`.

use std::io::Write;

use tracing::{debug, warn};

use crate::application::ports::{CommandRunner, NativeStore, Snapshot};
use crate::domain::config::DEFAULT_TASK_FOLDER;
use crate::domain::error::{CommandError, SchedulerError};
use crate::domain::job::{DiscoveredJob, JobEntry};
use crate::domain::marker;
use crate::domain::task::{self, SYSTEM_FOLDER};

pub const SCHTASKS: &str = "schtasks";

/// Schedule shown for discovered tasks that carry no schedule text.
const NATIVE_TRIGGERS: &str = "(native triggers)";

/// Task paths in the managed folder, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFolder {
    pub paths: Vec<String>,
}

pub struct TaskSchedulerStore<R> {
    runner: R,
    folder: String,
}

impl<R: CommandRunner> TaskSchedulerStore<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self::with_folder(runner, DEFAULT_TASK_FOLDER)
    }

    #[must_use]
    pub fn with_folder(runner: R, folder: impl Into<String>) -> Self {
        Self {
            runner,
            folder: folder.into(),
        }
    }

    async fn all_paths(&self) -> Result<Vec<String>, SchedulerError> {
        let out = self
            .runner
            .run(SCHTASKS, &["/Query", "/FO", "CSV", "/NH"])
            .await?;
        Ok(task::parse_task_list(&task::decode_native_text(&out)))
    }

    async fn query(&self, path: &str) -> Result<task::TaskDefinition, SchedulerError> {
        let out = self
            .runner
            .run(SCHTASKS, &["/Query", "/TN", path, "/XML"])
            .await?;
        task::parse_task_xml(&task::decode_native_text(&out))
    }

    async fn delete(&self, id: &str) -> Result<(), SchedulerError> {
        let path = task::task_path(&self.folder, id);
        match self
            .runner
            .run(SCHTASKS, &["/Delete", "/TN", &path, "/F"])
            .await
        {
            Ok(_) => Ok(()),
            Err(CommandError::NonZeroExit { output, .. })
                if output.to_ascii_lowercase().contains("cannot find") =>
            {
                debug!(%path, "task already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, entry: &JobEntry) -> Result<(), SchedulerError> {
        let path = task::task_path(&self.folder, &entry.id);
        let xml = task::render_task_xml(entry)?;
        let mut file = tempfile::Builder::new()
            .prefix("crontopus-")
            .suffix(".xml")
            .tempfile()
            .map_err(|e| SchedulerError::Malformed(format!("cannot create task file: {e}")))?;
        file.write_all(&task::to_utf16_file(&xml))
            .and_then(|()| file.flush())
            .map_err(|e| SchedulerError::Malformed(format!("cannot write task file: {e}")))?;
        let file_path = file.path().to_string_lossy().into_owned();
        self.runner
            .run(SCHTASKS, &["/Create", "/TN", &path, "/XML", &file_path, "/F"])
            .await?;
        Ok(())
    }
}

impl<R: CommandRunner> NativeStore for TaskSchedulerStore<R> {
    type Layout = TaskFolder;

    fn name(&self) -> &'static str {
        "task-scheduler"
    }

    fn validate(&self, entry: &JobEntry) -> Result<(), SchedulerError> {
        task::check_roundtrip(entry)
    }

    async fn read(&self) -> Result<Snapshot<TaskFolder>, SchedulerError> {
        let mut snapshot = Snapshot {
            managed: Vec::new(),
            layout: TaskFolder::default(),
            ambiguous: Vec::new(),
        };
        for path in self.all_paths().await? {
            let Some(leaf) = task::leaf_in_folder(&path, &self.folder) else {
                continue;
            };
            snapshot.layout.paths.push(path.clone());
            let definition = match self.query(&path).await {
                Ok(definition) => definition,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(%path, error = %e, "cannot read task; treating it as unmanaged");
                    snapshot.ambiguous.push(path.clone());
                    continue;
                }
            };
            if let Some(entry) = definition.to_managed_entry(leaf) {
                snapshot.managed.push(entry);
            } else if definition
                .source
                .as_deref()
                .is_some_and(marker::resembles_marker)
            {
                snapshot.ambiguous.push(path.clone());
            }
        }
        Ok(snapshot)
    }

    async fn write(
        &self,
        managed: &[JobEntry],
        base: &Snapshot<TaskFolder>,
    ) -> Result<(), SchedulerError> {
        if let Some((installed, clash)) = task::case_collision(managed) {
            return Err(SchedulerError::invalid(
                clash,
                format!("id differs from '{installed}' only in letter case; task names are case-insensitive"),
            ));
        }
        for old in &base.managed {
            if !managed.iter().any(|e| e.id == old.id) {
                self.delete(&old.id).await?;
            }
        }
        for entry in managed {
            if !base.managed.contains(entry) {
                self.create(entry).await?;
            }
        }
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<DiscoveredJob>, SchedulerError> {
        let mut found = Vec::new();
        for path in self.all_paths().await? {
            if task::leaf_in_folder(&path, &self.folder).is_some()
                || path
                    .get(..SYSTEM_FOLDER.len())
                    .is_some_and(|p| p.eq_ignore_ascii_case(SYSTEM_FOLDER))
            {
                continue;
            }
            match self.query(&path).await {
                Ok(definition) => found.push(DiscoveredJob {
                    schedule: definition
                        .documentation
                        .filter(|d| !d.is_empty())
                        .unwrap_or_else(|| NATIVE_TRIGGERS.to_string()),
                    command: definition.command,
                    name: path,
                }),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!(%path, error = %e, "skipping unreadable task"),
            }
        }
        Ok(found)
    }
}
