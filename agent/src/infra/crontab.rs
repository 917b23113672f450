//! Unix native store: the user's crontab, read with `crontab -l` and
//! replaced whole with `crontab -`.

use tracing::debug;

use crate::application::ports::{CommandRunner, NativeStore, Snapshot};
use crate::domain::config::DEFAULT_CRONTAB_PROGRAM;
use crate::domain::crontab::{self, CrontabTable};
use crate::domain::error::{CommandError, SchedulerError};
use crate::domain::job::{DiscoveredJob, JobEntry};

pub struct CrontabStore<R> {
    runner: R,
    program: String,
}

impl<R: CommandRunner> CrontabStore<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self::with_program(runner, DEFAULT_CRONTAB_PROGRAM)
    }

    #[must_use]
    pub fn with_program(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    async fn read_text(&self) -> Result<String, SchedulerError> {
        match self.runner.run(&self.program, &["-l"]).await {
            Ok(bytes) => String::from_utf8(bytes).map_err(|_| {
                SchedulerError::Malformed("crontab is not valid UTF-8; refusing to rewrite it".to_string())
            }),
            Err(CommandError::NonZeroExit { code: 1, output, .. })
                if output.to_ascii_lowercase().contains("no crontab") =>
            {
                debug!("no crontab installed yet");
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: CommandRunner> NativeStore for CrontabStore<R> {
    type Layout = CrontabTable;

    fn name(&self) -> &'static str {
        "crontab"
    }

    fn validate(&self, entry: &JobEntry) -> Result<(), SchedulerError> {
        crontab::check_roundtrip(entry)
    }

    async fn read(&self) -> Result<Snapshot<CrontabTable>, SchedulerError> {
        let parsed = crontab::parse(&self.read_text().await?);
        Ok(Snapshot {
            managed: parsed.managed,
            layout: parsed.table,
            ambiguous: parsed.ambiguous,
        })
    }

    async fn write(
        &self,
        managed: &[JobEntry],
        base: &Snapshot<CrontabTable>,
    ) -> Result<(), SchedulerError> {
        let text = crontab::render(&base.layout, managed)?;
        debug!(lines = text.lines().count(), "installing crontab");
        self.runner
            .run_with_stdin(&self.program, &["-"], text.as_bytes())
            .await?;
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<DiscoveredJob>, SchedulerError> {
        let parsed = crontab::parse(&self.read_text().await?);
        Ok(crontab::discover(&parsed.table))
    }
}
