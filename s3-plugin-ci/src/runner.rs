//! Invocation of the plugin test suite.
//!
//! The suite runs as a child process, normally as the iRODS service account.  Its combined
//! stdout and stderr are copied line by line to our stdout and to the test output log.  The
//! result is the exit status of the test process itself.
use crate::error::{self, Result};
use crate::Config;
use snafu::prelude::*;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Exit status of a test run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestRunOutcome {
    /// `None` if the test process was terminated by a signal
    pub code: Option<i32>,
}

impl TestRunOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestRunner {
    /// Shell command line that runs the tests
    command: String,

    /// User to run the command as, via `sudo su -`.  If `None` the command is run directly.
    run_as: Option<String>,

    working_dir: PathBuf,

    log_path: PathBuf,
}

impl TestRunner {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            run_as: None,
            working_dir: working_dir.into(),
            log_path: log_path.into(),
        }
    }

    /// The iRODS test runner invocation described by `config`
    pub fn from_config(config: &Config) -> Self {
        let runner = Self::new(
            format!(
                "python3 scripts/run_tests.py --xml_output --run_s {}",
                config.test
            ),
            &config.irods_home,
            config.test_log_path(),
        );

        match config.run_as() {
            Some(user) => runner.run_as(user),
            None => runner,
        }
    }

    pub fn run_as(mut self, user: impl Into<String>) -> Self {
        self.run_as = Some(user.into());
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// The full command line of the test process
    pub fn argv(&self) -> Vec<String> {
        match &self.run_as {
            Some(user) => vec![
                "sudo".to_string(),
                "su".to_string(),
                "-".to_string(),
                user.clone(),
                "-c".to_string(),
                self.command.clone(),
            ],
            None => vec!["sh".to_string(), "-c".to_string(), self.command.clone()],
        }
    }

    /// Run the tests and report the exit status, whatever it is.
    ///
    /// Fails only if the test process couldn't be started or its output couldn't be logged.
    #[instrument(skip(self), fields(command = %self.command, user = ?self.run_as))]
    pub async fn run(&self) -> Result<TestRunOutcome> {
        if let Some(log_dir) = self.log_path.parent() {
            tokio::fs::create_dir_all(log_dir)
                .await
                .context(error::OpenTestLogSnafu {
                    path: self.log_path.clone(),
                })?;
        }

        let mut log = std::fs::File::create(&self.log_path).context(error::OpenTestLogSnafu {
            path: self.log_path.clone(),
        })?;

        let argv = self.argv();
        let command = crate::command::display_argv(&argv);

        info!(%command, log = %self.log_path.display(), "Running tests");

        let handle = crate::command::expression(&argv)?
            .dir(&self.working_dir)
            .stderr_to_stdout()
            .unchecked()
            .reader()
            .context(error::SpawnCommandSnafu {
                command: command.clone(),
            })?;

        let log_path = self.log_path.clone();
        let code = tokio::task::spawn_blocking(move || {
            let tee_context = || error::TeeOutputSnafu {
                path: log_path.clone(),
            };

            let stdout = std::io::stdout();
            let bytes = tee(BufReader::new(&handle), &mut log, &mut stdout.lock())
                .with_context(|_| tee_context())?;

            debug!(bytes, "Test output complete");

            // Reading to EOF has already waited for the child
            match handle.try_wait().with_context(|_| tee_context())? {
                Some(output) => Ok(output.status.code()),
                None => {
                    warn!("Test process output ended but the process is still running; killing it");
                    handle.kill().with_context(|_| tee_context())?;
                    Ok(None)
                }
            }
        })
        .await
        .context(error::BlockingTaskSnafu)??;

        let outcome = TestRunOutcome { code };

        info!(?outcome, "Test run finished");

        Ok(outcome)
    }

    /// Run the tests, failing with [`crate::HookError::TestsFailed`] unless they pass
    pub async fn run_checked(&self) -> Result<TestRunOutcome> {
        let outcome = self.run().await?;

        ensure!(
            outcome.success(),
            error::TestsFailedSnafu { code: outcome.code }
        );

        Ok(outcome)
    }
}

/// Copy `reader` to both `log` and `console`, a line at a time so the console shows progress
/// as it happens.  Returns the number of bytes copied.
fn tee(mut reader: impl BufRead, log: &mut impl Write, console: &mut impl Write) -> std::io::Result<u64> {
    let mut line = Vec::new();
    let mut total = 0u64;

    loop {
        line.clear();

        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }

        console.write_all(&line)?;
        console.flush()?;
        log.write_all(&line)?;

        total += read as u64;
    }

    log.flush()?;

    Ok(total)
}
