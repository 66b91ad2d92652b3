//! Long-running child processes that must not outlive the hook
use crate::command::run_for_status;
use crate::error::{self, Result};
use snafu::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// How often to check whether a terminated process has exited yet
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A child process (or pipeline of processes) started in the background.
///
/// Stopping it with [`Self::terminate`] asks it to exit with SIGTERM and kills it if it doesn't
/// exit in time.  If it's dropped without being stopped, it's killed outright.
pub struct ManagedProcess {
    name: String,
    handle: duct::Handle,
    stopped: bool,
}

impl ManagedProcess {
    /// Start `expression` in the background.
    ///
    /// The expression is run `unchecked`, since a process stopped by a signal exits with a
    /// non-zero status and that's not an error here.
    pub fn start(name: impl Into<String>, expression: duct::Expression) -> Result<Self> {
        let name = name.into();

        let handle = expression
            .unchecked()
            .start()
            .context(error::SpawnCommandSnafu {
                command: name.clone(),
            })?;

        debug!(%name, pids = ?handle.pids(), "Started process");

        Ok(Self {
            name,
            handle,
            stopped: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pids(&self) -> Vec<u32> {
        self.handle.pids()
    }

    /// Check whether the process is still running, without blocking
    pub fn is_running(&self) -> Result<bool> {
        let output = self.handle.try_wait().context(error::StopProcessSnafu {
            name: self.name.clone(),
        })?;

        Ok(output.is_none())
    }

    /// Ask the process to exit, wait up to `grace` for it to do so, then kill it if it's still
    /// running.
    pub async fn terminate(&mut self, grace: Duration) -> Result<()> {
        if self.stopped {
            return Ok(());
        }

        if !self.is_running()? {
            debug!(name = %self.name, "Process already exited");
            self.stopped = true;
            return Ok(());
        }

        for pid in self.pids() {
            debug!(name = %self.name, pid, "Sending SIGTERM");

            let status =
                run_for_status(vec!["kill".to_string(), "-TERM".to_string(), pid.to_string()])
                    .await?;

            // Fails if the process exited on its own since the check above
            if !status.success() {
                debug!(name = %self.name, pid, %status, "kill reported an error; process may have exited already");
            }
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if !self.is_running()? {
                debug!(name = %self.name, "Process exited after SIGTERM");
                self.stopped = true;
                return Ok(());
            }

            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }

        warn!(name = %self.name, ?grace, "Process didn't exit in time; killing it");

        self.kill()
    }

    fn kill(&mut self) -> Result<()> {
        self.stopped = true;

        self.handle.kill().context(error::StopProcessSnafu {
            name: self.name.clone(),
        })
    }
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("name", &self.name)
            .field("pids", &self.handle.pids())
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }

        debug!(name = %self.name, pids = ?self.handle.pids(), "Killing process(es)");

        if let Err(e) = self.kill() {
            error!(name = %self.name, error = %e, "Error killing process");
        }
    }
}
