//! Running external commands.
//!
//! Everything the hook does to the system goes through some external tool (package managers,
//! `pip`, `kill`).  The only contract with those tools is their exit code.
use crate::error::{self, Result};
use snafu::{prelude::*, IntoError};
use std::process::ExitStatus;
use tracing::debug;

/// Render an argv for log and error messages
pub fn display_argv(argv: &[String]) -> String {
    argv.join(" ")
}

/// Build a `duct` expression from an argv
pub(crate) fn expression(argv: &[String]) -> Result<duct::Expression> {
    let Some((program, args)) = argv.split_first() else {
        return Err(error::SpawnCommandSnafu {
            command: String::new(),
        }
        .into_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command line",
        )));
    };

    Ok(duct::cmd(program, args))
}

/// Run a command to completion with its output going to our own stdout/stderr, and report its
/// exit status.
///
/// A non-zero exit is not an error here; that's for the caller to decide.  Failing to launch the
/// command at all is.
pub(crate) async fn run_for_status(argv: Vec<String>) -> Result<ExitStatus> {
    let command = display_argv(&argv);
    let expression = expression(&argv)?;

    debug!(%command, "Running command");

    let output = tokio::task::spawn_blocking(move || expression.unchecked().run())
        .await
        .context(error::BlockingTaskSnafu)?
        .context(error::SpawnCommandSnafu {
            command: command.clone(),
        })?;

    debug!(%command, status = %output.status, "Command completed");

    Ok(output.status)
}
