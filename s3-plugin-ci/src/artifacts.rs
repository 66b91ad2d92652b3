//! Gathering of logs and test reports after the test run
use crate::error::{self, Result};
use crate::Config;
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Name of the report directory inside the output directory
pub const REPORT_DIR_NAME: &str = "test-reports";

/// Where the artifacts to gather are located
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactLayout {
    /// Every file in here (recursively) is copied to the root of the output directory
    pub log_dir: PathBuf,

    pub test_log: PathBuf,

    /// Copied as a tree to `test-reports` in the output directory
    pub report_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            log_dir: config.log_dir(),
            test_log: config.test_log_path(),
            report_dir: config.report_dir(),
        }
    }
}

/// Copy logs and test reports to `output`.
///
/// Does nothing if `output` is `None`.  Fails if the report directory doesn't exist, but only
/// after the logs have been copied.
#[instrument(err)]
pub async fn collect(output: Option<&Path>, layout: &ArtifactLayout) -> Result<()> {
    let Some(output) = output else {
        debug!("No output directory specified; not gathering artifacts");
        return Ok(());
    };

    let output = output.to_owned();
    let layout = layout.clone();

    tokio::task::spawn_blocking(move || collect_blocking(&output, &layout))
        .await
        .context(error::BlockingTaskSnafu)?
}

fn collect_blocking(output: &Path, layout: &ArtifactLayout) -> Result<()> {
    info!(output = %output.display(), "Gathering logs and test reports");

    std::fs::create_dir_all(output).context(error::CopyArtifactSnafu {
        from: layout.log_dir.clone(),
        to: output.to_owned(),
    })?;

    let count = gather_files(&layout.log_dir, output)?;
    debug!(count, log_dir = %layout.log_dir.display(), "Gathered log files");

    let test_log_name = layout
        .test_log
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("test_output.log"));
    copy_file(&layout.test_log, &output.join(test_log_name))?;

    ensure!(
        layout.report_dir.is_dir(),
        error::MissingReportDirectorySnafu {
            path: layout.report_dir.clone(),
        }
    );

    let count = copy_tree(&layout.report_dir, &output.join(REPORT_DIR_NAME))?;
    debug!(count, report_dir = %layout.report_dir.display(), "Copied test reports");

    Ok(())
}

/// Copy every regular file anywhere under `source` directly into `output`, without the
/// directory structure.  A missing `source` has no files.
fn gather_files(source: &Path, output: &Path) -> Result<usize> {
    if !source.exists() {
        warn!(source = %source.display(), "Log directory doesn't exist; no log files to gather");
        return Ok(0);
    }

    let mut count = 0;

    for entry in walkdir::WalkDir::new(source) {
        let entry = entry.context(error::WalkLogDirectorySnafu {
            path: source.to_owned(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        copy_file(entry.path(), &output.join(entry.file_name()))?;
        count += 1;
    }

    Ok(count)
}

/// Copy the tree rooted at `source` to `destination`, creating directories as needed
fn copy_tree(source: &Path, destination: &Path) -> Result<usize> {
    let mut count = 0;

    for entry in walkdir::WalkDir::new(source) {
        let entry = entry.context(error::WalkLogDirectorySnafu {
            path: source.to_owned(),
        })?;

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).context(error::CopyArtifactSnafu {
                from: entry.path().to_owned(),
                to: target.clone(),
            })?;
        } else {
            copy_file(entry.path(), &target)?;
            count += 1;
        }
    }

    Ok(count)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to).context(error::CopyArtifactSnafu {
        from: from.to_owned(),
        to: to.to_owned(),
    })?;

    Ok(())
}
