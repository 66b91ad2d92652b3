//! Gathering of logs and test reports from a fake iRODS home directory into an output directory
use crate::Result;
use assert_matches::assert_matches;
use s3_plugin_ci::artifacts::{self, ArtifactLayout, REPORT_DIR_NAME};
use s3_plugin_ci::{Config, HookError};
use s3_plugin_ci_testing::{logging::test_with_logging, tree};
use std::path::Path;
use tempfile::TempDir;

/// An iRODS home with a log directory, including the test output log and a nested log, and
/// optionally a test report directory
fn irods_home(with_reports: bool) -> Result<(TempDir, Config)> {
    let home = TempDir::new()?;

    tree::make_tree(
        home.path(),
        [
            ("log/rodsLog", 4096),
            ("log/test_output.log", 1024),
            ("log/archive/rodsLog.1", 100),
        ],
    )?;

    if with_reports {
        tree::make_tree(
            home.path(),
            [
                ("test-reports/TEST-test_irods_resource_plugin_s3_minio.xml", 2000),
                ("test-reports/nested/TEST-other.xml", 10),
            ],
        )?;
    }

    let config = Config {
        irods_home: home.path().to_owned(),
        ..Config::default()
    };

    Ok((home, config))
}

#[test]
fn gathers_logs_and_reports() -> Result<()> {
    test_with_logging(async move {
        let (home, config) = irods_home(true)?;
        let output = TempDir::new()?;
        let output_dir = output.path().join("out");

        artifacts::collect(Some(&output_dir), &ArtifactLayout::from_config(&config)).await?;

        // Log files land at the top of the output directory, nested ones included
        let log_dir = home.path().join("log");
        for (source, name) in [
            (log_dir.join("rodsLog"), "rodsLog"),
            (log_dir.join("test_output.log"), "test_output.log"),
            (log_dir.join("archive/rodsLog.1"), "rodsLog.1"),
        ] {
            tree::assert_file_contents(&output_dir.join(name), &std::fs::read(source)?)?;
        }
        assert!(!output_dir.join("archive").exists());

        tree::assert_same_tree(
            &home.path().join("test-reports"),
            &output_dir.join(REPORT_DIR_NAME),
        )?;

        Ok(())
    })
}

#[test]
fn existing_output_directory_is_merged_into() -> Result<()> {
    test_with_logging(async move {
        let (_home, config) = irods_home(true)?;
        let output = TempDir::new()?;
        let previous = tree::make_tree(output.path(), [("test-reports/previous.xml", 50)])?;

        let layout = ArtifactLayout::from_config(&config);
        artifacts::collect(Some(output.path()), &layout).await?;

        for (path, data) in previous {
            tree::assert_file_contents(&output.path().join(path), &data)?;
        }
        assert!(output
            .path()
            .join(REPORT_DIR_NAME)
            .join("nested/TEST-other.xml")
            .is_file());

        Ok(())
    })
}

#[test]
fn no_output_directory_does_nothing() -> Result<()> {
    test_with_logging(async move {
        let (home, config) = irods_home(false)?;

        artifacts::collect(config.output_dir(), &ArtifactLayout::from_config(&config)).await?;

        // Only the log directory exists in the iRODS home
        assert_eq!(std::fs::read_dir(home.path())?.count(), 1);

        Ok(())
    })
}

#[test]
fn missing_report_directory_fails_after_copying_logs() -> Result<()> {
    test_with_logging(async move {
        let (home, config) = irods_home(false)?;
        let output = TempDir::new()?;

        let result =
            artifacts::collect(Some(output.path()), &ArtifactLayout::from_config(&config)).await;

        assert_matches!(
            result,
            Err(HookError::MissingReportDirectory { path }) if path == home.path().join("test-reports")
        );
        assert!(output.path().join("test_output.log").is_file());
        assert!(output.path().join("rodsLog.1").is_file());
        assert!(!output.path().join(REPORT_DIR_NAME).exists());

        Ok(())
    })
}

#[test]
fn missing_test_log_is_an_error() -> Result<()> {
    test_with_logging(async move {
        let (home, config) = irods_home(true)?;
        std::fs::remove_file(home.path().join("log/test_output.log"))?;
        let output = TempDir::new()?;

        let result =
            artifacts::collect(Some(output.path()), &ArtifactLayout::from_config(&config)).await;

        assert_matches!(
            result,
            Err(HookError::CopyArtifact { from, .. }) if from.ends_with(Path::new("log/test_output.log"))
        );

        Ok(())
    })
}
