//! The end of the hook: running the tests against the servers, stopping the servers and gathering
//! artifacts, with stand-ins for minio and for the test suite.
use crate::Result;
use assert_matches::assert_matches;
use s3_plugin_ci::fixture::MinioFixture;
use s3_plugin_ci::runner::TestRunner;
use s3_plugin_ci::{hook, Config, HookError};
use s3_plugin_ci_testing::{logging::test_with_logging, scripts};
use std::path::Path;
use tempfile::TempDir;

/// A test suite stand-in that writes a report, prints a result and exits with `code`
fn test_script(code: i32) -> String {
    format!(
        r#"echo 'Ran 1 test'
mkdir -p test-reports
echo '<testsuite tests="1"/>' > test-reports/TEST-test_irods_resource_plugin_s3_minio.xml
echo 'result' >&2
exit {code}"#
    )
}

fn config_in(dir: &TempDir) -> Result<Config> {
    let config = Config {
        output_root_directory: Some(dir.path().join("out")),
        irods_home: dir.path().join("irods"),
        minio_path: Some(scripts::write_unresponsive_server(dir.path())?),
        primary_data_dir: dir.path().join("data"),
        secondary_data_dir: dir.path().join("data2"),
        shutdown_grace: 5,
        ..Config::default()
    };
    std::fs::create_dir_all(&config.irods_home)?;

    Ok(config)
}

fn runner(config: &Config, script: String) -> TestRunner {
    TestRunner::new(script, &config.irods_home, config.test_log_path())
}

/// Launch the stand-in servers, returning the fixture and the PIDs of its processes
async fn launch(config: &Config) -> Result<(MinioFixture, Vec<u32>)> {
    let fixture = MinioFixture::launch(config).await?;

    let pids = fixture
        .servers()
        .iter()
        .flat_map(|server| server.pids())
        .collect::<Vec<_>>();
    assert_eq!(pids.len(), 2);

    Ok((fixture, pids))
}

fn assert_stopped(pids: &[u32]) {
    for pid in pids {
        assert!(
            !Path::new(&format!("/proc/{pid}")).exists(),
            "Server process {pid} is still running"
        );
    }
}

#[test]
fn failed_tests_still_stop_servers_and_gather_artifacts() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let config = config_in(&dir)?;
        let (fixture, pids) = launch(&config).await?;

        let result =
            hook::run_with_fixture(fixture, &runner(&config, test_script(3)), &config).await;

        assert_matches!(result, Err(HookError::TestsFailed { code: Some(3) }));
        assert_stopped(&pids);

        let output = dir.path().join("out");
        assert_eq!(
            std::fs::read_to_string(output.join("test_output.log"))?,
            "Ran 1 test\nresult\n"
        );
        assert!(output
            .join("test-reports/TEST-test_irods_resource_plugin_s3_minio.xml")
            .is_file());

        Ok(())
    })
}

#[test]
fn test_failure_outranks_missing_reports() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let config = config_in(&dir)?;
        let (fixture, pids) = launch(&config).await?;

        let result =
            hook::run_with_fixture(fixture, &runner(&config, "exit 1".to_string()), &config).await;

        assert_matches!(result, Err(HookError::TestsFailed { code: Some(1) }));
        assert_stopped(&pids);
        assert!(dir.path().join("out/test_output.log").is_file());

        Ok(())
    })
}

#[test]
fn passing_tests_without_reports_fail_collection() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let config = config_in(&dir)?;
        let (fixture, pids) = launch(&config).await?;

        let result =
            hook::run_with_fixture(fixture, &runner(&config, "echo ok".to_string()), &config).await;

        assert_matches!(result, Err(HookError::MissingReportDirectory { .. }));
        assert_stopped(&pids);

        Ok(())
    })
}

#[test]
fn passing_tests_succeed() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let config = config_in(&dir)?;
        let (fixture, pids) = launch(&config).await?;

        hook::run_with_fixture(fixture, &runner(&config, test_script(0)), &config).await?;

        assert_stopped(&pids);
        assert!(dir
            .path()
            .join("out/test-reports/TEST-test_irods_resource_plugin_s3_minio.xml")
            .is_file());

        Ok(())
    })
}
