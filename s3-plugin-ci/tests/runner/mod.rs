//! Running stand-ins for the test suite through the test runner, checking that their output is
//! duplicated to the log and that their own exit status is what gets reported.
use crate::Result;
use assert_matches::assert_matches;
use s3_plugin_ci::runner::TestRunner;
use s3_plugin_ci::HookError;
use s3_plugin_ci_testing::logging::test_with_logging;
use tempfile::TempDir;

fn runner(dir: &TempDir, command: &str) -> TestRunner {
    TestRunner::new(
        command,
        dir.path(),
        dir.path().join("log").join("test_output.log"),
    )
}

#[test]
fn output_is_logged() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let runner = runner(&dir, "echo 'Ran 3 tests'; echo 'OK' >&2");

        let outcome = runner.run_checked().await?;

        assert_eq!(outcome.code, Some(0));
        assert_eq!(
            std::fs::read_to_string(runner.log_path())?,
            "Ran 3 tests\nOK\n"
        );

        Ok(())
    })
}

#[test]
fn exit_status_is_the_test_process_status() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let runner = runner(&dir, "echo 'FAILED (failures=1)'; exit 3");

        let outcome = runner.run().await?;
        assert_eq!(outcome.code, Some(3));
        assert!(!outcome.success());

        // A failing run's output is logged all the same
        assert_eq!(
            std::fs::read_to_string(runner.log_path())?,
            "FAILED (failures=1)\n"
        );

        assert_matches!(
            runner.run_checked().await,
            Err(HookError::TestsFailed { code: Some(3) })
        );

        Ok(())
    })
}

#[test]
fn signal_termination_has_no_exit_code() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let runner = runner(&dir, "kill -KILL $$");

        assert_matches!(
            runner.run_checked().await,
            Err(HookError::TestsFailed { code: None })
        );

        Ok(())
    })
}

#[test]
fn runs_in_working_directory() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        std::fs::create_dir(dir.path().join("scripts"))?;
        std::fs::write(dir.path().join("scripts/marker"), "found\n")?;
        let runner = runner(&dir, "cat scripts/marker");

        runner.run_checked().await?;

        assert_eq!(std::fs::read_to_string(runner.log_path())?, "found\n");

        Ok(())
    })
}

#[test]
fn previous_log_is_replaced() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let runner = runner(&dir, "echo second");
        std::fs::create_dir_all(dir.path().join("log"))?;
        std::fs::write(runner.log_path(), "first run output that is longer\n")?;

        runner.run_checked().await?;

        assert_eq!(std::fs::read_to_string(runner.log_path())?, "second\n");

        Ok(())
    })
}

#[test]
fn missing_command_is_a_test_failure() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let runner = runner(&dir, "exec /nonexistent/run_tests.py");

        // The shell starts fine and reports the missing program with status 127
        assert_matches!(
            runner.run_checked().await,
            Err(HookError::TestsFailed { code: Some(127) })
        );

        Ok(())
    })
}
