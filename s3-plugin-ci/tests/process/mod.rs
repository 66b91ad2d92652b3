//! Stopping background processes: graceful termination, the kill fallback, and kill on drop
use crate::Result;
use more_asserts::assert_lt;
use s3_plugin_ci::process::ManagedProcess;
use s3_plugin_ci_testing::{
    logging::{test_with_log_assertions, test_with_logging},
    scripts,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Whether a process with this PID exists
fn pid_alive(pid: u32) -> bool {
    duct::cmd!("kill", "-0", pid.to_string())
        .stdout_null()
        .stderr_null()
        .unchecked()
        .run()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[test]
fn terminate_stops_cooperative_process() -> Result<()> {
    test_with_logging(async move {
        let mut process = ManagedProcess::start("sleep", duct::cmd!("sleep", "600"))?;
        assert!(process.is_running()?);

        let started = Instant::now();
        process.terminate(Duration::from_secs(10)).await?;

        assert!(!process.is_running()?);
        assert_lt!(started.elapsed(), Duration::from_secs(5));

        // Stopping again is harmless
        process.terminate(Duration::from_secs(10)).await?;

        Ok(())
    })
}

#[test]
fn terminate_signals_through_kill_command() -> Result<()> {
    let pids = Arc::new(Mutex::new(Vec::new()));

    test_with_log_assertions(
        {
            let pids = pids.clone();

            async move {
                let mut process = ManagedProcess::start("sleep", duct::cmd!("sleep", "600"))?;
                pids.lock().unwrap().extend(process.pids());

                process.terminate(Duration::from_secs(10)).await?;

                Ok(())
            }
        },
        move |logs| {
            for pid in pids.lock().unwrap().iter() {
                assert!(logs.contains(&format!("kill -TERM {pid}")), "{logs}");
            }
            assert!(logs.contains("Process exited after SIGTERM"), "{logs}");
        },
    )
}

#[test]
fn terminate_kills_process_ignoring_sigterm() -> Result<()> {
    test_with_logging(async move {
        let dir = TempDir::new()?;
        let script = scripts::write_stubborn_process(dir.path())?;

        let mut process =
            ManagedProcess::start("stubborn", duct::cmd(script, Vec::<String>::new()))?;

        // Give the shell a moment to install its trap
        tokio::time::sleep(Duration::from_millis(300)).await;

        process.terminate(Duration::from_millis(500)).await?;

        assert!(!process.is_running()?);

        Ok(())
    })
}

#[test]
fn drop_kills_process() -> Result<()> {
    test_with_logging(async move {
        let process = ManagedProcess::start("sleep", duct::cmd!("sleep", "600"))?;
        let pids = process.pids();
        assert!(pids.iter().copied().all(pid_alive));

        drop(process);

        assert!(!pids.iter().copied().any(pid_alive));

        Ok(())
    })
}

#[test]
fn already_exited_process_terminates_cleanly() -> Result<()> {
    test_with_logging(async move {
        let mut process = ManagedProcess::start("true", duct::cmd!("true"))?;

        tokio::time::sleep(Duration::from_millis(300)).await;

        process.terminate(Duration::from_secs(1)).await?;
        assert!(!process.is_running()?);

        Ok(())
    })
}
