//! Running install steps against real child processes
use crate::Result;
use assert_matches::assert_matches;
use s3_plugin_ci::install::{InstallStep, StepKind, StepPolicy};
use s3_plugin_ci::HookError;
use s3_plugin_ci_testing::logging::{test_with_log_assertions, test_with_logging};

fn step(kind: StepKind, script: &str, policy: StepPolicy) -> InstallStep {
    InstallStep {
        kind,
        argv: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        policy,
    }
}

#[test]
fn unchecked_failure_is_logged() -> Result<()> {
    test_with_log_assertions(
        async move {
            step(StepKind::XmlReporting, "exit 1", StepPolicy::Unchecked)
                .run()
                .await?;

            Ok(())
        },
        |logs| {
            assert!(logs.contains("WARN"), "{logs}");
            assert!(logs.contains("step=xml-reporting"), "{logs}");
            assert!(logs.contains("ignoring because the step is unchecked"), "{logs}");
        },
    )
}

#[test]
fn checked_failure_reports_step_and_command() -> Result<()> {
    test_with_logging(async move {
        let result = step(StepKind::MinioClient, "exit 2", StepPolicy::Checked)
            .run()
            .await;

        assert_matches!(
            result,
            Err(HookError::StepFailed { step, command, code: Some(2) })
                if step == "minio-client" && command == "sh -c exit 2"
        );

        Ok(())
    })
}

#[test]
fn successful_step_passes_either_way() -> Result<()> {
    test_with_logging(async move {
        for policy in [StepPolicy::Checked, StepPolicy::Unchecked] {
            step(StepKind::Boto3, "true", policy).run().await?;
        }

        Ok(())
    })
}
