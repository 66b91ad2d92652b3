//! The test hook itself: install, start minio, run the tests, stop minio, gather artifacts.
use crate::artifacts::{self, ArtifactLayout};
use crate::fixture::MinioFixture;
use crate::install::Installer;
use crate::platform::Platform;
use crate::runner::TestRunner;
use crate::{Config, Result};
use tracing::{error, info, instrument};

/// Run the whole hook on this host.
///
/// Installation and fixture failures end the run immediately.  Once the minio servers are up,
/// the tests, the server shutdown and the artifact gathering all happen regardless of how the
/// preceding steps went; see [`combine_outcomes`] for which error is reported.
#[instrument(skip_all)]
pub async fn run(config: &Config) -> Result<()> {
    let platform = Platform::detect()?;

    info!(
        distribution = %platform.distribution,
        version = %platform.version,
        "Running S3 plugin test hook"
    );

    run_on_platform(platform, config).await
}

/// Same as [`run`] but for an already known platform
pub async fn run_on_platform(platform: Platform, config: &Config) -> Result<()> {
    Installer::new(platform, config).install().await?;

    let fixture = MinioFixture::acquire(config).await?;

    run_with_fixture(fixture, &TestRunner::from_config(config), config).await
}

/// Run the tests with `runner` against the servers of `fixture`, then stop the servers and
/// gather artifacts.
///
/// The servers are stopped and the artifacts gathered whether or not the tests pass.
pub async fn run_with_fixture(
    fixture: MinioFixture,
    runner: &TestRunner,
    config: &Config,
) -> Result<()> {
    let test_result = runner.run_checked().await.map(|_| ());

    let release_result = fixture.release(config.shutdown_grace()).await;

    let collect_result =
        artifacts::collect(config.output_dir(), &ArtifactLayout::from_config(config)).await;

    combine_outcomes(test_result, release_result, collect_result)
}

/// Decide what the hook reports when the final stages have run.
///
/// A test failure takes precedence over a failure to stop the servers, which takes precedence
/// over a failure to gather artifacts.  Whatever isn't reported is logged.
pub fn combine_outcomes(
    test_result: Result<()>,
    release_result: Result<()>,
    collect_result: Result<()>,
) -> Result<()> {
    let mut errors = [test_result, release_result, collect_result]
        .into_iter()
        .filter_map(Result::err);

    let Some(primary) = errors.next() else {
        return Ok(());
    };

    for secondary in errors {
        error!(error = %secondary, reported = %primary, "Additional failure while finishing the test hook");
    }

    Err(primary)
}
