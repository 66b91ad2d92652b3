#![recursion_limit = "256"]

use clap::Parser;
use s3_plugin_ci::{Config, HookError};
use tracing::{debug, error, info};

/// CI test hook for the iRODS S3 resource plugin.
///
/// Installs the plugin and its test prerequisites, runs the plugin test suite against two local
/// minio servers, and gathers the logs and test reports.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    config: Config,

    /// Enable verbose log output
    #[clap(short = 'v', long, conflicts_with = "quiet")]
    verbose: bool,

    /// Be quiet, suppress almost all output (except errors)
    #[clap(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    /// Log filter used when `RUST_LOG` isn't set
    fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "h2=warn,hyper=info,rustls=info,aws=info,debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    init_logging(&args)?;

    debug!(
        target_triple = env!("VERGEN_CARGO_TARGET_TRIPLE"),
        config = ?args.config,
        "Starting"
    );

    match s3_plugin_ci::hook::run(&args.config).await {
        Ok(()) => {
            info!("Test hook completed successfully");
            Ok(())
        }
        Err(HookError::TestsFailed { code }) => {
            // The CI system reads the test result from our exit code
            error!(?code, "Plugin tests failed");
            std::process::exit(exit_code(code))
        }
        Err(e) => Err(e.into()),
    }
}

fn init_logging(args: &Args) -> color_eyre::Result<()> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(args.default_log_filter())?,
    };

    let format = fmt::layer()
        .with_level(true)
        .with_target(args.verbose)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init()?;

    Ok(())
}

/// Exit code for a failed test run.  A test process killed by a signal has no exit code of its
/// own, and a failure must never look like success.
fn exit_code(code: Option<i32>) -> i32 {
    match code {
        Some(code) if code != 0 => code,
        _ => 1,
    }
}
