use snafu::prelude::*;
use std::path::PathBuf;
use url::Url;

pub type Result<T, E = HookError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HookError {
    #[snafu(display("Unable to read OS release information from '{}'", path.display()))]
    ReadOsRelease {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("The OS release information is missing the '{field}' field"))]
    MissingOsReleaseField { field: &'static str },

    #[snafu(display("The distribution '{id}' is not supported.  Supported distributions are: ubuntu, debian, centos, rhel, almalinux, rocky, opensuse, sles"))]
    UnsupportedDistribution { id: String },

    #[snafu(display("The glob pattern '{pattern}' is invalid"))]
    InvalidGlobPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[snafu(display("Error enumerating files matching '{pattern}'"))]
    GlobMatch {
        pattern: String,
        source: glob::GlobError,
    },

    #[snafu(display("Failed to launch `{command}`"))]
    SpawnCommand {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("Install step '{step}' failed: `{command}` exited with {}", describe_code(*code)))]
    StepFailed {
        step: String,
        command: String,
        code: Option<i32>,
    },

    #[snafu(display("Error downloading the minio server from '{url}'"))]
    Download { url: Url, source: reqwest::Error },

    #[snafu(display("Error writing the minio server binary to '{}'", path.display()))]
    WriteServerBinary {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Error writing the minio key pair to '{}'", path.display()))]
    WriteKeyPair {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Both minio servers are configured to listen on '{address}'"))]
    DuplicateServerAddress { address: String },

    #[snafu(display("Failed to start minio server '{name}'"))]
    StartServer {
        name: String,
        source: std::io::Error,
    },

    #[snafu(display("The minio server '{name}' at {endpoint} didn't come online in the allowed time.  The last error reported by ListBuckets against the server was:\n{message}"))]
    ServerNotReady {
        name: String,
        endpoint: String,
        message: String,
    },

    #[snafu(display("Error stopping process '{name}'"))]
    StopProcess {
        name: String,
        source: std::io::Error,
    },

    #[snafu(display("Unable to open the test output log '{}'", path.display()))]
    OpenTestLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Error copying test runner output to '{}'", path.display()))]
    TeeOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("The test run failed with {}", describe_code(*code)))]
    TestsFailed { code: Option<i32> },

    #[snafu(display("Error walking the log directory '{}'", path.display()))]
    WalkLogDirectory {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("The test report directory '{}' doesn't exist", path.display()))]
    MissingReportDirectory { path: PathBuf },

    #[snafu(display("Error copying '{}' to '{}'", from.display(), to.display()))]
    CopyArtifact {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("A blocking task panicked or was cancelled"))]
    BlockingTask { source: tokio::task::JoinError },
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by a signal)".to_string(),
    }
}
