use crate::install::StepPolicyOverride;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Where the minio server binary is downloaded from when no local binary is specified
pub const DEFAULT_MINIO_URL: &str = "https://dl.min.io/server/minio/release/linux-amd64/minio";

/// The configuration settings that control a run of the test hook.
///
/// The two options with underscores in their names are part of the interface the CI system uses
/// to invoke every plugin's test hook, so they can't be renamed.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::Parser))]
pub struct Config {
    /// Directory into which logs and test reports are gathered after the test run.
    ///
    /// If not set, nothing is gathered.
    #[cfg_attr(
        feature = "clap",
        clap(long = "output_root_directory", value_name = "DIR")
    )]
    pub output_root_directory: Option<PathBuf>,

    /// Directory containing the plugin packages built earlier in the pipeline.
    ///
    /// Packages are expected in an OS-specific subdirectory, ie `Ubuntu_22/`.  If not set, no
    /// plugin package is installed from local files.
    #[cfg_attr(
        feature = "clap",
        clap(long = "built_packages_root_directory", value_name = "DIR")
    )]
    pub built_packages_root_directory: Option<PathBuf>,

    /// Home directory of the iRODS service account.
    ///
    /// The test runner is invoked from here, and the key pair, logs and test reports live under
    /// it.
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = "/var/lib/irods", value_name = "DIR")
    )]
    pub irods_home: PathBuf,

    /// The service account the test suite runs as
    #[cfg_attr(feature = "clap", clap(long, default_value = "irods", value_name = "USER"))]
    pub irods_user: String,

    /// Run the test suite directly as the current user instead of switching to `irods_user`
    #[cfg_attr(feature = "clap", clap(long))]
    pub no_sudo: bool,

    /// The test (module, class or method) passed to the test runner's `--run_s`
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = "test_irods_resource_plugin_s3_minio")
    )]
    pub test: String,

    /// URL from which the minio server binary is downloaded
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = DEFAULT_MINIO_URL, value_name = "URL")
    )]
    pub minio_url: Url,

    /// Use an already installed minio server binary instead of downloading one
    #[cfg_attr(feature = "clap", clap(long, value_name = "PATH"))]
    pub minio_path: Option<PathBuf>,

    /// Directory the minio server binary is downloaded into
    #[cfg_attr(feature = "clap", clap(long, default_value = ".", value_name = "DIR"))]
    pub work_dir: PathBuf,

    /// Data directory of the minio server running with default settings
    #[cfg_attr(feature = "clap", clap(long, default_value = "/data", value_name = "DIR"))]
    pub primary_data_dir: PathBuf,

    /// Data directory of the minio server running in the alternate region
    #[cfg_attr(feature = "clap", clap(long, default_value = "/data2", value_name = "DIR"))]
    pub secondary_data_dir: PathBuf,

    /// Listen address of the minio server running in the alternate region
    #[cfg_attr(feature = "clap", clap(long, default_value = ":9001"))]
    pub secondary_address: String,

    /// Region name of the second minio server
    #[cfg_attr(feature = "clap", clap(long, default_value = "eu-central-1"))]
    pub secondary_region: String,

    /// How long to wait, in seconds, for each minio server to answer requests after starting it
    #[cfg_attr(feature = "clap", clap(long, default_value = "30", value_name = "SECS"))]
    pub startup_timeout: u64,

    /// How long to wait, in seconds, for each minio server to exit after asking it to stop,
    /// before killing it
    #[cfg_attr(feature = "clap", clap(long, default_value = "10", value_name = "SECS"))]
    pub shutdown_grace: u64,

    /// Override whether a failing install step aborts the hook.
    ///
    /// Specified as `STEP=checked` or `STEP=unchecked`.  May be repeated.  Steps are
    /// local-packages, os-prerequisites, boto3, minio-client and xml-reporting.
    #[cfg_attr(feature = "clap", clap(long = "step-policy", value_name = "STEP=POLICY"))]
    pub step_policies: Vec<StepPolicyOverride>,
}

impl Config {
    /// The user to switch to when running the test suite, if any
    pub fn run_as(&self) -> Option<&str> {
        (!self.no_sudo).then_some(self.irods_user.as_str())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }

    /// File the generated minio credentials are written to, for the tests to read
    pub fn keypair_path(&self) -> PathBuf {
        self.irods_home.join("minio.keypair")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.irods_home.join("log")
    }

    pub fn test_log_path(&self) -> PathBuf {
        self.log_dir().join("test_output.log")
    }

    pub fn report_dir(&self) -> PathBuf {
        self.irods_home.join("test-reports")
    }

    /// The output directory, if one was given
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_root_directory.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        // XXX: This is duplicated here and in the `clap` attributes, since the lib crate only
        // depends on clap when the `clap` feature is enabled
        Self {
            output_root_directory: None,
            built_packages_root_directory: None,
            irods_home: PathBuf::from("/var/lib/irods"),
            irods_user: "irods".to_string(),
            no_sudo: false,
            test: "test_irods_resource_plugin_s3_minio".to_string(),
            minio_url: DEFAULT_MINIO_URL
                .parse()
                .expect("BUG: the default minio URL is valid"),
            minio_path: None,
            work_dir: PathBuf::from("."),
            primary_data_dir: PathBuf::from("/data"),
            secondary_data_dir: PathBuf::from("/data2"),
            secondary_address: ":9001".to_string(),
            secondary_region: "eu-central-1".to_string(),
            startup_timeout: 30,
            shutdown_grace: 10,
            step_policies: Vec::new(),
        }
    }
}
