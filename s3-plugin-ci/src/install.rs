//! Installation of the plugin package and everything the test suite needs.
//!
//! The installer first builds a plan, a list of [`InstallStep`]s, which is a pure function of the
//! platform and the configuration.  Executing the plan runs each step's command in order.
use crate::command::{display_argv, run_for_status};
use crate::error::{self, Result};
use crate::platform::Platform;
use crate::Config;
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, instrument, warn};

/// Glob (without the extension) that matches the built plugin packages
const PLUGIN_PACKAGE_GLOB: &str = "irods-resource-plugin-s3*";

/// Name of the `unittest` XML reporter the test runner's `--xml_output` depends on.  The test
/// runner only works with this specific version.
const XML_REPORTING_REQUIREMENT: &str = "unittest-xml-reporting==1.14.0";

/// What an install step installs
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum StepKind {
    /// The plugin package(s) built earlier in the pipeline
    #[strum(serialize = "local-packages")]
    LocalPackages,

    /// OS packages the test suite needs
    #[strum(serialize = "os-prerequisites")]
    OsPrerequisites,

    #[strum(serialize = "boto3")]
    Boto3,

    /// The minio Python client
    #[strum(serialize = "minio-client")]
    MinioClient,

    #[strum(serialize = "xml-reporting")]
    XmlReporting,
}

impl StepKind {
    /// Every step is checked except the XML reporter
    pub fn default_policy(&self) -> StepPolicy {
        match self {
            Self::XmlReporting => StepPolicy::Unchecked,
            _ => StepPolicy::Checked,
        }
    }
}

/// Whether a failing step aborts the hook
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StepPolicy {
    /// A non-zero exit fails the hook
    Checked,

    /// A non-zero exit is logged and otherwise ignored
    Unchecked,
}

/// A `STEP=POLICY` pair from the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StepPolicyOverride {
    pub step: StepKind,
    pub policy: StepPolicy,
}

impl FromStr for StepPolicyOverride {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (step, policy) = s
            .split_once('=')
            .ok_or_else(|| format!("expected STEP=POLICY, got '{s}'"))?;

        let step = step
            .trim()
            .parse()
            .map_err(|_| format!("unknown install step '{step}'"))?;
        let policy = policy
            .trim()
            .parse()
            .map_err(|_| format!("unknown step policy '{policy}', expected checked or unchecked"))?;

        Ok(Self { step, policy })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallStep {
    pub kind: StepKind,
    pub argv: Vec<String>,
    pub policy: StepPolicy,
}

impl InstallStep {
    /// Run the step, applying its policy to the exit status
    #[instrument(skip(self), fields(step = %self.kind, policy = %self.policy))]
    pub async fn run(&self) -> Result<()> {
        let command = display_argv(&self.argv);

        info!(%command, "Running install step");

        let status = run_for_status(self.argv.clone()).await?;

        if status.success() {
            return Ok(());
        }

        match self.policy {
            StepPolicy::Checked => error::StepFailedSnafu {
                step: self.kind.to_string(),
                command,
                code: status.code(),
            }
            .fail(),
            StepPolicy::Unchecked => {
                warn!(%command, %status, "Install step failed; ignoring because the step is unchecked");
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Installer {
    platform: Platform,
    built_packages_root: Option<PathBuf>,
    policies: HashMap<StepKind, StepPolicy>,
}

impl Installer {
    pub fn new(platform: Platform, config: &Config) -> Self {
        // Later overrides of the same step win
        let policies = config
            .step_policies
            .iter()
            .map(|o| (o.step, o.policy))
            .collect();

        Self {
            platform,
            built_packages_root: config.built_packages_root_directory.clone(),
            policies,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn policy(&self, step: StepKind) -> StepPolicy {
        self.policies
            .get(&step)
            .copied()
            .unwrap_or_else(|| step.default_policy())
    }

    /// Find the plugin packages for this platform in the built packages directory.
    ///
    /// Returns nothing if no built packages directory is configured.
    pub fn find_plugin_packages(&self) -> Result<Vec<PathBuf>> {
        let Some(root) = &self.built_packages_root else {
            return Ok(Vec::new());
        };

        let pattern = plugin_package_pattern(
            &self.platform.os_specific_directory(root),
            self.platform.package_suffix(),
        );

        let mut packages = glob::glob(&pattern)
            .context(error::InvalidGlobPatternSnafu {
                pattern: pattern.clone(),
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context(error::GlobMatchSnafu { pattern })?;

        packages.sort();

        Ok(packages)
    }

    /// Build the list of steps to run on this platform
    pub fn plan(&self) -> Result<Vec<InstallStep>> {
        let mut steps = Vec::new();
        let package_install = self.platform.distribution.package_manager().install_command();

        if self.built_packages_root.is_some() {
            let packages = self.find_plugin_packages()?;

            if packages.is_empty() {
                warn!(
                    platform = %self.platform.os_specific_directory_name(),
                    "No built plugin packages found for this platform; skipping local package install"
                );
            } else {
                steps.push(self.step(
                    StepKind::LocalPackages,
                    sudo(package_install.clone())
                        .chain(packages.iter().map(|p| p.display().to_string())),
                ));
            }
        }

        steps.push(self.step(
            StepKind::OsPrerequisites,
            sudo(package_install).chain(["python3-pip".to_string()]),
        ));
        steps.push(self.step(StepKind::Boto3, pip_install(["boto3", "--upgrade"])));
        steps.push(self.step(StepKind::MinioClient, pip_install(["minio", "--upgrade"])));
        steps.push(self.step(
            StepKind::XmlReporting,
            // keeps the caller's environment and sets HOME to root's
            ["sudo", "-EH", "python3", "-m", "pip", "install", XML_REPORTING_REQUIREMENT]
                .into_iter()
                .map(String::from),
        ));

        Ok(steps)
    }

    /// Run every step of the plan in order, stopping at the first failing checked step
    #[instrument(skip(self), fields(platform = %self.platform.os_specific_directory_name()))]
    pub async fn install(&self) -> Result<()> {
        let steps = self.plan()?;

        info!(count = steps.len(), "Installing test prerequisites");

        for step in &steps {
            step.run().await?;
        }

        info!("Test prerequisites installed");

        Ok(())
    }

    fn step(&self, kind: StepKind, argv: impl IntoIterator<Item = String>) -> InstallStep {
        InstallStep {
            kind,
            argv: argv.into_iter().collect(),
            policy: self.policy(kind),
        }
    }
}

fn plugin_package_pattern(os_specific_directory: &Path, suffix: &str) -> String {
    // The directory is a literal path, only the file name is a pattern
    let dir = glob::Pattern::escape(&os_specific_directory.display().to_string());

    format!("{dir}/{PLUGIN_PACKAGE_GLOB}.{suffix}")
}

fn sudo(argv: Vec<String>) -> impl Iterator<Item = String> {
    std::iter::once("sudo".to_string()).chain(argv)
}

fn pip_install<const N: usize>(args: [&'static str; N]) -> impl Iterator<Item = String> {
    ["sudo", "python3", "-m", "pip", "install"]
        .into_iter()
        .chain(args)
        .map(String::from)
}
