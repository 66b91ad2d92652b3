//! Detection of the Linux distribution the hook is running on.
//!
//! Everything distribution specific (package format, package manager, the name of the directory
//! the build pipeline puts packages in) hangs off of [`Platform`].
use crate::error::{self, Result};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where `systemd`-era distributions describe themselves
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Distribution {
    #[strum(serialize = "Ubuntu")]
    Ubuntu,
    #[strum(serialize = "Debian")]
    Debian,
    #[strum(serialize = "Centos")]
    Centos,
    #[strum(serialize = "Almalinux")]
    AlmaLinux,
    #[strum(serialize = "Rocky")]
    RockyLinux,
    #[strum(serialize = "Opensuse")]
    OpenSuse,
}

impl Distribution {
    /// Map the `ID` field of `os-release` to a distribution.
    ///
    /// Fails if there is no handler for this distribution.
    pub fn from_os_release_id(id: &str) -> Result<Self> {
        let normalized = id.trim().to_ascii_lowercase();

        let distribution = match normalized.as_str() {
            "ubuntu" => Self::Ubuntu,
            "debian" => Self::Debian,
            "centos" | "rhel" => Self::Centos,
            "almalinux" => Self::AlmaLinux,
            "rocky" => Self::RockyLinux,
            "sles" => Self::OpenSuse,
            other if other.starts_with("opensuse") => Self::OpenSuse,
            _ => {
                return error::UnsupportedDistributionSnafu {
                    id: id.to_string(),
                }
                .fail()
            }
        };

        Ok(distribution)
    }

    pub fn package_format(&self) -> PackageFormat {
        match self {
            Self::Ubuntu | Self::Debian => PackageFormat::Deb,
            Self::Centos | Self::AlmaLinux | Self::RockyLinux | Self::OpenSuse => {
                PackageFormat::Rpm
            }
        }
    }

    pub fn package_manager(&self) -> PackageManager {
        match self {
            Self::Ubuntu | Self::Debian => PackageManager::Apt,
            Self::Centos => PackageManager::Yum,
            Self::AlmaLinux | Self::RockyLinux => PackageManager::Dnf,
            Self::OpenSuse => PackageManager::Zypper,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    Deb,
    Rpm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Apt,
    Yum,
    Dnf,
    Zypper,
}

impl PackageManager {
    /// Command line (without `sudo`) that installs packages by name or from local package files.
    ///
    /// Both forms are the same for every supported package manager; `apt-get` recognizes local
    /// files by their path containing a `/`.
    pub fn install_command(&self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Apt => &["apt-get", "install", "-y"],
            Self::Yum => &["yum", "install", "-y"],
            Self::Dnf => &["dnf", "install", "-y"],
            Self::Zypper => &["zypper", "--non-interactive", "install"],
        };

        args.iter().map(|arg| arg.to_string()).collect()
    }
}

/// The distribution and version of the running OS
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Platform {
    pub distribution: Distribution,

    /// Full version string, ie `22.04` or `9.3`.  Empty on rolling releases.
    pub version: String,
}

impl Platform {
    /// Probe the running system
    pub fn detect() -> Result<Self> {
        Self::from_os_release_file(Path::new(OS_RELEASE_PATH))
    }

    pub fn from_os_release_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context(error::ReadOsReleaseSnafu {
            path: path.to_owned(),
        })?;

        let platform = Self::from_os_release(&contents)?;

        debug!(path = %path.display(), ?platform, "Detected platform");

        Ok(platform)
    }

    /// Parse the contents of an `os-release` file
    pub fn from_os_release(contents: &str) -> Result<Self> {
        let mut id = None;
        let mut version = None;

        for line in contents.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');

            match key {
                "ID" => id = Some(value.to_string()),
                "VERSION_ID" => version = Some(value.to_string()),
                _ => {}
            }
        }

        let id = id.context(error::MissingOsReleaseFieldSnafu { field: "ID" })?;

        Ok(Self {
            distribution: Distribution::from_os_release_id(&id)?,
            version: version.unwrap_or_default(),
        })
    }

    /// The major component of the version, ie `22` for `22.04`
    pub fn major_version(&self) -> &str {
        self.version.split('.').next().unwrap_or_default()
    }

    pub fn package_suffix(&self) -> &'static str {
        match self.distribution.package_format() {
            PackageFormat::Deb => "deb",
            PackageFormat::Rpm => "rpm",
        }
    }

    /// Name of the subdirectory of the built packages directory holding this platform's packages
    pub fn os_specific_directory_name(&self) -> String {
        match self.major_version() {
            "" => self.distribution.to_string(),
            major => format!("{}_{major}", self.distribution),
        }
    }

    pub fn os_specific_directory(&self, built_packages_root: &Path) -> PathBuf {
        built_packages_root.join(self.os_specific_directory_name())
    }
}
