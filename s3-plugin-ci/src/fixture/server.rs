//! A single minio server process
use super::credentials::KeyPair;
use crate::error::{self, Result};
use crate::process::ManagedProcess;
use snafu::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Where minio listens when not told otherwise
pub const DEFAULT_ADDRESS: &str = ":9000";

/// The region minio reports when no region is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment variables minio reads the access key from.  Older releases only know the
/// `ACCESS_KEY` form, newer ones prefer `ROOT_USER`.
const ACCESS_KEY_VARS: &[&str] = &["MINIO_ROOT_USER", "MINIO_ACCESS_KEY"];
const SECRET_KEY_VARS: &[&str] = &["MINIO_ROOT_PASSWORD", "MINIO_SECRET_KEY"];
const REGION_VARS: &[&str] = &["MINIO_REGION_NAME", "MINIO_SITE_REGION"];

/// Interval between readiness probes
const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// How to launch one minio server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSpec {
    pub name: String,

    /// Value for `--address`, or `None` to use minio's default
    pub address: Option<String>,

    /// Region the server reports, or `None` for the default region
    pub region: Option<String>,

    pub data_dir: PathBuf,
}

impl ServerSpec {
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(DEFAULT_ADDRESS)
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// URL clients on this host use to reach the server.
    ///
    /// Wildcard, empty and `localhost` hosts in the listen address are all reached via
    /// `127.0.0.1`, so two specs that would bind the same local port have the same endpoint.
    pub fn endpoint_url(&self) -> String {
        let address = self.address();
        let (host, port) = address.rsplit_once(':').unwrap_or((address, "9000"));

        let host = match host.to_ascii_lowercase().as_str() {
            "" | "0.0.0.0" | "[::]" | "localhost" => "127.0.0.1".to_string(),
            _ => host.to_string(),
        };

        format!("http://{host}:{port}")
    }

    /// Arguments to the minio binary
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![OsString::from("server")];

        if let Some(address) = &self.address {
            args.push("--address".into());
            args.push(address.into());
        }

        args.push(self.data_dir.clone().into_os_string());

        args
    }

    /// Environment variables to set for this server's process
    pub fn environment(&self, keys: &KeyPair) -> Vec<(&'static str, String)> {
        let mut vars = Vec::new();

        vars.extend(ACCESS_KEY_VARS.iter().map(|var| (*var, keys.access_key.clone())));
        vars.extend(SECRET_KEY_VARS.iter().map(|var| (*var, keys.secret_key.clone())));

        if let Some(region) = &self.region {
            vars.extend(REGION_VARS.iter().map(|var| (*var, region.clone())));
        }

        vars
    }

    /// Environment variables to remove from this server's process, so that settings inherited
    /// from our own environment don't leak in
    pub fn removed_environment(&self) -> Vec<&'static str> {
        if self.region.is_some() {
            Vec::new()
        } else {
            REGION_VARS.to_vec()
        }
    }

    pub fn expression(&self, binary: &Path, keys: &KeyPair) -> duct::Expression {
        let mut expression = duct::cmd(binary, self.args());

        for var in self.removed_environment() {
            expression = expression.env_remove(var);
        }
        for (var, value) in self.environment(keys) {
            expression = expression.env(var, value);
        }

        expression
    }
}

/// A running minio server
#[derive(Debug)]
pub struct MinioServer {
    spec: ServerSpec,
    process: ManagedProcess,
}

impl MinioServer {
    /// Launch the server.  Doesn't wait for it to be ready; see [`Self::wait_for_service_start`]
    pub async fn start(binary: &Path, spec: ServerSpec, keys: &KeyPair) -> Result<Self> {
        tokio::fs::create_dir_all(&spec.data_dir)
            .await
            .context(error::StartServerSnafu {
                name: spec.name.clone(),
            })?;

        let process = ManagedProcess::start(&spec.name, spec.expression(binary, keys))?;

        debug!(
            name = %spec.name,
            address = spec.address(),
            region = spec.region(),
            data_dir = %spec.data_dir.display(),
            "Started minio server"
        );

        Ok(Self { spec, process })
    }

    pub fn spec(&self) -> &ServerSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn endpoint_url(&self) -> String {
        self.spec.endpoint_url()
    }

    pub fn region(&self) -> &str {
        self.spec.region()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.process.pids()
    }

    pub fn is_running(&self) -> Result<bool> {
        self.process.is_running()
    }

    /// Get an S3 client configured to talk to this server with the given credentials
    pub async fn aws_client(&self, keys: &KeyPair) -> aws_sdk_s3::Client {
        let credentials = aws_credential_types::Credentials::from_keys(
            keys.access_key.clone(),
            keys.secret_key.clone(),
            None,
        );

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(self.region().to_string()))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .endpoint_url(self.endpoint_url())
            .force_path_style(true)
            .build();

        aws_sdk_s3::Client::from_conf(s3_config)
    }

    /// Block until the server answers a `ListBuckets` request or `timeout` elapses.
    ///
    /// The request is signed with the server's region, so this also verifies that the server
    /// picked up its region setting.
    #[instrument(skip(self, keys), fields(name = %self.spec.name, endpoint = %self.endpoint_url()))]
    pub async fn wait_for_service_start(&self, keys: &KeyPair, timeout: Duration) -> Result<()> {
        let retries = (timeout.as_millis() / PROBE_INTERVAL.as_millis()).max(1) as usize;
        let policy = again::RetryPolicy::fixed(PROBE_INTERVAL).with_max_retries(retries);

        let client = self.aws_client(keys).await;

        debug!("Waiting for minio service to start");

        let message = match tokio::time::timeout(
            timeout,
            policy.retry(|| client.list_buckets().send()),
        )
        .await
        {
            Ok(Ok(_)) => {
                debug!("Minio started");
                return Ok(());
            }
            Ok(Err(e)) => aws_sdk_s3::error::DisplayErrorContext(&e).to_string(),
            Err(_) => format!("no response within {timeout:?}"),
        };

        error::ServerNotReadySnafu {
            name: self.spec.name.clone(),
            endpoint: self.endpoint_url(),
            message,
        }
        .fail()
    }

    /// Stop the server, killing it if it doesn't exit within `grace`
    pub async fn stop(&mut self, grace: Duration) -> Result<()> {
        debug!(name = %self.spec.name, pids = ?self.process.pids(), "Stopping minio server");

        self.process.terminate(grace).await
    }
}
