//! Ephemeral minio servers providing the S3 endpoints the plugin tests run against.
//!
//! Two servers are started: one with minio's default settings, and one on an alternate port in a
//! non-default region, so that the plugin's region handling gets exercised.  Both use the same
//! freshly generated credentials, which are also written to a key pair file the tests read.
use crate::error::{self, Result};
use crate::Config;
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, instrument};

mod credentials;
mod download;
mod server;

pub use credentials::{KeyPair, KEY_LENGTH};
pub use download::{download_server, make_executable};
pub use server::{MinioServer, ServerSpec, DEFAULT_ADDRESS, DEFAULT_REGION};

/// The running minio servers.
///
/// Call [`Self::release`] to stop them.  If this is dropped without being released, the servers
/// are killed.
#[derive(Debug)]
pub struct MinioFixture {
    keys: KeyPair,
    binary: PathBuf,
    servers: Vec<MinioServer>,
}

impl MinioFixture {
    /// How the two servers are launched for a given configuration
    pub fn server_specs(config: &Config) -> [ServerSpec; 2] {
        [
            ServerSpec {
                name: "minio".to_string(),
                address: None,
                region: None,
                data_dir: config.primary_data_dir.clone(),
            },
            ServerSpec {
                name: format!("minio-{}", config.secondary_region),
                address: Some(config.secondary_address.clone()),
                region: Some(config.secondary_region.clone()),
                data_dir: config.secondary_data_dir.clone(),
            },
        ]
    }

    /// Obtain the minio binary, generate and persist credentials, start both servers and wait
    /// until they accept requests.
    ///
    /// If any server fails to start or doesn't become ready, the servers already started are
    /// killed before the error is returned.
    #[instrument(skip_all)]
    pub async fn acquire(config: &Config) -> Result<Self> {
        let fixture = Self::launch(config).await?;

        fixture.wait_until_ready(config.startup_timeout()).await?;

        Ok(fixture)
    }

    /// Everything [`Self::acquire`] does except waiting for the servers to answer requests
    pub async fn launch(config: &Config) -> Result<Self> {
        let [primary, secondary] = Self::server_specs(config);

        ensure!(
            primary.endpoint_url() != secondary.endpoint_url(),
            error::DuplicateServerAddressSnafu {
                address: secondary.address().to_string(),
            }
        );

        let binary = match &config.minio_path {
            Some(path) => path.clone(),
            None => download_server(&config.minio_url, &config.work_dir).await?,
        };

        let keys = KeyPair::generate();
        let keypair_path = config.keypair_path();
        keys.write_to(&keypair_path).await?;

        info!(
            keypair = %keypair_path.display(),
            access_key = %keys.access_key,
            "Generated minio credentials"
        );

        let mut fixture = Self {
            keys,
            binary,
            servers: Vec::with_capacity(2),
        };

        for spec in [primary, secondary] {
            let server = MinioServer::start(&fixture.binary, spec, &fixture.keys).await?;
            fixture.servers.push(server);
        }

        Ok(fixture)
    }

    /// Wait for every server to answer a `ListBuckets` request, allowing each up to `timeout`
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        for server in &self.servers {
            server.wait_for_service_start(&self.keys, timeout).await?;
        }

        info!(
            endpoints = ?self.servers.iter().map(|s| s.endpoint_url()).collect::<Vec<_>>(),
            "Minio servers are ready"
        );

        Ok(())
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn servers(&self) -> &[MinioServer] {
        &self.servers
    }

    /// Stop all servers.
    ///
    /// Every server gets a termination attempt even if stopping an earlier one fails; the first
    /// error is reported.
    #[instrument(skip(self))]
    pub async fn release(mut self, grace: Duration) -> Result<()> {
        let mut result = Ok(());

        for server in &mut self.servers {
            if let Err(e) = server.stop(grace).await {
                error!(name = server.name(), error = %e, "Error stopping minio server");

                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        info!("Minio servers stopped");

        result
    }
}
