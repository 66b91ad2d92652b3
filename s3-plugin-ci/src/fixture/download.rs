//! Fetching the minio server binary
use crate::error::{self, Result};
use snafu::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};
use url::Url;

/// Download the server binary at `url` into `dir` and make it executable.
///
/// The file is named after the last segment of the URL's path and overwrites any existing file
/// of that name.
#[instrument(err)]
pub async fn download_server(url: &Url, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(binary_name(url));

    info!(%url, path = %path.display(), "Downloading minio server");

    let mut response = reqwest::get(url.clone())
        .await
        .and_then(|response| response.error_for_status())
        .context(error::DownloadSnafu { url: url.clone() })?;

    let write_context = || error::WriteServerBinarySnafu { path: path.clone() };

    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|_| write_context())?;

    let mut total = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .context(error::DownloadSnafu { url: url.clone() })?
    {
        file.write_all(&chunk)
            .await
            .with_context(|_| write_context())?;
        total += chunk.len() as u64;
    }

    file.flush().await.with_context(|_| write_context())?;
    drop(file);

    make_executable(&path).await?;

    debug!(path = %path.display(), bytes = total, "Download complete");

    Ok(path)
}

/// `chmod +x`
pub async fn make_executable(path: &Path) -> Result<()> {
    let context = || error::WriteServerBinarySnafu {
        path: path.to_owned(),
    };

    let mut permissions = tokio::fs::metadata(path)
        .await
        .with_context(|_| context())?
        .permissions();

    permissions.set_mode(permissions.mode() | 0o111);

    tokio::fs::set_permissions(path, permissions)
        .await
        .with_context(|_| context())
}

fn binary_name(url: &Url) -> &str {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("minio")
}
