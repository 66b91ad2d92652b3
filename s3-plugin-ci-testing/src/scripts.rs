//! Throwaway shell scripts that stand in for the external programs the hook runs
use crate::Result;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script named `name` in `dir` with the given body
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);

    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;

    Ok(path)
}

/// A stand-in server that never answers any requests and runs until it's killed
pub fn write_unresponsive_server(dir: &Path) -> Result<PathBuf> {
    write_script(dir, "fake-minio", "exec sleep 600")
}

/// A process that ignores SIGTERM and so has to be killed
pub fn write_stubborn_process(dir: &Path) -> Result<PathBuf> {
    write_script(dir, "stubborn", "trap '' TERM\nwhile true; do sleep 1; done")
}
