//! Locating a real minio server binary for the tests that need one
use std::path::PathBuf;
use which::which;

/// Find the minio binary to use in tests.
///
/// First the env var `MINIO_PATH` is checked, and if that's not set then `minio` is looked up in
/// the `PATH`.  Tests that need a live minio are `#[ignore]`d, so this is only reached when
/// someone explicitly runs them.
pub fn find_minio() -> Option<PathBuf> {
    std::env::var_os("MINIO_PATH")
        .map(PathBuf::from)
        .or_else(|| which("minio").ok())
}

/// Like [`find_minio`] but panics with a helpful message if there's no minio binary
pub fn require_minio() -> PathBuf {
    find_minio().unwrap_or_else(|| {
        panic!("Unable to find `minio`, either set the MINIO_PATH env var or place the Minio executable in your PATH")
    })
}

/// Find a free TCP port on localhost for a test server to listen on
pub fn free_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);

    Ok(port)
}
