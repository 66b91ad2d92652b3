//! Testing helpers for use writing unit and integration tests of the `s3-plugin-ci` crate
//!
//! This is internal to `s3-plugin-ci` and is not intended for use by any other crates.  Breaking
//! changes can be made at any time.
pub mod logging;
pub mod minio;
pub mod scripts;
pub mod tree;

/// Test code that reports errors can just cheat and use `eyre`
pub type Result<T> = color_eyre::Result<T>;
