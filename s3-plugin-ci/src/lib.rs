#![doc = include_str!("../README.md")]

pub mod artifacts;
mod command;
mod config;
mod error;
pub mod fixture;
pub mod hook;
pub mod install;
pub mod platform;
pub mod process;
pub mod runner;

pub use command::display_argv;
pub use config::{Config, DEFAULT_MINIO_URL};
pub use error::{HookError, Result};
