//! Filetree CLI library.
//!
//! Mirrors a local directory through the file tree engine. The modules are
//! exposed so the commands can be tested without spawning the binary.
//!
//! - [`local_fs`]: `tokio::fs` backend of the engine
//! - [`config`]: TOML configuration loading
//! - [`commands`]: subcommand implementations
//! - [`formatters`]: JSON, text and pretty output

#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod formatters;
pub mod local_fs;
pub mod output;

pub use local_fs::LocalFileSystem;
pub use output::{ExitCode, OutputFormat};
