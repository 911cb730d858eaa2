//! Backstroke poller CLI library.
//!
//! Argument parsing, settings resolution and the `run`, `once`, `status` and
//! `report` commands behind the `backstroke-poller` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Command};
pub use config::Settings;
pub use error::{CliError, Result};
