//! # morpheus-cli
//!
//! Command-line client for Morpheus appliances.
//!
//! Provides commands for:
//! - Managing named remotes and logging in to them
//! - Groups, clouds and instances
//! - Archive bucket file transfer
//!
//! Every API call goes through the `morpheus-api` dispatcher, so the global
//! flags (`--dry-run`, `--timeout`, `-H`, `--insecure`) apply uniformly.
//!
//! ```text
//! ┌──────────────┐  Context   ┌────────────┐   HTTPS   ┌──────────┐
//! │ morpheus-cli │───────────►│ Dispatcher │──────────►│ Morpheus │
//! └──────────────┘            └────────────┘           └──────────┘
//!        │ remotes.toml / credentials.toml
//!        ▼
//!   ~/.morpheus
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod prompt;

pub use cli::{Cli, Commands, GlobalArgs};
pub use config::ConfigDir;
pub use context::{Context, EnvOverrides};
pub use error::CliError;
pub use output::OutputFormat;
pub use prompt::Prompter;
