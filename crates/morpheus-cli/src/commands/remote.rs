//! Remote appliance registry commands.
//!
//! These only touch the CLI home directory; nothing is sent.

use std::io::Write;

use serde::Serialize;
use tracing::info;

use crate::cli::RemoteCommands;
use crate::config::{ConfigDir, Remote};
use crate::error::CliError;
use crate::output::{Message, OutputFormat, TableDisplay};
use crate::prompt::Prompter;

/// One row of `remote list`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteEntry {
    /// Remote name.
    pub name: String,
    /// Appliance URL.
    pub url: String,
    /// TLS verification disabled.
    pub insecure: bool,
    /// Currently selected.
    pub active: bool,
    /// A token is stored.
    pub logged_in: bool,
}

/// Configured remotes for display.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteList {
    /// Remotes in name order.
    pub remotes: Vec<RemoteEntry>,
}

impl TableDisplay for RemoteList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.remotes.is_empty() {
            writeln!(writer, "No remotes configured")?;
            return Ok(());
        }

        writeln!(writer, "  {:<16}  {:<40}  {:<9}", "NAME", "URL", "LOGGED IN")?;
        writeln!(writer, "{}", "─".repeat(71))?;
        for remote in &self.remotes {
            let marker = if remote.active { '*' } else { ' ' };
            let mut url = remote.url.clone();
            if remote.insecure {
                url.push_str(" (insecure)");
            }
            writeln!(
                writer,
                "{marker} {:<16}  {:<40}  {}",
                remote.name,
                url,
                if remote.logged_in { "yes" } else { "no" }
            )?;
        }
        Ok(())
    }
}

/// Remote command executor.
pub struct RemoteCommand<'a> {
    config: &'a ConfigDir,
    prompter: Prompter,
    insecure: bool,
}

impl<'a> RemoteCommand<'a> {
    /// Create a new remote command. `insecure` marks added remotes as
    /// skipping TLS verification.
    #[must_use]
    pub const fn new(config: &'a ConfigDir, prompter: Prompter, insecure: bool) -> Self {
        Self {
            config,
            prompter,
            insecure,
        }
    }

    /// Execute a remote subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or written, or the
    /// named remote does not exist.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &RemoteCommands,
    ) -> Result<(), CliError> {
        let mut registry = self.config.load_remotes()?;

        match command {
            RemoteCommands::List => {
                let credentials = self.config.load_credentials()?;
                let remotes = registry
                    .remotes
                    .iter()
                    .map(|(name, remote)| RemoteEntry {
                        name: name.clone(),
                        url: remote.url.clone(),
                        insecure: remote.insecure,
                        active: registry.active.as_deref() == Some(name.as_str()),
                        logged_in: credentials.get(name).is_some(),
                    })
                    .collect();
                format.write(writer, &RemoteList { remotes })
            }
            RemoteCommands::Add {
                name,
                url,
                make_active,
            } => {
                let remote = Remote {
                    url: url.trim_end_matches('/').to_string(),
                    insecure: self.insecure,
                };
                registry.add(name, remote)?;
                if *make_active {
                    registry.set_active(name)?;
                }
                self.config.save_remotes(&registry)?;
                info!(remote = %name, "added remote");
                format.write(writer, &Message::success(format!("Added remote {name}")))
            }
            RemoteCommands::Use { name } => {
                registry.set_active(name)?;
                self.config.save_remotes(&registry)?;
                format.write(writer, &Message::success(format!("Using remote {name}")))
            }
            RemoteCommands::Remove { name } => {
                if registry.get(name).is_none() {
                    return Err(CliError::RemoteNotFound(name.clone()));
                }
                self.prompter
                    .confirm(&format!("Are you sure you want to remove remote {name}?"))?;
                registry.remove(name)?;
                self.config.save_remotes(&registry)?;

                let mut credentials = self.config.load_credentials()?;
                if credentials.remove(name).is_some() {
                    self.config.save_credentials(&credentials)?;
                }
                info!(remote = %name, "removed remote");
                format.write(writer, &Message::success(format!("Removed remote {name}")))
            }
            RemoteCommands::Current => {
                let (name, remote) = registry.select(None)?;
                format.write(writer, &Message::info(format!("{name} {}", remote.url)))
            }
        }
    }
}
