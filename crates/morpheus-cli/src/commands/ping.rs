//! Appliance reachability check.

use std::io::Write;

use morpheus_api::resources::AccountInterface;

use super::emit_action;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, OutputFormat};

/// Ping command executor.
pub struct PingCommand<'a> {
    ctx: &'a Context,
}

impl<'a> PingCommand<'a> {
    /// Create a new ping command.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Ping the appliance. Works without logging in.
    ///
    /// # Errors
    ///
    /// Returns an error if the appliance cannot be reached.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
    ) -> Result<(), CliError> {
        let pong = AccountInterface::new(self.ctx.dispatcher()).ping().await?;
        let remote = self.ctx.remote_name();
        let url = &self.ctx.remote().url;
        emit_action(
            writer,
            format,
            pong.map(|v| {
                let version = v
                    .get("buildVersion")
                    .and_then(serde_json::Value::as_str)
                    .map(|b| format!(" (version {b})"))
                    .unwrap_or_default();
                ActionResult::new(format!("{remote} at {url} is reachable{version}"), v)
            }),
        )
    }
}
