//! Cloud management commands.

use std::io::Write;

use morpheus_api::resources::{self, CLOUDS};
use morpheus_api::{Dispatch, Params};

use super::{confirm, emit, emit_action, find, list_filter, resolve_id};
use crate::cli::CloudCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, Column, ObjectDetail, ObjectList, OutputFormat};
use crate::prompt::Prompter;

const COLUMNS: &[Column] = &[
    Column::new("ID", "id", 6),
    Column::new("NAME", "name", 24),
    Column::new("TYPE", "zoneType.name", 16),
    Column::new("LOCATION", "location", 16),
    Column::new("STATUS", "status", 10),
];

/// Cloud command executor.
pub struct CloudsCommand<'a> {
    ctx: &'a Context,
    prompter: Prompter,
}

impl<'a> CloudsCommand<'a> {
    /// Create a new cloud command.
    #[must_use]
    pub const fn new(ctx: &'a Context, prompter: Prompter) -> Self {
        Self { ctx, prompter }
    }

    /// Execute a cloud subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &CloudCommands,
    ) -> Result<(), CliError> {
        let clouds = resources::clouds(self.ctx.require_login()?);

        match command {
            CloudCommands::List(args) => {
                let page = clouds.list(&list_filter(args)).await?;
                emit(writer, format, page.map(|v| ObjectList::new(CLOUDS.plural, COLUMNS, v)))
            }
            CloudCommands::Get { cloud } => {
                let found = find(&clouds, cloud).await?;
                emit(writer, format, found.map(|v| ObjectDetail::new(CLOUDS.singular, v)))
            }
            CloudCommands::Remove { cloud } => {
                confirm(
                    self.ctx,
                    self.prompter,
                    &format!("Are you sure you want to delete cloud {cloud}?"),
                )?;
                let id = match resolve_id(&clouds, cloud).await? {
                    Dispatch::Dispatched(id) => id,
                    Dispatch::WouldDispatch(lookup) => return format.write_dry_run(writer, &lookup),
                };
                let removed = clouds.destroy(&id, &Params::new()).await?;
                emit_action(
                    writer,
                    format,
                    removed.map(|v| ActionResult::new(format!("Cloud {cloud} deleted"), v)),
                )
            }
        }
    }
}
