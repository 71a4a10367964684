//! Instance management commands.

use std::io::Write;

use morpheus_api::resources::{INSTANCES, InstancesInterface};
use morpheus_api::{Dispatch, Params};

use super::{confirm, emit, emit_action, find, list_filter, resolve_id};
use crate::cli::InstanceCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, Column, ObjectDetail, ObjectList, OutputFormat};
use crate::prompt::Prompter;

const COLUMNS: &[Column] = &[
    Column::new("ID", "id", 6),
    Column::new("NAME", "name", 24),
    Column::new("TYPE", "instanceType.name", 14),
    Column::new("GROUP", "group.name", 14),
    Column::new("CLOUD", "cloud.name", 14),
    Column::new("STATUS", "status", 10),
];

#[derive(Debug, Clone, Copy)]
enum Action {
    Start,
    Stop,
    Restart,
}

/// Instance command executor.
pub struct InstancesCommand<'a> {
    ctx: &'a Context,
    prompter: Prompter,
}

impl<'a> InstancesCommand<'a> {
    /// Create a new instance command.
    #[must_use]
    pub const fn new(ctx: &'a Context, prompter: Prompter) -> Self {
        Self { ctx, prompter }
    }

    /// Execute an instance subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &InstanceCommands,
    ) -> Result<(), CliError> {
        let instances = InstancesInterface::new(self.ctx.require_login()?);

        match command {
            InstanceCommands::List(args) => {
                let page = instances.list(&list_filter(args)).await?;
                emit(writer, format, page.map(|v| ObjectList::new(INSTANCES.plural, COLUMNS, v)))
            }
            InstanceCommands::Get { instance } => {
                let found = find(&instances, instance).await?;
                emit(writer, format, found.map(|v| ObjectDetail::new(INSTANCES.singular, v)))
            }
            InstanceCommands::Start { instance } => {
                self.act(writer, format, &instances, instance, Action::Start).await
            }
            InstanceCommands::Stop { instance } => {
                confirm(
                    self.ctx,
                    self.prompter,
                    &format!("Are you sure you want to stop instance {instance}?"),
                )?;
                self.act(writer, format, &instances, instance, Action::Stop).await
            }
            InstanceCommands::Restart { instance } => {
                confirm(
                    self.ctx,
                    self.prompter,
                    &format!("Are you sure you want to restart instance {instance}?"),
                )?;
                self.act(writer, format, &instances, instance, Action::Restart).await
            }
            InstanceCommands::Remove { instance, force } => {
                confirm(
                    self.ctx,
                    self.prompter,
                    &format!("Are you sure you want to delete instance {instance}?"),
                )?;
                let id = match resolve_id(&instances, instance).await? {
                    Dispatch::Dispatched(id) => id,
                    Dispatch::WouldDispatch(lookup) => return format.write_dry_run(writer, &lookup),
                };
                let mut params = Params::new();
                if *force {
                    params.insert("force".into(), "on".into());
                }
                let removed = instances.destroy(&id, &params).await?;
                emit_action(
                    writer,
                    format,
                    removed.map(|v| ActionResult::new(format!("Instance {instance} deleted"), v)),
                )
            }
        }
    }

    async fn act<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        instances: &InstancesInterface<'_>,
        instance: &str,
        action: Action,
    ) -> Result<(), CliError> {
        let id = match resolve_id(instances, instance).await? {
            Dispatch::Dispatched(id) => id,
            Dispatch::WouldDispatch(lookup) => return format.write_dry_run(writer, &lookup),
        };
        let (result, verb) = match action {
            Action::Start => (instances.start(&id).await?, "starting"),
            Action::Stop => (instances.stop(&id).await?, "stopping"),
            Action::Restart => (instances.restart(&id).await?, "restarting"),
        };
        emit_action(
            writer,
            format,
            result.map(|v| ActionResult::new(format!("Instance {instance} {verb}"), v)),
        )
    }
}
