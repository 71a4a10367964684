//! Group management commands.

use std::io::Write;

use morpheus_api::resources::{self, GROUPS};
use morpheus_api::{Dispatch, Params};
use serde_json::{Map, Value};

use super::{confirm, emit, emit_action, find, list_filter, resolve_id};
use crate::cli::GroupCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, Column, ObjectDetail, ObjectList, OutputFormat};
use crate::prompt::Prompter;

const COLUMNS: &[Column] = &[
    Column::new("ID", "id", 6),
    Column::new("NAME", "name", 24),
    Column::new("LOCATION", "location", 16),
    Column::new("CODE", "code", 12),
];

/// Group command executor.
pub struct GroupsCommand<'a> {
    ctx: &'a Context,
    prompter: Prompter,
}

impl<'a> GroupsCommand<'a> {
    /// Create a new group command.
    #[must_use]
    pub const fn new(ctx: &'a Context, prompter: Prompter) -> Self {
        Self { ctx, prompter }
    }

    /// Execute a group subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &GroupCommands,
    ) -> Result<(), CliError> {
        let groups = resources::groups(self.ctx.require_login()?);

        match command {
            GroupCommands::List(args) => {
                let page = groups.list(&list_filter(args)).await?;
                emit(writer, format, page.map(|v| ObjectList::new(GROUPS.plural, COLUMNS, v)))
            }
            GroupCommands::Get { group } => {
                let found = find(&groups, group).await?;
                emit(writer, format, found.map(|v| ObjectDetail::new(GROUPS.singular, v)))
            }
            GroupCommands::Add {
                name,
                location,
                code,
            } => {
                let payload = group_payload(Some(name), location.as_deref(), code.as_deref());
                let created = groups.create(payload).await?;
                emit(writer, format, created.map(|v| ObjectDetail::new(GROUPS.singular, v)))
            }
            GroupCommands::Update {
                group,
                name,
                location,
            } => {
                let payload = group_payload(name.as_ref(), location.as_deref(), None);
                if payload.as_object().is_some_and(Map::is_empty) {
                    return Err(CliError::InvalidArgument(
                        "nothing to update, pass --name or --location".into(),
                    ));
                }
                let id = match resolve_id(&groups, group).await? {
                    Dispatch::Dispatched(id) => id,
                    Dispatch::WouldDispatch(lookup) => return format.write_dry_run(writer, &lookup),
                };
                let updated = groups.update(&id, payload).await?;
                emit(writer, format, updated.map(|v| ObjectDetail::new(GROUPS.singular, v)))
            }
            GroupCommands::Remove { group } => {
                confirm(
                    self.ctx,
                    self.prompter,
                    &format!("Are you sure you want to delete group {group}?"),
                )?;
                let id = match resolve_id(&groups, group).await? {
                    Dispatch::Dispatched(id) => id,
                    Dispatch::WouldDispatch(lookup) => return format.write_dry_run(writer, &lookup),
                };
                let removed = groups.destroy(&id, &Params::new()).await?;
                emit_action(
                    writer,
                    format,
                    removed.map(|v| ActionResult::new(format!("Group {group} deleted"), v)),
                )
            }
        }
    }
}

fn group_payload(name: Option<&String>, location: Option<&str>, code: Option<&str>) -> Value {
    let mut group = Map::new();
    if let Some(name) = name {
        group.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(location) = location {
        group.insert("location".into(), Value::String(location.to_string()));
    }
    if let Some(code) = code {
        group.insert("code".into(), Value::String(code.to_string()));
    }
    Value::Object(group)
}
