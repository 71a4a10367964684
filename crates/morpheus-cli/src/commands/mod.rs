//! Command implementations.
//!
//! Each command type borrows the resolved [`Context`] and renders its
//! result through [`OutputFormat`]. Dry runs print the request instead.

mod archives;
mod auth;
mod clouds;
mod groups;
mod instances;
mod ping;
mod remote;

pub use archives::ArchivesCommand;
pub use auth::AuthCommand;
pub use clouds::CloudsCommand;
pub use groups::GroupsCommand;
pub use instances::InstancesCommand;
pub use ping::PingCommand;
pub use remote::RemoteCommand;

use std::io::Write;

use morpheus_api::{Dispatch, Error as ApiError, ListFilter, ResourceInterface};
use serde::Serialize;
use serde_json::Value;

use crate::cli::ListArgs;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, OutputFormat, TableDisplay};
use crate::prompt::Prompter;

/// Print a dispatched view, or the request a dry run would have sent.
pub(crate) fn emit<W, T>(
    writer: &mut W,
    format: &OutputFormat,
    result: Dispatch<T>,
) -> Result<(), CliError>
where
    W: Write,
    T: Serialize + TableDisplay,
{
    match result {
        Dispatch::Dispatched(view) => format.write(writer, &view),
        Dispatch::WouldDispatch(request) => format.write_dry_run(writer, &request),
    }
}

/// Like [`emit`], then fail if the appliance reported `success: false`.
pub(crate) fn emit_action<W: Write>(
    writer: &mut W,
    format: &OutputFormat,
    result: Dispatch<ActionResult>,
) -> Result<(), CliError> {
    match result {
        Dispatch::Dispatched(action) => {
            format.write(writer, &action)?;
            action.ensure_succeeded()
        }
        Dispatch::WouldDispatch(request) => format.write_dry_run(writer, &request),
    }
}

/// Ask before a destructive call. Dry runs never prompt.
pub(crate) fn confirm(ctx: &Context, prompter: Prompter, question: &str) -> Result<(), CliError> {
    if ctx.is_dry_run() {
        return Ok(());
    }
    prompter.confirm(question)
}

/// List filter from the paging flags.
pub(crate) fn list_filter(args: &ListArgs) -> ListFilter {
    ListFilter {
        max: args.max,
        offset: args.offset,
        phrase: args.phrase.clone(),
        ..ListFilter::default()
    }
}

/// Whether an argument is a numeric id rather than a name.
pub(crate) fn is_id(id_or_name: &str) -> bool {
    id_or_name.trim().parse::<u64>().is_ok()
}

/// Fetch one object by id or, for non-numeric arguments, by exact name.
pub(crate) async fn find(
    resource: &ResourceInterface<'_>,
    id_or_name: &str,
) -> Result<Dispatch<Value>, CliError> {
    let found = if is_id(id_or_name) {
        resource.get_by_id(id_or_name.trim()).await?
    } else {
        resource.get_by_name(id_or_name).await?
    };
    Ok(found)
}

/// Resolve an id-or-name argument to an id.
///
/// Numeric arguments are used as is; names cost one lookup, which in a dry
/// run is the request that gets printed.
pub(crate) async fn resolve_id(
    resource: &ResourceInterface<'_>,
    id_or_name: &str,
) -> Result<Dispatch<String>, CliError> {
    if is_id(id_or_name) {
        return Ok(Dispatch::Dispatched(id_or_name.trim().to_string()));
    }
    let singular = resource.kind().singular;
    let resolved = resource
        .get_by_name(id_or_name)
        .await?
        .and_then(|found| object_id(&found, singular))?;
    Ok(resolved)
}

fn object_id(found: &Value, singular: &str) -> Result<String, ApiError> {
    match found.get(singular).and_then(|o| o.get("id")) {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ApiError::UnexpectedResponse {
            reason: format!("{singular} has no id"),
        }),
    }
}
