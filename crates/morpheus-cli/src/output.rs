//! Output formatting for CLI commands.
//!
//! Every view renders either as a human-readable table or, with `--json`,
//! as the raw API payload.

use std::io::Write;

use morpheus_api::RequestDescriptor;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormat {
    json: bool,
    quiet: bool,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    /// Check if success output is suppressed.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Write a view to the output, unless quiet.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        if self.quiet {
            return Ok(());
        }
        self.write_always(writer, value)
    }

    /// Write the request a dry run would have sent. Not affected by quiet.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_dry_run<W: Write>(
        &self,
        writer: &mut W,
        request: &RequestDescriptor,
    ) -> Result<(), CliError> {
        self.write_always(writer, &DryRun::new(request))
    }

    fn write_always<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        if self.json {
            serde_json::to_writer_pretty(&mut *writer, value)
                .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
            writeln!(writer)?;
        } else {
            value.write_table(writer)?;
        }
        Ok(())
    }

    /// Write a view to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// A table column pulled from a JSON field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Header text.
    pub header: &'static str,
    /// Field of each object, `a.b` for nested fields.
    pub field: &'static str,
    /// Display width.
    pub width: usize,
}

impl Column {
    /// Column showing `field` under `header`.
    #[must_use]
    pub const fn new(header: &'static str, field: &'static str, width: usize) -> Self {
        Self {
            header,
            field,
            width,
        }
    }

    fn cell(&self, object: &Value) -> String {
        let value = self
            .field
            .split('.')
            .try_fold(object, |v, key| v.get(key))
            .unwrap_or(&Value::Null);
        truncate(&display_value(value), self.width)
    }
}

/// A page of objects from a list endpoint.
///
/// Serializes as the untouched response.
#[derive(Debug, Clone)]
pub struct ObjectList {
    plural: &'static str,
    columns: &'static [Column],
    response: Value,
}

impl ObjectList {
    /// View over `response[plural]`.
    #[must_use]
    pub const fn new(plural: &'static str, columns: &'static [Column], response: Value) -> Self {
        Self {
            plural,
            columns,
            response,
        }
    }

    fn objects(&self) -> &[Value] {
        self.response
            .get(self.plural)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    fn total(&self) -> usize {
        self.response
            .pointer("/meta/total")
            .and_then(Value::as_u64)
            .and_then(|t| usize::try_from(t).ok())
            .unwrap_or_else(|| self.objects().len())
    }
}

impl Serialize for ObjectList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.response.serialize(serializer)
    }
}

impl TableDisplay for ObjectList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let objects = self.objects();
        if objects.is_empty() {
            writeln!(writer, "No {} found", self.plural)?;
            return Ok(());
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{:<width$}", c.header, width = c.width))
            .collect();
        writeln!(writer, "{}", header.join("  ").trim_end())?;
        let rule: usize = self.columns.iter().map(|c| c.width + 2).sum();
        writeln!(writer, "{}", "─".repeat(rule.saturating_sub(2)))?;

        for object in objects {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|c| format!("{:<width$}", c.cell(object), width = c.width))
                .collect();
            writeln!(writer, "{}", row.join("  ").trim_end())?;
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "Showing {} of {} {}",
            objects.len(),
            self.total(),
            self.plural
        )?;
        Ok(())
    }
}

/// A single object from a get endpoint.
///
/// Serializes as the untouched response.
#[derive(Debug, Clone)]
pub struct ObjectDetail {
    singular: &'static str,
    response: Value,
}

impl ObjectDetail {
    /// View over `response[singular]`.
    #[must_use]
    pub const fn new(singular: &'static str, response: Value) -> Self {
        Self { singular, response }
    }
}

impl Serialize for ObjectDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.response.serialize(serializer)
    }
}

impl TableDisplay for ObjectDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let object = self.response.get(self.singular).unwrap_or(&self.response);
        let Some(fields) = object.as_object() else {
            writeln!(writer, "{}", display_value(object))?;
            return Ok(());
        };

        let title = object
            .get("name")
            .and_then(Value::as_str)
            .map_or_else(
                || capitalize(self.singular),
                |n| format!("{} {n}", capitalize(self.singular)),
            );
        writeln!(writer, "{title}")?;
        writeln!(writer, "{}", "═".repeat(title.chars().count().max(34)))?;

        let width = fields.keys().map(String::len).max().unwrap_or(0) + 1;
        for (key, value) in fields {
            if value.is_array() || (value.is_object() && value.get("name").is_none()) {
                continue;
            }
            let label = format!("{key}:");
            writeln!(writer, "{label:<width$}  {}", display_value(value), width = width)?;
        }
        Ok(())
    }
}

/// Status message for commands without a meaningful payload.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

/// Outcome of an action endpoint such as start or delete.
///
/// Serializes as the untouched response.
#[derive(Debug, Clone)]
pub struct ActionResult {
    message: String,
    response: Value,
}

impl ActionResult {
    /// Outcome described by `message` when the appliance reports success.
    #[must_use]
    pub fn new(message: impl Into<String>, response: Value) -> Self {
        Self {
            message: message.into(),
            response,
        }
    }

    /// Whether the appliance reported success. A body without a `success`
    /// flag counts as success.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.response
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Fail with [`CliError::Rejected`] when the appliance reported failure.
    ///
    /// # Errors
    ///
    /// Returns the appliance's `msg` as a rejection.
    pub fn ensure_succeeded(&self) -> Result<(), CliError> {
        if self.succeeded() {
            return Ok(());
        }
        Err(CliError::Rejected(self.reason().to_string()))
    }

    fn reason(&self) -> &str {
        self.response
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("request was not successful")
    }
}

impl Serialize for ActionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.response.serialize(serializer)
    }
}

impl TableDisplay for ActionResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.succeeded() {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "✗ {}", self.reason())?;
        }
        Ok(())
    }
}

/// The request a dry run stopped short of sending, credentials masked.
#[derive(Debug, Clone, Serialize)]
pub struct DryRun {
    request: RequestDescriptor,
}

impl DryRun {
    /// View over a redacted copy of `request`.
    #[must_use]
    pub fn new(request: &RequestDescriptor) -> Self {
        Self {
            request: request.redacted(),
        }
    }
}

impl TableDisplay for DryRun {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let request = &self.request;
        let method = request.method.map_or("(none)", |m| m.as_str());
        writeln!(writer, "DRY RUN")?;
        writeln!(writer, "{} {}", method.to_uppercase(), request.url)?;
        for (name, value) in request.headers.iter() {
            writeln!(writer, "  {name}: {value}")?;
        }
        if let Some(params) = request.headers.params().filter(|p| !p.is_empty()) {
            writeln!(writer, "Params:")?;
            for (key, value) in params {
                writeln!(writer, "  {key}={value}")?;
            }
        }
        if let Some(payload) = &request.payload {
            let body = serde_json::to_string_pretty(payload)
                .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
            writeln!(writer, "Body:")?;
            writeln!(writer, "{body}")?;
        }
        if !request.verify_ssl {
            writeln!(writer, "(TLS verification disabled)")?;
        }
        Ok(())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_string),
        other => other.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
