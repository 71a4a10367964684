//! Interactive prompts on stdin/stderr.

use std::io::{self, BufRead, Write};

use crate::error::CliError;

/// Asks the user before destructive operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prompter {
    assume_yes: bool,
}

impl Prompter {
    /// Prompter that auto-confirms when `assume_yes` is set.
    #[must_use]
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    /// Ask `question` on the terminal.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Aborted`] unless the answer is yes.
    pub fn confirm(&self, question: &str) -> Result<(), CliError> {
        confirm(
            &mut io::stdin().lock(),
            &mut io::stderr(),
            question,
            self.assume_yes,
        )
    }

    /// Read one line from the terminal after showing `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin is closed or unreadable.
    pub fn line(&self, label: &str) -> Result<String, CliError> {
        prompt_line(&mut io::stdin().lock(), &mut io::stderr(), label)
    }
}

/// Ask a yes/no question, defaulting to no.
///
/// # Errors
///
/// Returns [`CliError::Aborted`] unless the answer is `y` or `yes`.
pub fn confirm<R, W>(
    input: &mut R,
    out: &mut W,
    question: &str,
    assume_yes: bool,
) -> Result<(), CliError>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    if assume_yes {
        return Ok(());
    }
    write!(out, "{question} (yes/no): ")?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(CliError::Aborted),
    }
}

/// Read a single trimmed line after showing `label`.
///
/// # Errors
///
/// Returns an error if the input is at EOF.
pub fn prompt_line<R, W>(input: &mut R, out: &mut W, label: &str) -> Result<String, CliError>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    write!(out, "{label}: ")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(CliError::InvalidArgument(format!(
            "{} is required",
            label.to_lowercase()
        )));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
