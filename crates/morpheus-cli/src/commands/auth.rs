//! Login, logout and whoami.

use std::io::Write;

use chrono::Utc;
use morpheus_api::Dispatch;
use morpheus_api::resources::{AccountInterface, AuthInterface};
use tracing::info;

use super::{confirm, emit};
use crate::cli::LoginArgs;
use crate::config::StoredToken;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, ObjectDetail, OutputFormat};
use crate::prompt::Prompter;

/// Authentication command executor.
pub struct AuthCommand<'a> {
    ctx: &'a Context,
    prompter: Prompter,
}

impl<'a> AuthCommand<'a> {
    /// Create a new auth command.
    #[must_use]
    pub const fn new(ctx: &'a Context, prompter: Prompter) -> Self {
        Self { ctx, prompter }
    }

    /// Obtain and store a token for the current remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or cannot be saved.
    pub async fn login<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &LoginArgs,
    ) -> Result<(), CliError> {
        let remote = self.ctx.remote_name();

        if let Some(token) = &args.token {
            if token.trim().is_empty() {
                return Err(CliError::InvalidArgument("token cannot be empty".into()));
            }
            let stored = StoredToken {
                access_token: token.trim().to_string(),
                refresh_token: None,
                username: None,
                expires_at: None,
            };
            return self.store(writer, format, stored, "Stored access token".into());
        }

        let auth = AuthInterface::new(self.ctx.dispatcher());
        let (grant, username) = if args.refresh {
            let previous = self.ctx.token();
            let refresh_token = previous
                .and_then(|t| t.refresh_token.as_deref())
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("no refresh token stored for {remote}"))
                })?;
            let username = previous.and_then(|t| t.username.clone());
            (auth.refresh(refresh_token).await?, username)
        } else {
            let username = match &args.username {
                Some(u) => u.clone(),
                None => self.prompter.line("Username")?,
            };
            let password = match &args.password {
                Some(p) => p.clone(),
                None => self.prompter.line("Password")?,
            };
            (auth.login(&username, &password).await?, Some(username))
        };

        match grant {
            Dispatch::WouldDispatch(request) => format.write_dry_run(writer, &request),
            Dispatch::Dispatched(grant) => {
                let message = match &username {
                    Some(user) => format!("Logged in to {remote} as {user}"),
                    None => format!("Logged in to {remote}"),
                };
                let stored = StoredToken::from_grant(grant, username, Utc::now());
                self.store(writer, format, stored, message)
            }
        }
    }

    /// Forget the stored token for the current remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the user declines or credentials cannot be saved.
    pub fn logout<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let remote = self.ctx.remote_name();
        let config = self.ctx.config();
        let mut credentials = config.load_credentials()?;
        if credentials.get(remote).is_none() {
            return format.write(writer, &Message::info(format!("Not logged in to {remote}")));
        }

        confirm(
            self.ctx,
            self.prompter,
            &format!("Are you sure you want to log out of {remote}?"),
        )?;
        if self.ctx.is_dry_run() {
            return format.write(
                writer,
                &Message::info(format!("Dry run, token for {remote} kept")),
            );
        }

        credentials.remove(remote);
        config.save_credentials(&credentials)?;
        info!(remote, "logged out");
        format.write(writer, &Message::success(format!("Logged out of {remote}")))
    }

    /// Show the user the stored token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in or the request fails.
    pub async fn whoami<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
    ) -> Result<(), CliError> {
        let account = AccountInterface::new(self.ctx.require_login()?);
        let me = account.whoami().await?;
        emit(writer, format, me.map(|v| ObjectDetail::new("user", v)))
    }

    fn store<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        token: StoredToken,
        message: String,
    ) -> Result<(), CliError> {
        let remote = self.ctx.remote_name();
        if self.ctx.is_dry_run() {
            return format.write(
                writer,
                &Message::info(format!("Dry run, token for {remote} not stored")),
            );
        }

        let config = self.ctx.config();
        let mut credentials = config.load_credentials()?;
        credentials.set(remote, token);
        config.save_credentials(&credentials)?;
        info!(remote, "stored access token");
        format.write(writer, &Message::success(message))
    }
}
