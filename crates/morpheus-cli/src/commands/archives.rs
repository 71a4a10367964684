//! Archive file transfer commands.

use std::io::Write;

use morpheus_api::resources::ArchivesInterface;

use super::{emit, emit_action};
use crate::cli::ArchiveCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, Message, OutputFormat};

/// Archive command executor.
pub struct ArchivesCommand<'a> {
    ctx: &'a Context,
}

impl<'a> ArchivesCommand<'a> {
    /// Create a new archive command.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Execute an archive subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &ArchiveCommands,
    ) -> Result<(), CliError> {
        let archives = ArchivesInterface::new(self.ctx.require_login()?);

        match command {
            ArchiveCommands::Upload {
                bucket,
                remote_path,
                file,
            } => {
                let uploaded = archives.upload_file(bucket, remote_path, file).await?;
                let message = format!("Uploaded {} to {bucket}:{remote_path}", file.display());
                emit_action(writer, format, uploaded.map(|v| ActionResult::new(message, v)))
            }
            ArchiveCommands::Download {
                bucket,
                remote_path,
                dest,
            } => {
                let written = archives.download_file(bucket, remote_path, dest).await?;
                emit(
                    writer,
                    format,
                    written.map(|bytes| {
                        Message::success(format!(
                            "Downloaded {bucket}:{remote_path} to {} ({bytes} bytes)",
                            dest.display()
                        ))
                    }),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{context, output};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn upload_posts_file_into_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("backup.tgz");
        std::fs::write(&file, b"archive bytes").expect("write");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/archives/buckets/ops/files/nightly/"))
            .and(query_param("filename", "backup.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let (_home, ctx) = context(&server.uri(), false);
        let mut buf = Vec::new();
        ArchivesCommand::new(&ctx)
            .execute(
                &mut buf,
                &OutputFormat::default(),
                &ArchiveCommands::Upload {
                    bucket: "ops".into(),
                    remote_path: "nightly/".into(),
                    file: file.clone(),
                },
            )
            .await
            .expect("upload");
        assert!(output(buf).contains("to ops:nightly/"));
    }

    #[tokio::test]
    async fn download_writes_into_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/archives/download/ops/nightly/backup.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()))
            .mount(&server)
            .await;

        let (_home, ctx) = context(&server.uri(), false);
        let mut buf = Vec::new();
        ArchivesCommand::new(&ctx)
            .execute(
                &mut buf,
                &OutputFormat::default(),
                &ArchiveCommands::Download {
                    bucket: "ops".into(),
                    remote_path: "nightly/backup.tgz".into(),
                    dest: dir.path().to_path_buf(),
                },
            )
            .await
            .expect("download");

        let saved = std::fs::read(dir.path().join("backup.tgz")).expect("read");
        assert_eq!(saved, b"0123456789");
        assert!(output(buf).contains("(10 bytes)"));
    }

    #[tokio::test]
    async fn missing_local_file_is_usage_error() {
        let (_home, ctx) = context("https://h", true);
        let mut buf = Vec::new();
        let err = ArchivesCommand::new(&ctx)
            .execute(
                &mut buf,
                &OutputFormat::default(),
                &ArchiveCommands::Upload {
                    bucket: "ops".into(),
                    remote_path: "x".into(),
                    file: "/definitely/not/here".into(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
    }
}
