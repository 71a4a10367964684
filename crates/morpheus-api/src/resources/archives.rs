//! Archive buckets: streamed file upload and download.

use std::path::{Path, PathBuf};

use serde_json::Value;
use url::Url;

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::{Error, Result, require};
use crate::options::CallOptions;
use crate::request::RequestSpec;

/// Archive file transfer interface.
#[derive(Debug, Clone)]
pub struct ArchivesInterface<'a> {
    dispatcher: &'a Dispatcher,
    options: CallOptions,
}

impl<'a> ArchivesInterface<'a> {
    /// Interface on `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            options: CallOptions::default(),
        }
    }

    /// Call options applied to every request from this interface.
    #[must_use]
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Upload `local_file` to `remote_path` in `bucket`.
    ///
    /// A `remote_path` ending in `/` is a directory and keeps the local file
    /// name.
    pub async fn upload_file(
        &self,
        bucket: &str,
        remote_path: &str,
        local_file: &Path,
    ) -> Result<Dispatch<Value>> {
        let bucket = require("bucket", bucket)?;
        let remote_path = require("remote path", remote_path)?;
        if !local_file.is_file() {
            return Err(Error::InvalidArgument {
                reason: format!("file not found: {}", local_file.display()),
            });
        }

        let (dir, filename) = split_remote_path(remote_path, local_file)?;
        let bucket = encode_path(bucket)?;
        let dir = encode_path(&dir)?;
        let spec = RequestSpec::post(format!("/api/archives/buckets/{bucket}/files{dir}"))
            .query("filename", filename)
            .file(local_file);
        self.dispatcher.execute_json(spec, &self.options).await
    }

    /// Download `remote_path` from `bucket` into `dest`.
    ///
    /// If `dest` is an existing directory the remote file name is kept.
    /// Returns the number of bytes written.
    pub async fn download_file(
        &self,
        bucket: &str,
        remote_path: &str,
        dest: &Path,
    ) -> Result<Dispatch<u64>> {
        let bucket = require("bucket", bucket)?;
        let remote_path = require("remote path", remote_path.trim_start_matches('/'))?;
        if dest.as_os_str().is_empty() {
            return Err(Error::MissingArgument { name: "destination" });
        }

        let dest = resolve_destination(remote_path, dest)?;
        let path = encode_path(&format!("{bucket}/{remote_path}"))?;
        let spec = RequestSpec::get(format!("/api/archives/download/{path}"));
        self.dispatcher.download(spec, &self.options, &dest).await
    }
}

fn split_remote_path(remote_path: &str, local_file: &Path) -> Result<(String, String)> {
    let remote_path = format!("/{}", remote_path.trim_start_matches('/'));
    if remote_path.ends_with('/') {
        let filename = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidArgument {
                reason: format!("no file name in {}", local_file.display()),
            })?;
        return Ok((remote_path, filename.to_string()));
    }

    // Non-empty after the leading slash, so a file name always exists.
    let split = remote_path.rfind('/').unwrap_or(0);
    let (dir, filename) = remote_path.split_at(split + 1);
    Ok((dir.to_string(), filename.to_string()))
}

/// Percent-encode each `/`-separated segment, keeping the separators.
fn encode_path(path: &str) -> Result<String> {
    let mut url = Url::parse("http://localhost/").map_err(|source| Error::InvalidUrl {
        url: path.to_string(),
        source,
    })?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidArgument {
            reason: format!("cannot encode path {path}"),
        })?
        .clear()
        .extend(path.split('/'));
    // Drop the root slash the placeholder URL always carries.
    let encoded = url.path();
    if path.starts_with('/') {
        return Ok(encoded.to_string());
    }
    Ok(encoded.strip_prefix('/').unwrap_or(encoded).to_string())
}

fn resolve_destination(remote_path: &str, dest: &Path) -> Result<PathBuf> {
    if !dest.is_dir() {
        return Ok(dest.to_path_buf());
    }
    let name = remote_path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidArgument {
            reason: format!("no file name in remote path {remote_path}"),
        })?;
    Ok(dest.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, Payload};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dry_dispatcher() -> Dispatcher {
        let mut d = Dispatcher::new("https://h").expect("valid url");
        d.set_dry_run(true);
        d
    }

    #[test]
    fn remote_path_splits_into_dir_and_name() {
        let local = Path::new("/tmp/app.tar");
        assert_eq!(
            split_remote_path("releases/", local).expect("split"),
            ("/releases/".to_string(), "app.tar".to_string())
        );
        assert_eq!(
            split_remote_path("/releases/v2.tar", local).expect("split"),
            ("/releases/".to_string(), "v2.tar".to_string())
        );
        assert_eq!(
            split_remote_path("v2.tar", local).expect("split"),
            ("/".to_string(), "v2.tar".to_string())
        );
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_path("/releases/").expect("encode"), "/releases/");
        assert_eq!(
            encode_path("builds/reports/q1#final.csv").expect("encode"),
            "builds/reports/q1%23final.csv"
        );
        assert_eq!(
            encode_path("notes?v=2 draft.txt").expect("encode"),
            "notes%3Fv=2%20draft.txt"
        );
    }

    #[tokio::test]
    async fn download_url_keeps_reserved_characters_in_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let d = dry_dispatcher();
        let archives = ArchivesInterface::new(&d);

        let result = archives
            .download_file("builds", "reports/q1#final.csv", dir.path())
            .await
            .expect("dry run");
        let request = result.descriptor().expect("descriptor");
        assert_eq!(
            request.url,
            "https://h/api/archives/download/builds/reports/q1%23final.csv"
        );

        let result = archives
            .download_file("builds", "notes?v=2.txt", dir.path())
            .await
            .expect("dry run");
        let request = result.descriptor().expect("descriptor");
        assert_eq!(request.url, "https://h/api/archives/download/builds/notes%3Fv=2.txt");
        assert!(request.headers.params().is_none());
    }

    #[tokio::test]
    async fn upload_dry_run_describes_stream() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("app.tar");
        std::fs::write(&src, b"data").expect("write");

        let d = dry_dispatcher();
        let result = ArchivesInterface::new(&d)
            .upload_file("builds", "releases/", &src)
            .await
            .expect("dry run");
        let request = result.descriptor().expect("descriptor");
        assert_eq!(request.method, Some(Method::Post));
        assert_eq!(request.url, "https://h/api/archives/buckets/builds/files/releases/");
        assert_eq!(
            request.headers.params().and_then(|p| p.get("filename")).map(String::as_str),
            Some("app.tar")
        );
        assert_eq!(request.payload, Some(Payload::File { path: src }));
    }

    #[tokio::test]
    async fn upload_rejects_missing_file_and_blank_args() {
        let d = dry_dispatcher();
        let archives = ArchivesInterface::new(&d);
        let missing = Path::new("/definitely/not/here.tar");
        assert!(matches!(
            archives.upload_file("b", "x/", missing).await,
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            archives.upload_file("", "x/", missing).await,
            Err(Error::MissingArgument { name: "bucket" })
        ));
    }

    #[tokio::test]
    async fn download_rejects_blank_destination() {
        let d = dry_dispatcher();
        let err = ArchivesInterface::new(&d)
            .download_file("b", "f.bin", Path::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingArgument { name: "destination" }));
    }

    #[tokio::test]
    async fn download_into_directory_keeps_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/archives/download/builds/releases/v2.tar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tarball".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let written = ArchivesInterface::new(&d)
            .download_file("builds", "/releases/v2.tar", dir.path())
            .await
            .expect("download")
            .dispatched();
        assert_eq!(written, Some(7));
        assert_eq!(
            std::fs::read(dir.path().join("v2.tar")).expect("read"),
            b"tarball"
        );
    }

    #[tokio::test]
    async fn upload_sends_filename_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/archives/buckets/builds/files/"))
            .and(query_param("filename", "v3.tar"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("local.tar");
        std::fs::write(&src, b"data").expect("write");

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let response = ArchivesInterface::new(&d)
            .upload_file("builds", "v3.tar", &src)
            .await
            .expect("upload")
            .dispatched();
        assert_eq!(response.map(|r| r["success"].clone()), Some(serde_json::json!(true)));
    }
}
