//! Artifact repository endpoint: PUT/GET/HEAD of binary artifacts under
//! `/artifactory/:group/:name/:version/:fileName`, backed by a flat
//! directory-tree store.

pub mod store;

use log::{debug, error, info, warn};
use std::fmt;
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncWrite;

use crate::file_serving::path_utils;
use crate::http::{RequestContext, ResponseWriter};
use store::{FileContent, FlatFileStore};

/// First path segment that routes a request to the artifact repository.
pub const ROUTE_PREFIX: &str = "artifactory";

/// Identifies one artifact file. Maps deterministically to
/// `root/group/name/version/file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKey {
    pub group: String,
    pub name: String,
    pub version: String,
    pub file_name: String,
}

impl ArtifactKey {
    /// Builds a key from validated segments. `None` when any segment could
    /// change the target directory (empty, dot segments, separators).
    pub fn new(group: &str, name: &str, version: &str, file_name: &str) -> Option<Self> {
        if ![group, name, version, file_name]
            .iter()
            .all(|s| Self::valid_segment(s))
        {
            return None;
        }
        Some(ArtifactKey {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            file_name: file_name.to_string(),
        })
    }

    fn valid_segment(segment: &str) -> bool {
        !segment.is_empty()
            && segment != "."
            && segment != ".."
            && !segment.contains(['/', '\\'])
    }

    /// Parses `/artifactory/<group>/<name>/<version>/<fileName>` from a raw
    /// request target. `None` for anything else, which sends the request to
    /// the static file handler instead.
    pub fn from_target(target: &str) -> Option<Self> {
        let decoded = path_utils::decode(target)?;
        let mut segments = decoded.trim_start_matches('/').split('/');
        if segments.next() != Some(ROUTE_PREFIX) {
            return None;
        }
        let group = segments.next()?;
        let name = segments.next()?;
        let version = segments.next()?;
        let file_name = segments.next()?;
        if segments.next().is_some() {
            return None;
        }
        ArtifactKey::new(group, name, version, file_name)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.group, self.name, self.version, self.file_name
        )
    }
}

pub struct ArtifactRepositoryHandler {
    store: FlatFileStore,
}

impl ArtifactRepositoryHandler {
    pub fn new(root: PathBuf) -> Self {
        info!("artifact repository '{}' started", ROUTE_PREFIX);
        ArtifactRepositoryHandler {
            store: FlatFileStore::new(root),
        }
    }

    pub async fn handle<W>(
        &self,
        ctx: &RequestContext,
        key: &ArtifactKey,
        body: &[u8],
        response: &mut ResponseWriter<W>,
    ) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match ctx.method.as_str() {
            "PUT" => {
                let content = FileContent {
                    bytes: body.to_vec(),
                    content_type: ctx
                        .content_type
                        .clone()
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                };
                match self.store.put(key, &content).await {
                    Ok(()) => {
                        info!("artifact {} saved", key);
                        response
                            .send_headers(200, "OK", &[("Content-Length", "2")])
                            .await?;
                        response.write_body(b"ok").await?;
                        response.flush().await
                    }
                    Err(e) => {
                        error!("unable to save artifact {}: {}", key, e);
                        response.send_server_error().await
                    }
                }
            }
            "GET" => match self.store.get(key).await {
                Ok(content) => {
                    info!("artifact {} found", key);
                    self.send_content(response, &content, true).await
                }
                Err(e) => {
                    warn!("artifact {} not found: {}", key, e);
                    response.send_not_found().await
                }
            },
            "HEAD" => match self.store.get(key).await {
                Ok(content) => self.send_content(response, &content, false).await,
                Err(e) => {
                    warn!("artifact {} not found: {}", key, e);
                    response.send_not_found().await
                }
            },
            other => {
                debug!("method not implemented for artifacts: {}", other);
                response.send_bad_request().await
            }
        }
    }

    async fn send_content<W>(
        &self,
        response: &mut ResponseWriter<W>,
        content: &FileContent,
        with_body: bool,
    ) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let length = content.bytes.len().to_string();
        response
            .send_headers(
                200,
                "OK",
                &[
                    ("Content-Type", content.content_type.as_str()),
                    ("Content-Length", length.as_str()),
                ],
            )
            .await?;
        if with_body {
            response.write_body(&content.bytes).await?;
        }
        response.flush().await
    }
}
