//! Per-request decision procedure for static file serving.
//!
//! ETags here are the SHA-1 of file contents, not mtime/size, so a file
//! replicated across server instances carries the same validator on each.
//! The hash is computed in-line with the first transmission and cached;
//! the cached value is reused until the file's mtime changes.

use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWrite;

use super::cache::{CacheEntry, FileCache};
use super::listing::ListingRenderer;
use super::path_utils;
use super::streamer::{self, DEFAULT_HIGH_WATER};
use super::{content_type_for, FileSnapshot, Result, ServeError, DEFAULT_FILE};
use crate::http::{RequestContext, ResponseWriter};

pub struct StaticFileHandler {
    root: PathBuf,
    cache: Arc<FileCache>,
    listing: ListingRenderer,
}

impl StaticFileHandler {
    /// `root` must already be canonical; the server canonicalizes it once
    /// at startup. The cache is injected so instances can share or scope
    /// it as they see fit.
    pub fn new(root: PathBuf, cache: Arc<FileCache>, listing: ListingRenderer) -> Self {
        StaticFileHandler {
            root,
            cache,
            listing,
        }
    }

    /// Runs the dispatch procedure and degrades failures into responses:
    /// anything that goes wrong before headers are out becomes a 404,
    /// after that the connection is simply dropped, since the promised
    /// content length can no longer be honored.
    pub async fn handle<W>(
        &self,
        ctx: &RequestContext,
        response: &mut ResponseWriter<W>,
    ) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match self.dispatch(ctx, response).await {
            Ok(()) => Ok(()),
            Err(err) if response.headers_sent() => {
                warn!("aborting in-flight response for {}: {}", ctx.target, err);
                Err(match err {
                    ServeError::Io(e) => e,
                    other => io::Error::new(io::ErrorKind::Other, other.to_string()),
                })
            }
            Err(err) => {
                debug!("request for {} failed: {}", ctx.target, err);
                response.send_not_found().await
            }
        }
    }

    async fn dispatch<W>(&self, ctx: &RequestContext, response: &mut ResponseWriter<W>) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if ctx.method != "GET" {
            debug!("unsupported method: {}", ctx.method);
            response.send_bad_request().await?;
            return Ok(());
        }

        let resolved =
            path_utils::resolve(&self.root, &ctx.target).ok_or(ServeError::PathRejected)?;

        let metadata = match fs::metadata(&resolved).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ServeError::NotFound),
            Err(e) => return Err(e.into()),
        };
        let snapshot = FileSnapshot::of(&metadata).map_err(ServeError::Io)?;

        if snapshot.is_dir {
            return self.serve_directory(ctx, &resolved, response).await;
        }
        if !snapshot.is_file {
            // Sockets, fifos and friends are not served.
            return Err(ServeError::NotFound);
        }
        self.serve_file(ctx, &resolved, &snapshot, response).await
    }

    /// Directory with an index file: redirect to it. Without one: render
    /// a listing of the immediate children.
    async fn serve_directory<W>(
        &self,
        ctx: &RequestContext,
        dir: &Path,
        response: &mut ResponseWriter<W>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let has_index = fs::metadata(dir.join(DEFAULT_FILE))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        if has_index {
            let mut location = ctx.absolute_uri();
            if !location.ends_with('/') {
                location.push('/');
            }
            location.push_str(DEFAULT_FILE);
            debug!("redirecting to {}", location);
            response.send_redirect(&location).await?;
            return Ok(());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        let decoded = path_utils::decode(&ctx.target).ok_or(ServeError::PathRejected)?;
        let body = self.listing.render(&decoded, &names).await?;

        let mut content_location = ctx.absolute_uri();
        if !content_location.ends_with('/') {
            content_location.push('/');
        }
        let length = body.len().to_string();
        response
            .send_headers(
                200,
                "OK",
                &[
                    ("Content-Type", "text/html"),
                    ("Content-Length", length.as_str()),
                    ("Content-Location", content_location.as_str()),
                ],
            )
            .await?;
        response.write_body(body.as_bytes()).await?;
        response.flush().await?;
        Ok(())
    }

    async fn serve_file<W>(
        &self,
        ctx: &RequestContext,
        path: &Path,
        snapshot: &FileSnapshot,
        response: &mut ResponseWriter<W>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if let Some(entry) = self.cache.get(path) {
            if entry.mtime == snapshot.modified {
                return self.serve_cached(ctx, path, snapshot, &entry, response).await;
            }
            debug!("cache entry stale for {}", path.display());
        }
        self.serve_and_hash(path, snapshot, response).await
    }

    /// Cache hit: the validator is known up front, so it can answer a
    /// conditional fetch or go out as an ETag header, and the body is
    /// streamed without rehashing.
    async fn serve_cached<W>(
        &self,
        ctx: &RequestContext,
        path: &Path,
        snapshot: &FileSnapshot,
        entry: &CacheEntry,
        response: &mut ResponseWriter<W>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        // Exact string comparison only: no weak validators, no lists.
        if ctx.if_none_match.as_deref() == Some(entry.content_hash.as_str()) {
            debug!("conditional hit for {}", path.display());
            response.send_not_modified().await?;
            return Ok(());
        }

        let mut file = fs::File::open(path).await?;

        let length = snapshot.len.to_string();
        let mut headers: Vec<(&str, &str)> = vec![
            ("Content-Length", length.as_str()),
            ("ETag", entry.content_hash.as_str()),
        ];
        if let Some(mime) = content_type_for(path) {
            headers.push(("Content-Type", mime));
        }
        response.send_headers(200, "OK", &headers).await?;
        tokio::io::copy(&mut file, response.sink_mut()).await?;
        response.flush().await?;
        Ok(())
    }

    /// Cache miss or stale entry: stream the file while hashing, then
    /// publish the fresh entry. The hash is never attached to the response
    /// that produced it — headers were already sent when it became known —
    /// so it only benefits the next request. That trade-off is deliberate;
    /// buffering the file to hash first would defeat the streaming.
    async fn serve_and_hash<W>(
        &self,
        path: &Path,
        snapshot: &FileSnapshot,
        response: &mut ResponseWriter<W>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let file = fs::File::open(path).await?;

        let length = snapshot.len.to_string();
        let mut headers: Vec<(&str, &str)> = vec![("Content-Length", length.as_str())];
        if let Some(mime) = content_type_for(path) {
            headers.push(("Content-Type", mime));
        }
        response.send_headers(200, "OK", &headers).await?;

        let summary = streamer::pump(file, response.sink_mut(), DEFAULT_HIGH_WATER).await?;
        response.flush().await?;

        // mtime from the dispatch-time snapshot, not a fresh stat: if the
        // file changed under us the entry is immediately stale, which is
        // the correct outcome.
        self.cache.insert(
            path.to_path_buf(),
            CacheEntry {
                mtime: snapshot.modified,
                content_hash: summary.hash,
            },
        );
        debug!(
            "cached digest for {} ({} bytes)",
            path.display(),
            summary.bytes
        );
        Ok(())
    }
}
