use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

use crate::args::Args;
use crate::artifacts::{ArtifactKey, ArtifactRepositoryHandler};
use crate::file_serving::cache::FileCache;
use crate::file_serving::handlers::StaticFileHandler;
use crate::file_serving::listing::ListingRenderer;
use crate::http::{self, RequestContext, ResponseWriter};

/// A bound server instance. Owns its listener, handlers and cache; nothing
/// is process-global, so several instances can coexist (and tests can spin
/// one up on an ephemeral port).
pub struct Server {
    listener: TcpListener,
    files: Arc<StaticFileHandler>,
    artifacts: Arc<ArtifactRepositoryHandler>,
}

impl Server {
    /// Creates the serve root if missing, canonicalizes it, and binds the
    /// listen address.
    pub async fn bind(args: Args) -> io::Result<Server> {
        tokio::fs::create_dir_all(&args.serve_dir).await?;
        let root = tokio::fs::canonicalize(&args.serve_dir).await?;

        let listener = TcpListener::bind(&args.listen_addr).await?;
        info!("listening on {}", listener.local_addr()?);
        info!("serving directory {}", root.display());

        let cache = Arc::new(FileCache::new());
        let listing = match &args.listing_template {
            Some(path) => ListingRenderer::from_file(path.clone()),
            None => ListingRenderer::builtin(),
        };

        Ok(Server {
            files: Arc::new(StaticFileHandler::new(root.clone(), cache, listing)),
            artifacts: Arc::new(ArtifactRepositoryHandler::new(root)),
            listener,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop: one task per connection, connection failures never
    /// take down the server.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let files = Arc::clone(&self.files);
            let artifacts = Arc::clone(&self.artifacts);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, files, artifacts).await {
                    debug!("connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

pub async fn start_server(args: Args) -> io::Result<()> {
    let server = Server::bind(args).await?;
    server.run().await
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    files: Arc<StaticFileHandler>,
    artifacts: Arc<ArtifactRepositoryHandler>,
) -> io::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut response = ResponseWriter::new(write_half);

    let request = match http::read_request(&mut reader).await {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            warn!("[{}] malformed request: {}", peer.ip(), e);
            return response.send_bad_request().await;
        }
        Err(e) => return Err(e),
    };

    let started = Instant::now();
    let ctx = RequestContext::new(&request);
    info!("[{}] {} {}", peer.ip(), ctx.method, ctx.target);

    let result = match ArtifactKey::from_target(&ctx.target) {
        Some(key) => {
            let body = match request.content_length() {
                Some(len) if ctx.method == "PUT" => http::read_body(&mut reader, len).await?,
                _ => Vec::new(),
            };
            artifacts.handle(&ctx, &key, &body, &mut response).await
        }
        None => files.handle(&ctx, &mut response).await,
    };

    match &result {
        Ok(()) => info!(
            "[{}] {} {} -> {} ({:?})",
            peer.ip(),
            ctx.method,
            ctx.target,
            response.status(),
            started.elapsed()
        ),
        Err(e) => warn!(
            "[{}] {} {} dropped: {} ({:?})",
            peer.ip(),
            ctx.method,
            ctx.target,
            e,
            started.elapsed()
        ),
    }
    result
}
