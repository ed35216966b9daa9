//! Local preview server for a generated site.
//!
//! Serves the output directory read-only with axum and tower-http:
//!
//! ```text
//! request ──► write timeout ──► cache-control ──► gzip negotiation
//!                                                      │
//!             ServeDir ◄── read timeout ◄── sniffing ◄── gzip
//! ```
//!
//! Shutdown is cooperative: cancelling the token passed to
//! [`PreviewServer::run`] stops accepting connections and gives in-flight
//! requests a bounded grace period.

mod listener;
mod middleware;
pub mod policy;

pub use policy::{accepts_gzip, is_static_asset, should_compress, sniff_content_type};

use crate::error::{Error, Result};
use axum::Router;
use listener::IdleListener;
use std::future::IntoFuture;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::compression::predicate::SizeAbove;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::CompressionLevel;
use walkdir::WalkDir;

/// Default preview port
pub const DEFAULT_PORT: u16 = 8080;

/// Connection timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Receiving the request body
    pub read: Duration,
    /// Producing the whole response
    pub write: Duration,
    /// Keep-alive connection with no traffic
    pub idle: Duration,
    /// In-flight requests after shutdown starts
    pub grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(5),
            write: Duration::from_secs(10),
            idle: Duration::from_secs(120),
            grace: Duration::from_secs(5),
        }
    }
}

/// Lifecycle of a [`PreviewServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Listening { addr: SocketAddr },
}

/// Build the router serving `root`
pub fn router(root: &Path, timeouts: &Timeouts) -> Router {
    let files = ServeDir::new(root).append_index_html_on_directories(true);

    #[allow(deprecated)]
    let write_timeout = TimeoutLayer::new(timeouts.write);

    Router::new()
        .fallback_service(files)
        .layer(RequestBodyTimeoutLayer::new(timeouts.read))
        .layer(axum::middleware::from_fn(middleware::fill_content_type))
        .layer(
            CompressionLayer::new()
                .quality(CompressionLevel::Default)
                .compress_when(SizeAbove::new(0)),
        )
        .layer(axum::middleware::from_fn(middleware::negotiate_compression))
        .layer(axum::middleware::from_fn(middleware::cache_control))
        .layer(write_timeout)
}

/// Preview server over a generated site
pub struct PreviewServer {
    root: PathBuf,
    host: IpAddr,
    port: u16,
    timeouts: Timeouts,
    state: watch::Sender<ServerState>,
}

impl PreviewServer {
    /// Serve `root` on every interface at `port`. Port 0 picks a free port.
    pub fn new(root: impl Into<PathBuf>, port: u16) -> Self {
        let (state, _) = watch::channel(ServerState::Stopped);
        Self {
            root: root.into(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
            timeouts: Timeouts::default(),
            state,
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Watch the server's state
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = SocketAddr::new(self.host, self.port);
        let tcp = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::server(format!("failed to bind {}: {}", addr, e)))?;
        let local = tcp.local_addr()?;

        let app = router(&self.root, &self.timeouts);
        let signal = shutdown.clone();
        let server = axum::serve(IdleListener::new(tcp, self.timeouts.idle), app)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .into_future();
        tokio::pin!(server);

        self.state.send_replace(ServerState::Listening { addr: local });
        tracing::info!(address = %local, root = %self.root.display(), "preview server listening");

        let result = tokio::select! {
            result = &mut server => result,
            _ = shutdown.cancelled() => {
                tracing::info!("shutting down preview server");
                match tokio::time::timeout(self.timeouts.grace, &mut server).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            grace = ?self.timeouts.grace,
                            "grace period elapsed, dropping open connections"
                        );
                        Ok(())
                    }
                }
            }
        };

        self.state.send_replace(ServerState::Stopped);
        tracing::info!("preview server stopped");
        result.map_err(|e| Error::server(e.to_string()))
    }
}

/// URL of every generated page, sorted
pub fn page_urls(root: &Path, port: u16) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_html = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        if !is_html {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::other(e.to_string()))?;
        let path: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        urls.push(format!("http://localhost:{}/{}", port, path.join("/")));
    }
    urls.sort();
    Ok(urls)
}
