//! TCP listener and dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use quotegate_limiter::RateLimiter;

use crate::config::{normalize_addr, ServerConfig};
use crate::connection::handle_connection;
use crate::error::ServerError;
use crate::quotes::QuoteBook;

/// State shared by every connection handler.
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) limiter: RateLimiter,
    pub(crate) quotes: QuoteBook,
}

/// The accepting server.
///
/// Backpressure is the OS accept queue plus socket buffers; the accept
/// loop itself never waits on a handler.
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    /// Bind the configured address.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = normalize_addr(&config.addr);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let state = Arc::new(ServerState {
            limiter: RateLimiter::new(config.limiter.clone()),
            quotes: QuoteBook::embedded(),
            config,
        });
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            listener,
            state,
            shutdown,
        })
    }

    /// The bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Request a graceful stop of the accept loop and janitor. Handlers
    /// already in flight run to completion.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Accept connections until shutdown, spawning one handler task per
    /// connection and a janitor for limiter garbage collection.
    ///
    /// Transient accept failures are logged and survived, so this only
    /// returns once [`Server::shutdown`] is called.
    pub async fn serve(&self) {
        let mut shutdown = self.shutdown.subscribe();
        let janitor = tokio::spawn(run_janitor(
            Arc::clone(&self.state),
            self.shutdown.subscribe(),
        ));

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        let state = Arc::clone(&self.state);
                        tokio::spawn(handle_connection(stream, peer, state));
                    }
                    // Transient accept failures (fd exhaustion, resets in
                    // the backlog) must not take the listener down.
                    Err(error) => error!(%error, "accept failed"),
                },
                _ = shutdown.changed() => {
                    info!("listener shutting down");
                    break;
                }
            }
        }

        let _ = janitor.await;
    }
}

/// Periodically evict limiter records that are idle and no longer banned.
async fn run_janitor(state: Arc<ServerState>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(state.config.cleanup_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = state.limiter.cleanup(state.config.inactive_eviction);
                if evicted > 0 {
                    debug!(
                        evicted,
                        tracked = state.limiter.tracked_clients(),
                        "evicted idle clients"
                    );
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
