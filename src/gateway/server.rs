//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::router::{AppState, create_router};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::upstream::UpstreamClient;
use crate::{Error, Result};

/// Wait-times gateway server
///
/// The composition root: it constructs the response cache and the upstream
/// client, wires them into the HTTP state, and owns their lifecycle. The
/// cache is destroyed here once the server has drained — individual
/// components never hook process signals themselves.
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Shared handler state (cache + upstream client)
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a new gateway
    ///
    /// Must be called from within a Tokio runtime: constructing the cache
    /// starts its background sweep.
    pub fn new(config: Config) -> Result<Self> {
        let upstream = Arc::new(UpstreamClient::new(&config.upstream)?);
        let cache = Arc::new(TtlCache::with_sweep_interval(
            config.cache.ttl,
            config.cache.sweep_interval,
        ));

        Ok(Self {
            config,
            state: Arc::new(AppState::new(cache, upstream)),
        })
    }

    /// Run the gateway until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = create_router(Arc::clone(&self.state));
        let listener = TcpListener::bind(addr).await?;

        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(
            upstream = %self.state.upstream.base_url(),
            ttl = %humantime::format_duration(self.state.cache.ttl()),
            "Shielding upstream with response cache"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        // Cache lifecycle is owned here: release the sweep task and entries
        // after the server has drained.
        info!("Releasing cache resources...");
        self.state.cache.destroy();

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
