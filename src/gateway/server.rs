//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::router::{AppState, create_router};
use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::mgmt::HttpManagementApi;
use crate::{Error, Result};

/// The aggregation gateway server.
pub struct Gateway {
    config: Config,
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a gateway from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the management HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let verifier = Arc::new(JwtVerifier::new(&config.auth));
        let mgmt = Arc::new(HttpManagementApi::new(&config.auth, &config.management)?);
        let state = Arc::new(AppState { verifier, mgmt });

        Ok(Self { config, state })
    }

    /// Run until SIGINT/SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address is invalid, binding fails, or
    /// the server exits abnormally.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = create_router(Arc::clone(&self.state), &self.config.cors);
        let listener = TcpListener::bind(addr).await?;

        info!(host = %self.config.server.host, port = self.config.server.port, "Listening");
        info!(
            issuer = %self.config.auth.issuer_base_url,
            audience = %self.config.auth.audience,
            "Token validation configured"
        );
        info!("  GET /api/public");
        info!("  GET /api/private");
        info!("  GET /api/private-scoped");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

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
