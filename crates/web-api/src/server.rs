//! Axum server wiring: routes, CORS, request tracing, graceful shutdown.

use crate::handlers::{self, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// The proxy's HTTP server.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Builds the router.
    ///
    /// CORS is wide open: the dashboard is served from a separate origin.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(handlers::health))
            .route("/api/markets", get(handlers::list_markets))
            .route("/api/trades", get(handlers::list_trades))
            .route("/api/orders", post(handlers::place_order))
            .route("/api/arbitrage/focus", post(handlers::set_focus))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the server and runs until ctrl-c, then flushes state.
    ///
    /// The final flush is the teardown half of the state lifecycle: a
    /// clean shutdown always leaves the snapshot current.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("arb-desk proxy listening on {}", addr);

        let store = self.state.store.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        match store.flush().await {
            Ok(()) => tracing::info!("Final state flush complete"),
            Err(e) => tracing::error!(error = %e, "Final state flush failed"),
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
