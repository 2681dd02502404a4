//! HTTP server bootstrap

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::core::{Config, ServerState};

/// The HTTP server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Bind and serve until the process is stopped
    pub async fn run(self) -> anyhow::Result<()> {
        let app = api::router(self.state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        let addr = format!("0.0.0.0:{}", self.config.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "Dispatch server listening");

        axum::serve(listener, app).await?;
        Ok(())
    }
}
