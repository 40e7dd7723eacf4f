//! Server execution logic.

use std::{future::Future, io, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    domain::{Authenticator, ChatAccess, MessageProcessor},
    hub::Hub,
    usecase::ConnectUserUseCase,
};

use super::{
    handler::{chat_users, health_check, metrics, online_users, user_presence, websocket_handler},
    pump::{EventDispatcher, PumpConfig},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket hub server
///
/// Owns the router and the handle to an already running [`Hub`]. Stopping
/// the server shuts the hub down, which closes every live connection.
///
/// # Example
///
/// ```ignore
/// let (hub, hub_task) = Hub::spawn(&config.hub_config(), clock);
/// let server = Server::new(hub, authenticator, access, processor, config.pump_config());
/// server.run(&config.addr()).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(
        hub: Hub,
        authenticator: Arc<dyn Authenticator>,
        access: Arc<dyn ChatAccess>,
        processor: Arc<dyn MessageProcessor>,
        pump_config: PumpConfig,
    ) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new(hub.clone(), access, processor));
        let state = Arc::new(AppState {
            connect_user: ConnectUserUseCase::new(hub.clone()),
            hub,
            authenticator,
            dispatcher,
            pump_config,
        });
        Self { state }
    }

    /// Build the router: `/ws` plus the read-only HTTP API.
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/online", get(online_users))
            .route("/api/users/{user_id}/presence", get(user_presence))
            .route("/api/chats/{chat_id}/users", get(chat_users))
            .route("/api/metrics", get(metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind `addr` and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, addr: &str) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Connect to: ws://{}/ws?token=...", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then stop the hub.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Hub server listening on {}", listener.local_addr()?);

        let hub = self.state.hub.clone();
        let app = self.router();
        // Upgraded sockets are not tracked by the graceful shutdown, so the hub
        // is stopped as soon as the signal fires to close them.
        let stop_hub = hub.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                stop_hub.shutdown();
            })
            .await;

        hub.shutdown();
        tracing::info!("Server shutdown complete");
        result
    }
}
