pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod ingest;
pub mod mailer;
pub mod password;
pub mod token;

use api::create_api_router;
use axum::Router;
use db::Database;
use mailer::Mailer;
use std::net::SocketAddr;
use std::sync::Arc;
use token::TokenConfig;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing session bearer tokens and purpose-bound tokens
    pub token_secret: Vec<u8>,
    /// Outbound message boundary
    pub mailer: Mailer,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let tokens = Arc::new(TokenConfig::new(&config.token_secret));
    create_api_router(config.db.clone(), tokens, config.mailer.clone())
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
