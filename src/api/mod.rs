//! HTTP proxy in front of the DeFindex vault API.
//!
//! Routes, all under `/api/defindex`:
//! - `POST /deposit`: unsigned deposit transaction
//! - `POST /withdraw`: unsigned withdraw transaction
//! - `GET /vault/{address}`: vault metadata and APY
//! - `GET /stats/{vaultAddress}/{userAddress}`: a user's yield figures
//! - `GET /health`: upstream availability

mod error;
mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

pub use error::ApiError;

use crate::vault::{VaultClient, VaultService};

/// Path prefix shared by every route.
pub const API_PREFIX: &str = "/api/defindex";

/// Application state shared across all request handlers.
///
/// Handlers only read it; the vault client is responsible for its own
/// synchronization.
pub struct AppState<C> {
    pub vault: VaultService<C>,
}

/// Builds the axum router with all proxy routes.
pub fn router<C: VaultClient>(state: Arc<AppState<C>>) -> Router {
    let routes = Router::new()
        .route("/deposit", post(handlers::deposit::<C>))
        .route("/withdraw", post(handlers::withdraw::<C>))
        .route("/vault/{address}", get(handlers::vault_info::<C>))
        .route(
            "/stats/{vault_address}/{user_address}",
            get(handlers::user_stats::<C>),
        )
        .route("/health", get(handlers::health::<C>));

    Router::new().nest(API_PREFIX, routes).with_state(state)
}

/// Binds to the given address and serves the proxy until Ctrl-C.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve<C: VaultClient>(state: Arc<AppState<C>>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "proxy listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
