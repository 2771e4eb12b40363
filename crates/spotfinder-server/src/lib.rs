//! JSON relay in front of the spotfinder services.
//!
//! Each endpoint accepts one JSON body and answers with one JSON body.
//! Provider keys stay on this side; browsers only ever see results or a
//! `{"error": ...}` object.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::routes;
pub use state::AppState;

use std::net::SocketAddr;

/// Serve the relay until Ctrl-C.
///
/// # Errors
/// Fails when the address can't be bound.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    allowed_origin: &str,
) -> Result<(), warp::Error> {
    let filter = routes(state, allowed_origin);
    let (bound, server) =
        warp::serve(filter).try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })?;

    tracing::info!("Relay listening on http://{}", bound);
    server.await;
    tracing::info!("Relay stopped");
    Ok(())
}
