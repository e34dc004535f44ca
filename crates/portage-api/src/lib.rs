pub mod handlers;

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use handlers::ApiState;

/// Federation receive routes plus the operator status endpoint.
pub fn router(state: ApiState) -> Router {
    let body_limit = state.body_limit;

    let receive_routes = Router::new()
        .route("/public", post(handlers::handle_receive_public))
        .route("/users/{guid}", post(handlers::handle_receive_user))
        .layer(DefaultBodyLimit::max(body_limit));

    let api_routes = Router::new().route("/status", get(handlers::handle_status));

    Router::new()
        .nest("/receive", receive_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    state: ApiState,
    bind: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    tracing::info!(bind, port, "receiver listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
