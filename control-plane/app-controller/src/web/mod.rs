use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router() -> Router {
    // /healthz kept for probes written against older manifests
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/healthz", get(|| async { "ok" }))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub async fn run_http_server(addr: SocketAddr) -> anyhow::Result<()> {
    info!("health endpoint listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router()).await?;
    Ok(())
}
