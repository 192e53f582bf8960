use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

use crate::api;
use crate::service::NearbyPlaceService;

pub async fn run(port: u16, service: Arc<NearbyPlaceService>) -> Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", api::router(service))
        .layer(cors);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Nearby-place proxy running at http://localhost:{}", port);
    axum::serve(listener, app)
        .await
        .with_context(|| "HTTP server terminated")?;
    Ok(())
}
