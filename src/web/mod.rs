use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{SecurityConfig, ServerConfig};
use crate::product_manager::ProductManager;

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use handlers::{
    check_now, create_product, delete_product, health_check, list_products, login, set_threshold,
    status, update_product,
};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub product_manager: Arc<ProductManager>,
    pub security: Arc<SecurityConfig>,
    pub request_timeout: Duration,
}

pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    let admin = Router::new()
        .route("/admin/products", get(list_products).post(create_product))
        .route("/admin/products/:id", put(update_product).delete(delete_product))
        .route("/admin/threshold", post(set_threshold))
        .route("/admin/status", get(status))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/check", get(check_now))
        .route("/admin/login", post(login))
        .merge(admin)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(config: &ServerConfig, state: AppState) -> crate::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Admin server listening on {}:{}", config.host, config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
