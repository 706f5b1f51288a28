use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::service::Shortener;

use super::handlers::{
    delete_batch, list_owned, ping, redirect_url, shorten, stats, AppState,
};

pub fn create_router(service: Arc<Shortener>) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/ping", get(ping))
        .route("/api/shorten", post(shorten))
        .route("/api/user/urls", get(list_owned).delete(delete_batch))
        .route("/api/internal/stats", get(stats))
        .route("/{short_id}", get(redirect_url))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
