use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{
    Json, Router,
    routing::{delete, get, patch, post},
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use super::{products, tags};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "Inventory Management API is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Route not found",
            "message": format!("The requested route {uri} does not exist"),
        })),
    )
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Products
        .route("/api/products", get(products::list_products))
        .route("/api/products", post(products::create_product))
        .route("/api/products/{id}", get(products::get_product))
        .route("/api/products/{id}", patch(products::update_product))
        .route("/api/products/{id}", delete(products::delete_product))
        .route("/api/products/{id}/stock", post(products::adjust_stock))
        // Tags
        .route("/api/tags", get(tags::list_tags))
        .route("/api/tags", post(tags::create_tag))
        .route("/api/tags/{id}", get(tags::get_tag))
        .route("/api/tags/{id}", patch(tags::update_tag))
        .route("/api/tags/{id}", delete(tags::delete_tag))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(middleware::from_fn(security_headers))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
