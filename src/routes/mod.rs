use axum::{Json, Router, http::StatusCode, http::Uri, routing::get};

use crate::{
    response::ApiResponse,
    state::AppState,
};

pub mod admin;
pub mod cart;
pub mod discounts;
pub mod doc;
pub mod gateway;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod shipments;

// State is bound by the caller.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/shipments", shipments::router())
        .nest("/discount-codes", discounts::router())
        .nest("/gateway", gateway::router())
        .nest("/admin", admin::router())
}

/// Health check, the API under `/api` and the docs, without the HTTP layers
/// `main` wraps around them.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::failure("Not Found", serde_json::json!({ "path": uri.path() }));
    (StatusCode::NOT_FOUND, Json(body))
}
