use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::shipments::{CreateShipmentRequest, ShipmentWithOrder, Tracking, UpdateShipmentStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Shipment,
    response::ApiResponse,
    services::shipment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_shipment))
        .route("/tracking/{tracking_number}", get(track_by_number))
        .route("/{id}", get(get_shipment))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/tracking", get(tracking))
}

#[utoipa::path(
    post,
    path = "/api/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 200, description = "Shipment created", body = ApiResponse<ShipmentWithOrder>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Order locked or already has a shipment"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateShipmentRequest>,
) -> AppResult<Json<ApiResponse<ShipmentWithOrder>>> {
    let shipment = shipment_service::create(&state, &user, payload).await?;
    Ok(Json(ApiResponse::success("Shipment created", shipment, None)))
}

#[utoipa::path(
    get,
    path = "/api/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment", body = ApiResponse<Shipment>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Shipment>>> {
    let shipment = shipment_service::get_shipment(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", shipment, None)))
}

#[utoipa::path(
    patch,
    path = "/api/shipments/{id}/status",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = UpdateShipmentStatusRequest,
    responses(
        (status = 200, description = "Shipment moved, order updated", body = ApiResponse<ShipmentWithOrder>),
        (status = 400, description = "Unknown shipment state"),
        (status = 409, description = "Order cannot follow"),
    ),
    security(("bearer_auth" = [])),
    tag = "Shipments"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShipmentStatusRequest>,
) -> AppResult<Json<ApiResponse<ShipmentWithOrder>>> {
    let shipment = shipment_service::update_status(&state, &user, id, &payload.state).await?;
    Ok(Json(ApiResponse::success("Shipment updated", shipment, None)))
}

#[utoipa::path(
    get,
    path = "/api/shipments/{id}/tracking",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses((status = 200, description = "Tracking view", body = ApiResponse<Tracking>)),
    security(("bearer_auth" = [])),
    tag = "Shipments"
)]
pub async fn tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Tracking>>> {
    let tracking = shipment_service::tracking(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", tracking, None)))
}

#[utoipa::path(
    get,
    path = "/api/shipments/tracking/{tracking_number}",
    params(("tracking_number" = String, Path, description = "Carrier tracking number")),
    responses(
        (status = 200, description = "Tracking view", body = ApiResponse<Tracking>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Shipments"
)]
pub async fn track_by_number(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> AppResult<Json<ApiResponse<Tracking>>> {
    let tracking = shipment_service::tracking_by_number(&state, &tracking_number).await?;
    Ok(Json(ApiResponse::success("OK", tracking, None)))
}
