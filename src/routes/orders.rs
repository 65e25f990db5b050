use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{DirectOrderRequest, OrderList, OrderTotal, OrderWithDetails, UpdateDetailsRequest},
    error::AppResult,
    middleware::auth::{AuthUser, OptionalAuthUser},
    models::{Order, Pay},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{order_service, payment_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_direct_order))
        .route("/{id}", get(get_order))
        .route("/{id}/details", put(update_details))
        .route("/{id}/details/{detail_id}", delete(remove_detail))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/total", post(recompute_total))
        .route("/{id}/payments", get(list_payments))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses((status = 200, description = "Orders of the current user", body = ApiResponse<OrderList>)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let page = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(ApiResponse::paged("OK", page)))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = DirectOrderRequest,
    responses(
        (status = 200, description = "Order placed from explicit lines, guests included", body = ApiResponse<OrderWithDetails>),
        (status = 400, description = "No lines, missing guest contact or invalid discount code"),
        (status = 409, description = "Insufficient stock"),
    ),
    tag = "Orders"
)]
pub async fn create_direct_order(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(payload): Json<DirectOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let order = order_service::create_direct_order(&state, user.as_ref(), payload).await?;
    Ok(Json(ApiResponse::success("Order placed", order, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with details", body = ApiResponse<OrderWithDetails>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let order = order_service::get_order(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", order, None)))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/details",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateDetailsRequest,
    responses(
        (status = 200, description = "Details updated", body = ApiResponse<OrderWithDetails>),
        (status = 400, description = "A line was rejected; earlier lines stay applied"),
        (status = 409, description = "Order locked or insufficient stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDetailsRequest>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let order = order_service::update_details(&state, &user, id, payload.details).await?;
    Ok(Json(ApiResponse::success("Details updated", order, None)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/details/{detail_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("detail_id" = Uuid, Path, description = "Detail ID"),
    ),
    responses(
        (status = 200, description = "Detail removed and stock released", body = ApiResponse<OrderWithDetails>),
        (status = 404, description = "Detail not under this order"),
        (status = 409, description = "Order locked"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn remove_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, detail_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<OrderWithDetails>>> {
    let order = order_service::remove_detail(&state, &user, id, detail_id).await?;
    Ok(Json(ApiResponse::success("Detail removed", order, None)))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled and stock released", body = ApiResponse<Order>),
        (status = 409, description = "Already cancelled or not cancellable"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::cancel(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Order cancelled", order, None)))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/total",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses((status = 200, description = "Total recomputed from details", body = ApiResponse<OrderTotal>)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn recompute_total(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderTotal>>> {
    let total = order_service::recompute_total(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", total, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses((status = 200, description = "Payments of the order", body = ApiResponse<Vec<Pay>>)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Pay>>>> {
    let pays = payment_service::list_for_order(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", pays, None)))
}
