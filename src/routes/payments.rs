use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::{CreatePayRequest, PayWithOrder, ReviewRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Pay,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_pay))
        .route("/{id}", get(get_pay))
        .route("/{id}/review", post(mark_in_review))
        .route("/{id}/complete", post(complete_pay))
        .route("/{id}/approve", post(approve_pay))
        .route("/{id}/fail", post(fail_pay))
        .route("/{id}/reject", post(reject_pay))
        .route("/{id}/cancel", post(cancel_pay))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePayRequest,
    responses(
        (status = 200, description = "Payment opened for a pending order", body = ApiResponse<Pay>),
        (status = 409, description = "Order not payable or already has an open payment"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePayRequest>,
) -> AppResult<Json<ApiResponse<Pay>>> {
    let pay = payment_service::create(&state, &user, payload).await?;
    Ok(Json(ApiResponse::success("Payment created", pay, None)))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Pay ID")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Pay>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Pay>>> {
    let pay = payment_service::get_pay(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", pay, None)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/review",
    params(("id" = Uuid, Path, description = "Pay ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Payment proof submitted", body = ApiResponse<PayWithOrder>),
        (status = 409, description = "Payment is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn mark_in_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<PayWithOrder>>> {
    let result = payment_service::mark_in_review(&state, &user, id, payload.proof_url).await?;
    Ok(Json(ApiResponse::success("Payment in review", result, None)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/complete",
    params(("id" = Uuid, Path, description = "Pay ID")),
    responses(
        (status = 200, description = "Payment completed, order paid", body = ApiResponse<PayWithOrder>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Payment already settled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn complete_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PayWithOrder>>> {
    let result = payment_service::complete(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Payment completed", result, None)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/approve",
    params(("id" = Uuid, Path, description = "Pay ID")),
    responses(
        (status = 200, description = "Reviewed payment approved", body = ApiResponse<PayWithOrder>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Payment is not in review"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn approve_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PayWithOrder>>> {
    let result = payment_service::approve(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Payment approved", result, None)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/fail",
    params(("id" = Uuid, Path, description = "Pay ID")),
    responses(
        (status = 200, description = "Payment failed", body = ApiResponse<PayWithOrder>),
        (status = 409, description = "Payment already settled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn fail_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PayWithOrder>>> {
    let result = payment_service::fail(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Payment failed", result, None)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/reject",
    params(("id" = Uuid, Path, description = "Pay ID")),
    responses(
        (status = 200, description = "Payment rejected, order back to pending", body = ApiResponse<PayWithOrder>),
        (status = 409, description = "Payment already settled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn reject_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PayWithOrder>>> {
    let result = payment_service::reject(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Payment rejected", result, None)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Pay ID")),
    responses(
        (status = 200, description = "Payment cancelled", body = ApiResponse<PayWithOrder>),
        (status = 409, description = "Payment already settled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn cancel_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PayWithOrder>>> {
    let result = payment_service::cancel(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Payment cancelled", result, None)))
}
