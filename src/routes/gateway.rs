use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::payments::{GatewayNotification, PayWithOrder},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_staff},
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", post(receive_notification))
}

/// Called by the gateway adapter, which authenticates with an operator token
/// after verifying and parsing the provider's webhook.
#[utoipa::path(
    post,
    path = "/api/gateway/notifications",
    request_body = GatewayNotification,
    responses(
        (status = 200, description = "Notification reconciled", body = ApiResponse<PayWithOrder>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Gateway"
)]
pub async fn receive_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GatewayNotification>,
) -> AppResult<Json<ApiResponse<PayWithOrder>>> {
    ensure_staff(&user)?;
    let result = payment_service::reconcile(&state, payload).await?;
    Ok(Json(ApiResponse::success("Notification processed", result, None)))
}
