use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::discounts::{CodeValidation, ValidateCodeRequest},
    error::AppResult,
    middleware::auth::OptionalAuthUser,
    response::ApiResponse,
    services::discount_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_code))
}

#[utoipa::path(
    post,
    path = "/api/discount-codes/validate",
    request_body = ValidateCodeRequest,
    responses(
        (status = 200, description = "Validation outcome; rejected codes carry the reason", body = ApiResponse<CodeValidation>)
    ),
    tag = "Discounts"
)]
pub async fn validate_code(
    State(state): State<AppState>,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(payload): Json<ValidateCodeRequest>,
) -> AppResult<Json<ApiResponse<CodeValidation>>> {
    let user_id = user.map(|u| u.user_id);
    let validation =
        discount_service::validate(&state.orm, &payload.code, payload.purchase_amount, user_id)
            .await?;
    Ok(Json(ApiResponse::success("OK", validation, None)))
}
