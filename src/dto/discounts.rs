use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCodeRequest {
    pub code: String,
    pub purchase_amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CodeValidation {
    pub code: String,
    pub valid: bool,
    pub reason: String,
    pub description: Option<String>,
    pub percentage_bps: Option<i32>,
    /// Discount the purchase amount would receive.
    pub discount_amount: Option<i64>,
}
