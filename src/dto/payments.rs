use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    lifecycle::PayMethod,
    models::{Order, Pay},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePayRequest {
    pub order_id: Uuid,
    pub method: PayMethod,
    /// Defaults to the order's amount due.
    pub amount: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub proof_url: Option<String>,
}

/// A payment notification already parsed by the gateway adapter.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GatewayNotification {
    pub external_id: String,
    pub order_id: Uuid,
    pub status: String,
    pub amount: i64,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayWithOrder {
    pub pay: Pay,
    pub order: Order,
}
