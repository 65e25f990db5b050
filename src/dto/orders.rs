use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderDetail};

/// Shipping and contact metadata copied onto a new order.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ShippingInfo {
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub zone: Option<String>,
    pub cost: Option<i64>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub shipping: ShippingInfo,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GuestContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Order placed without a server-side cart, e.g. from the gateway
/// preference flow. `contact` is required when the buyer is anonymous.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DirectOrderRequest {
    pub contact: Option<GuestContact>,
    #[serde(default)]
    pub shipping: ShippingInfo,
    pub lines: Vec<OrderLineRequest>,
    pub discount_code: Option<String>,
}

/// One line of a detail batch. A line without `id` creates a new detail;
/// a line without `product_id` is ignored. A line with `id` must name the
/// detail's own product: a detail never changes product.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DetailLine {
    pub id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDetailsRequest {
    pub details: Vec<DetailLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithDetails {
    pub order: Order,
    pub details: Vec<OrderDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTotal {
    pub order_id: Uuid,
    pub total: i64,
}
