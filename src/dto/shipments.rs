use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    lifecycle::ShipmentState,
    models::{Order, Shipment},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    pub order_id: Uuid,
    /// Defaults to the order's shipping address.
    pub shipping_address: Option<String>,
    pub carrier: String,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShipmentStatusRequest {
    pub state: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Tracking {
    pub tracking_number: Option<String>,
    pub state: ShipmentState,
    pub carrier: String,
    pub estimated_delivery: Option<String>,
    pub shipping_address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentWithOrder {
    pub shipment: Shipment,
    pub order: Order,
}
