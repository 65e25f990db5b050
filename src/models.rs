use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{audit_logs, discount_code_uses, order_details, orders, pays, products, shipments},
    lifecycle::{OrderState, PayMethod, PayState, ShipmentState},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock_supplier: i32,
    pub stock_sold: i32,
    pub unlimited: bool,
    /// `None` when the supplier stock is unlimited.
    pub available: Option<i32>,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        let available = match model.available() {
            products::Availability::Unlimited => None,
            products::Availability::Limited(units) => Some(units),
        };
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock_supplier: model.stock_supplier,
            stock_sold: model.stock_sold,
            unlimited: model.unlimited,
            available,
            disabled: model.disabled,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub state: OrderState,
    pub total: i64,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub amount_due: i64,
    pub shipping_cost: i64,
    pub shipping_address: String,
    pub postal_code: String,
    pub shipping_zone: String,
    pub payment_method: String,
    pub guest_email: Option<String>,
    pub guest_first_name: Option<String>,
    pub guest_last_name: Option<String>,
    pub guest_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        let amount_due = model.amount_due();
        Self {
            id: model.id,
            user_id: model.user_id,
            state: model.state,
            total: model.total,
            discount_code: model.discount_code,
            discount_amount: model.discount_amount,
            amount_due,
            shipping_cost: model.shipping_cost,
            shipping_address: model.shipping_address,
            postal_code: model.postal_code,
            shipping_zone: model.shipping_zone,
            payment_method: model.payment_method,
            guest_email: model.guest_email,
            guest_first_name: model.guest_first_name,
            guest_last_name: model.guest_last_name,
            guest_phone: model.guest_phone,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub subtotal: i64,
    pub created_at: DateTime<Utc>,
}

impl From<order_details::Model> for OrderDetail {
    fn from(model: order_details::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            subtotal: model.subtotal,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Pay {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: PayMethod,
    pub amount: i64,
    pub state: PayState,
    pub external_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    pub proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<pays::Model> for Pay {
    fn from(model: pays::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            method: model.method,
            amount: model.amount,
            state: model.state,
            external_id: model.external_id,
            metadata: model.metadata,
            proof_url: model.proof_url,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shipping_address: String,
    pub carrier: String,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<String>,
    pub state: ShipmentState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<shipments::Model> for Shipment {
    fn from(model: shipments::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            shipping_address: model.shipping_address,
            carrier: model.carrier,
            tracking_number: model.tracking_number,
            estimated_delivery: model.estimated_delivery,
            state: model.state,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DiscountCodeUse {
    pub id: Uuid,
    pub code_id: Uuid,
    pub order_id: Uuid,
    pub user_id: Option<Uuid>,
    pub amount_discounted: i64,
    pub used_at: DateTime<Utc>,
}

impl From<discount_code_uses::Model> for DiscountCodeUse {
    fn from(model: discount_code_uses::Model) -> Self {
        Self {
            id: model.id,
            code_id: model.code_id,
            order_id: model.order_id,
            user_id: model.user_id,
            amount_discounted: model.amount_discounted,
            used_at: model.used_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<audit_logs::Model> for AuditEntry {
    fn from(model: audit_logs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            resource: model.resource,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
