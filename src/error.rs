use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    lifecycle::{OrderEvent, OrderState, PayState},
    response::ApiResponse,
    services::discount_service::CodeRejection,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Quantity must be greater than zero, got {quantity}")]
    InvalidQuantity { quantity: i32 },

    #[error("Insufficient stock for product {product_id}: only {available} available")]
    InsufficientStock { product_id: Uuid, available: i32 },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Order {order_id} cannot be modified in state '{state}'")]
    OrderLocked { order_id: Uuid, state: OrderState },

    #[error("Detail {detail_id} does not belong to order {order_id}")]
    DetailNotOwned { order_id: Uuid, detail_id: Uuid },

    #[error("Detail {detail_id} not found in order {order_id}")]
    DetailNotFound { order_id: Uuid, detail_id: Uuid },

    #[error("Order {order_id} is already cancelled")]
    AlreadyCancelled { order_id: Uuid },

    #[error("Order {order_id} cannot be cancelled in state '{state}'")]
    InvalidCancelState { order_id: Uuid, state: OrderState },

    #[error("Order {order_id} cannot {event} from state '{state}'")]
    InvalidTransition {
        order_id: Uuid,
        state: OrderState,
        event: OrderEvent,
    },

    #[error("Payment {pay_id} cannot move from state '{state}'")]
    InvalidPayState { pay_id: Uuid, state: PayState },

    #[error("Order {order_id} is not payable in state '{state}'")]
    OrderNotPayable { order_id: Uuid, state: OrderState },

    #[error("Order {order_id} already has open payment {pay_id}")]
    DuplicateOpenPayment { order_id: Uuid, pay_id: Uuid },

    #[error("Invalid shipment state '{0}'")]
    InvalidShipmentState(String),

    #[error("Order {order_id} already has shipment {shipment_id}")]
    DuplicateShipment { order_id: Uuid, shipment_id: Uuid },

    #[error("Discount code {code} rejected: {reason}")]
    CodeInvalid { code: String, reason: CodeRejection },

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound
            | AppError::DetailNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_)
            | AppError::InvalidQuantity { .. }
            | AppError::EmptyCart
            | AppError::DetailNotOwned { .. }
            | AppError::InvalidShipmentState(_)
            | AppError::CodeInvalid { .. } => StatusCode::BAD_REQUEST,
            AppError::InsufficientStock { .. }
            | AppError::OrderLocked { .. }
            | AppError::AlreadyCancelled { .. }
            | AppError::InvalidCancelState { .. }
            | AppError::InvalidTransition { .. }
            | AppError::InvalidPayState { .. }
            | AppError::OrderNotPayable { .. }
            | AppError::DuplicateOpenPayment { .. }
            | AppError::DuplicateShipment { .. } => StatusCode::CONFLICT,
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse::failure(message.clone(), ErrorData { error: message });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
