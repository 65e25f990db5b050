use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::shipments::{CreateShipmentRequest, ShipmentWithOrder, Tracking},
    entity::{
        Shipments,
        shipments::{ActiveModel as ShipmentActive, Column as ShipmentCol, Model as ShipmentModel},
    },
    error::{AppError, AppResult},
    lifecycle::ShipmentState,
    middleware::auth::{AuthUser, ensure_staff},
    models::Shipment,
    services::order_service::{self, lock_order},
    state::AppState,
};

impl From<ShipmentModel> for Tracking {
    fn from(model: ShipmentModel) -> Self {
        Self {
            tracking_number: model.tracking_number,
            state: model.state,
            carrier: model.carrier,
            estimated_delivery: model.estimated_delivery,
            shipping_address: model.shipping_address,
        }
    }
}

pub async fn create(
    state: &AppState,
    staff: &AuthUser,
    payload: CreateShipmentRequest,
) -> AppResult<ShipmentWithOrder> {
    ensure_staff(staff)?;
    if payload.carrier.trim().is_empty() {
        return Err(AppError::BadRequest("carrier is required".into()));
    }

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, payload.order_id).await?;
    if order.state.is_terminal() {
        return Err(AppError::OrderLocked {
            order_id: order.id,
            state: order.state,
        });
    }

    let existing = Shipments::find()
        .filter(ShipmentCol::OrderId.eq(order.id))
        .one(&txn)
        .await?;
    if let Some(existing) = existing {
        return Err(AppError::DuplicateShipment {
            order_id: order.id,
            shipment_id: existing.id,
        });
    }

    let now = Utc::now();
    let shipment = ShipmentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        shipping_address: Set(payload
            .shipping_address
            .filter(|address| !address.trim().is_empty())
            .unwrap_or_else(|| order.shipping_address.clone())),
        carrier: Set(payload.carrier.trim().to_string()),
        tracking_number: Set(payload.tracking_number.filter(|n| !n.trim().is_empty())),
        estimated_delivery: Set(payload.estimated_delivery),
        state: Set(ShipmentState::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(shipment_id = %shipment.id, order_id = %order.id, "shipment created");
    audit::record(
        &state.orm,
        Some(staff.user_id),
        "shipment_create",
        "shipments",
        serde_json::json!({ "shipment_id": shipment.id, "order_id": order.id }),
    )
    .await;

    Ok(ShipmentWithOrder {
        shipment: shipment.into(),
        order: order.into(),
    })
}

/// Moves a shipment and drags the order along: `in_transit` ships it and
/// `delivered` delivers it. Repeating a state the order already reflects
/// leaves the order untouched.
pub async fn update_status(
    state: &AppState,
    staff: &AuthUser,
    shipment_id: Uuid,
    new_state: &str,
) -> AppResult<ShipmentWithOrder> {
    ensure_staff(staff)?;
    let target: ShipmentState = new_state
        .trim()
        .parse()
        .map_err(AppError::InvalidShipmentState)?;

    let txn = state.orm.begin().await?;
    let order_id = Shipments::find_by_id(shipment_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?
        .order_id;
    let mut order = lock_order(&txn, order_id).await?;
    let shipment = Shipments::find_by_id(shipment_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let reflected = target
        .order_event()
        .is_some_and(|(_, resulting)| order.state == resulting);
    if !reflected {
        if order.state.is_terminal() {
            return Err(AppError::OrderLocked {
                order_id: order.id,
                state: order.state,
            });
        }
        if let Some((event, _)) = target.order_event() {
            order = order_service::transition(&txn, order, event).await?;
        }
    }

    let previous = shipment.state;
    let mut active: ShipmentActive = shipment.into();
    active.state = Set(target);
    active.updated_at = Set(Utc::now().into());
    let shipment = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        shipment_id = %shipment.id,
        order_id = %order.id,
        from = %previous,
        to = %target,
        order_state = %order.state,
        "shipment status updated"
    );
    audit::record(
        &state.orm,
        Some(staff.user_id),
        "shipment_status",
        "shipments",
        serde_json::json!({
            "shipment_id": shipment.id,
            "order_id": order.id,
            "from": previous,
            "to": target,
        }),
    )
    .await;

    Ok(ShipmentWithOrder {
        shipment: shipment.into(),
        order: order.into(),
    })
}

pub async fn get_shipment(state: &AppState, user: &AuthUser, shipment_id: Uuid) -> AppResult<Shipment> {
    let shipment = Shipments::find_by_id(shipment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    order_service::get_visible_order(state, user, shipment.order_id).await?;
    Ok(shipment.into())
}

pub async fn tracking(state: &AppState, user: &AuthUser, shipment_id: Uuid) -> AppResult<Tracking> {
    let shipment = Shipments::find_by_id(shipment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    order_service::get_visible_order(state, user, shipment.order_id).await?;
    Ok(shipment.into())
}

/// Public lookup by carrier tracking number.
pub async fn tracking_by_number(state: &AppState, tracking_number: &str) -> AppResult<Tracking> {
    let shipment = Shipments::find()
        .filter(ShipmentCol::TrackingNumber.eq(tracking_number.trim()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(shipment.into())
}
