//! Payment records and their effect on the owning order.
//!
//! Every operation locks the order row first and the pay rows second.

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::{CreatePayRequest, GatewayNotification, PayWithOrder},
    entity::{
        Pays,
        orders::Model as OrderModel,
        pays::{ActiveModel as PayActive, Column as PayCol, Model as PayModel},
    },
    error::{AppError, AppResult},
    lifecycle::{OrderEvent, OrderState, PayMethod, PayState},
    middleware::auth::{AuthUser, ensure_staff},
    models::Pay,
    services::order_service::{self, lock_order, lock_order_for},
    state::AppState,
};

async fn open_pay<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Option<PayModel>> {
    let pay = Pays::find()
        .filter(PayCol::OrderId.eq(order_id))
        .filter(PayCol::State.is_in([PayState::Pending, PayState::InReview]))
        .lock(LockType::Update)
        .one(conn)
        .await?;
    Ok(pay)
}

/// Locks the pay's order, then the pay itself.
async fn lock_pay<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    pay_id: Uuid,
) -> AppResult<(PayModel, OrderModel)> {
    let order_id = Pays::find_by_id(pay_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?
        .order_id;
    let order = lock_order_for(conn, user, order_id).await?;
    let pay = Pays::find_by_id(pay_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((pay, order))
}

fn move_pay(pay: PayModel, to: PayState) -> AppResult<PayActive> {
    if !pay.state.can_transition_to(to) {
        return Err(AppError::InvalidPayState {
            pay_id: pay.id,
            state: pay.state,
        });
    }
    let mut active: PayActive = pay.into();
    active.state = Set(to);
    active.updated_at = Set(Utc::now().into());
    Ok(active)
}

/// Review events only fire from the state they leave; otherwise the order is
/// left as it is.
async fn follow_review<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    event: OrderEvent,
) -> AppResult<OrderModel> {
    if order.state.next(event).is_some() {
        order_service::transition(conn, order, event).await
    } else {
        Ok(order)
    }
}

pub async fn create(state: &AppState, user: &AuthUser, payload: CreatePayRequest) -> AppResult<Pay> {
    let txn = state.orm.begin().await?;
    let order = lock_order_for(&txn, user, payload.order_id).await?;

    if order.state != OrderState::Pending {
        return Err(AppError::OrderNotPayable {
            order_id: order.id,
            state: order.state,
        });
    }
    if let Some(open) = open_pay(&txn, order.id).await? {
        return Err(AppError::DuplicateOpenPayment {
            order_id: order.id,
            pay_id: open.id,
        });
    }

    let amount = payload.amount.unwrap_or_else(|| order.amount_due());
    if amount < 0 {
        return Err(AppError::BadRequest("amount must not be negative".into()));
    }

    let now = Utc::now();
    let pay = PayActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        method: Set(payload.method),
        amount: Set(amount),
        state: Set(PayState::Pending),
        external_id: Set(None),
        metadata: Set(None),
        proof_url: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(pay_id = %pay.id, order_id = %pay.order_id, amount, "payment opened");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "pay_create",
        "pays",
        serde_json::json!({ "pay_id": pay.id, "order_id": pay.order_id, "amount": amount }),
    )
    .await;

    Ok(pay.into())
}

/// Proof of payment uploaded; both the pay and a pending order go to review.
pub async fn mark_in_review(
    state: &AppState,
    user: &AuthUser,
    pay_id: Uuid,
    proof_url: Option<String>,
) -> AppResult<PayWithOrder> {
    let txn = state.orm.begin().await?;
    let (pay, order) = lock_pay(&txn, user, pay_id).await?;

    if pay.state != PayState::Pending {
        return Err(AppError::InvalidPayState {
            pay_id,
            state: pay.state,
        });
    }
    let mut active = move_pay(pay, PayState::InReview)?;
    if proof_url.is_some() {
        active.proof_url = Set(proof_url);
    }
    let pay = active.update(&txn).await?;
    let order = follow_review(&txn, order, OrderEvent::SubmitForReview).await?;

    txn.commit().await?;
    finish(state, user, "pay_in_review", pay, order).await
}

async fn settle(
    state: &AppState,
    staff: &AuthUser,
    pay_id: Uuid,
    from: &[PayState],
    action: &str,
) -> AppResult<PayWithOrder> {
    ensure_staff(staff)?;

    let txn = state.orm.begin().await?;
    let (pay, order) = lock_pay(&txn, staff, pay_id).await?;
    if !from.contains(&pay.state) {
        return Err(AppError::InvalidPayState {
            pay_id,
            state: pay.state,
        });
    }

    let pay = move_pay(pay, PayState::Completed)?.update(&txn).await?;
    let order = mirror_onto_order(&txn, order, PayState::Completed).await?;

    txn.commit().await?;
    finish(state, staff, action, pay, order).await
}

/// Gateway or staff confirmation of a payment. The order is marked paid only
/// while it is still pending or in review.
pub async fn complete(state: &AppState, staff: &AuthUser, pay_id: Uuid) -> AppResult<PayWithOrder> {
    settle(
        state,
        staff,
        pay_id,
        &[PayState::Pending, PayState::InReview],
        "pay_complete",
    )
    .await
}

/// Staff accepting a payment proof under review.
pub async fn approve(state: &AppState, staff: &AuthUser, pay_id: Uuid) -> AppResult<PayWithOrder> {
    settle(state, staff, pay_id, &[PayState::InReview], "pay_approve").await
}

pub async fn fail(state: &AppState, staff: &AuthUser, pay_id: Uuid) -> AppResult<PayWithOrder> {
    ensure_staff(staff)?;

    let txn = state.orm.begin().await?;
    let (pay, order) = lock_pay(&txn, staff, pay_id).await?;
    let pay = move_pay(pay, PayState::Failed)?.update(&txn).await?;
    txn.commit().await?;

    finish(state, staff, "pay_fail", pay, order).await
}

/// Staff rejecting a payment proof; the order goes back to pending.
pub async fn reject(state: &AppState, staff: &AuthUser, pay_id: Uuid) -> AppResult<PayWithOrder> {
    ensure_staff(staff)?;

    let txn = state.orm.begin().await?;
    let (pay, order) = lock_pay(&txn, staff, pay_id).await?;
    let pay = move_pay(pay, PayState::Failed)?.update(&txn).await?;
    let order = follow_review(&txn, order, OrderEvent::RevertReview).await?;
    txn.commit().await?;

    finish(state, staff, "pay_reject", pay, order).await
}

pub async fn cancel(state: &AppState, user: &AuthUser, pay_id: Uuid) -> AppResult<PayWithOrder> {
    let txn = state.orm.begin().await?;
    let (pay, order) = lock_pay(&txn, user, pay_id).await?;
    let pay = move_pay(pay, PayState::Cancelled)?.update(&txn).await?;
    txn.commit().await?;

    finish(state, user, "pay_cancel", pay, order).await
}

async fn finish(
    state: &AppState,
    user: &AuthUser,
    action: &str,
    pay: PayModel,
    order: OrderModel,
) -> AppResult<PayWithOrder> {
    tracing::info!(pay_id = %pay.id, order_id = %order.id, pay_state = %pay.state, order_state = %order.state, action, "payment updated");
    audit::record(
        &state.orm,
        Some(user.user_id),
        action,
        "pays",
        serde_json::json!({
            "pay_id": pay.id,
            "order_id": order.id,
            "pay_state": pay.state,
            "order_state": order.state,
        }),
    )
    .await;

    Ok(PayWithOrder {
        pay: pay.into(),
        order: order.into(),
    })
}

/// Mirrors a settled or reconciled pay state onto its order. The order may
/// have moved on (cancelled, or already paid through another pay), so an
/// event the order cannot take is skipped.
async fn mirror_onto_order<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    pay_state: PayState,
) -> AppResult<OrderModel> {
    let event = match pay_state {
        PayState::Completed => OrderEvent::Pay,
        PayState::InReview => OrderEvent::SubmitForReview,
        PayState::Failed => OrderEvent::RevertReview,
        PayState::Pending | PayState::Cancelled => return Ok(order),
    };

    if order.state.next(event).is_some() {
        return order_service::transition(conn, order, event).await;
    }
    if event == OrderEvent::Pay && order.state == OrderState::Cancelled {
        tracing::warn!(order_id = %order.id, "payment completed for a cancelled order");
    }
    Ok(order)
}

/// Idempotent upsert of a gateway notification keyed by `external_id`.
///
/// A pay never moves to a state of lower rank, and a terminal pay keeps its
/// state forever; re-deliveries only refresh amount and metadata.
pub async fn reconcile(state: &AppState, notification: GatewayNotification) -> AppResult<PayWithOrder> {
    let external_id = notification.external_id.trim().to_string();
    if external_id.is_empty() {
        return Err(AppError::BadRequest("external_id is required".into()));
    }
    let incoming = PayState::from_gateway_status(&notification.status);

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, notification.order_id).await?;

    let known = Pays::find()
        .filter(PayCol::ExternalId.eq(external_id.clone()))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let target = match known {
        Some(pay) if pay.order_id != order.id => {
            return Err(AppError::BadRequest(format!(
                "payment {external_id} belongs to another order"
            )));
        }
        Some(pay) => Some(pay),
        None => match open_pay(&txn, order.id).await? {
            Some(open) if open.external_id.is_none() => Some(open),
            Some(open) if incoming.is_open() => {
                return Err(AppError::DuplicateOpenPayment {
                    order_id: order.id,
                    pay_id: open.id,
                });
            }
            _ => None,
        },
    };

    let now = Utc::now();
    let (pay, changed) = match target {
        Some(pay) => {
            let current = pay.state;
            let next = if current.is_terminal() || incoming.rank() <= current.rank() {
                if current.is_terminal() && incoming != current {
                    tracing::warn!(
                        pay_id = %pay.id,
                        state = %current,
                        incoming = %incoming,
                        "notification ignored for a settled payment"
                    );
                }
                current
            } else {
                incoming
            };

            let mut active: PayActive = pay.into();
            active.external_id = Set(Some(external_id.clone()));
            active.amount = Set(notification.amount);
            if notification.metadata.is_some() {
                active.metadata = Set(notification.metadata.clone());
            }
            active.state = Set(next);
            active.updated_at = Set(now.into());
            (active.update(&txn).await?, next != current)
        }
        None => {
            let pay = PayActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                // Gateway checkouts are card payments.
                method: Set(PayMethod::Card),
                amount: Set(notification.amount),
                state: Set(incoming),
                external_id: Set(Some(external_id.clone())),
                metadata: Set(notification.metadata.clone()),
                proof_url: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            (pay, true)
        }
    };

    let order = if changed {
        mirror_onto_order(&txn, order, pay.state).await?
    } else {
        order
    };

    txn.commit().await?;

    tracing::info!(
        pay_id = %pay.id,
        order_id = %order.id,
        external_id = %external_id,
        status = %notification.status,
        pay_state = %pay.state,
        changed,
        "gateway notification reconciled"
    );
    audit::record(
        &state.orm,
        None,
        "pay_reconcile",
        "pays",
        serde_json::json!({
            "pay_id": pay.id,
            "order_id": order.id,
            "external_id": external_id,
            "status": notification.status,
            "changed": changed,
        }),
    )
    .await;

    Ok(PayWithOrder {
        pay: pay.into(),
        order: order.into(),
    })
}

pub async fn get_pay(state: &AppState, user: &AuthUser, pay_id: Uuid) -> AppResult<Pay> {
    let pay = Pays::find_by_id(pay_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    order_service::get_visible_order(state, user, pay.order_id).await?;
    Ok(pay.into())
}

pub async fn list_for_order(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<Vec<Pay>> {
    order_service::get_visible_order(state, user, order_id).await?;
    let pays = Pays::find()
        .filter(PayCol::OrderId.eq(order_id))
        .order_by_asc(PayCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Pay::from)
        .collect();
    Ok(pays)
}
