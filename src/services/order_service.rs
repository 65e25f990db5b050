use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        DetailLine, DirectOrderRequest, GuestContact, OrderLineRequest, OrderList, OrderTotal,
        OrderWithDetails, ShippingInfo,
    },
    entity::{
        DiscountCodeUses, OrderDetails, Orders, Pays, Products, Shipments,
        discount_code_uses::Column as CodeUseCol,
        order_details::{ActiveModel as DetailActive, Column as DetailCol, Model as DetailModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        pays::{ActiveModel as PayActive, Column as PayCol},
        products::{Column as ProdCol, Model as ProductModel},
        shipments::Column as ShipmentCol,
    },
    error::{AppError, AppResult},
    lifecycle::{OrderEvent, OrderState, PayState},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    models::{AuditEntry, Order, OrderDetail},
    response::Meta,
    routes::params::{OrderListQuery, SortOrder},
    services::{
        discount_service,
        inventory_service::{self, StockRelease},
    },
    state::AppState,
};

/// Everything needed to place an order inside a caller-owned transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub contact: Option<GuestContact>,
    pub shipping: ShippingInfo,
    pub lines: Vec<OrderLineRequest>,
    pub discount_code: Option<String>,
    /// Total written on the order shell before the details exist.
    pub provisional_total: i64,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: OrderModel,
    pub details: Vec<DetailModel>,
}

impl From<PlacedOrder> for OrderWithDetails {
    fn from(placed: PlacedOrder) -> Self {
        Self {
            order: placed.order.into(),
            details: placed.details.into_iter().map(OrderDetail::from).collect(),
        }
    }
}

/// Unlocked availability check run before any transaction is opened. It
/// rejects obviously short carts early; the locked pass inside the
/// transaction is authoritative. Returns the provisional total.
pub async fn precheck_lines<C: ConnectionTrait>(
    conn: &C,
    lines: &[OrderLineRequest],
) -> AppResult<i64> {
    let ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::InvalidQuantity {
                quantity: line.quantity,
            });
        }
        let units = requested.entry(line.product_id).or_default();
        *units = units
            .checked_add(line.quantity)
            .ok_or(AppError::InvalidQuantity {
                quantity: line.quantity,
            })?;
    }

    let mut total = 0i64;
    for line in lines {
        let product = products.get(&line.product_id).ok_or(AppError::NotFound)?;
        let available = product.available();
        if !available.covers(requested[&line.product_id]) {
            return Err(AppError::InsufficientStock {
                product_id: product.id,
                available: available.units(),
            });
        }
        total += product.price * i64::from(line.quantity);
    }
    Ok(total)
}

/// Creates the order shell, reserves every line under product locks taken in
/// ascending id order, writes the details and redeems the discount code.
/// Any error leaves the transaction dirty; the caller must roll it back.
pub async fn place_order<C: ConnectionTrait>(txn: &C, new_order: NewOrder) -> AppResult<PlacedOrder> {
    let now = Utc::now();
    let shipping = new_order.shipping;
    let contact = new_order.contact;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(new_order.user_id),
        state: Set(OrderState::Pending),
        total: Set(new_order.provisional_total),
        discount_code: Set(None),
        discount_amount: Set(0),
        shipping_cost: Set(shipping.cost.unwrap_or(0).max(0)),
        shipping_address: Set(shipping.address.unwrap_or_default()),
        postal_code: Set(shipping.postal_code.unwrap_or_default()),
        shipping_zone: Set(shipping.zone.unwrap_or_default()),
        payment_method: Set(shipping.payment_method.unwrap_or_else(|| "gateway".into())),
        guest_email: Set(contact.as_ref().map(|c| c.email.clone())),
        guest_first_name: Set(contact.as_ref().map(|c| c.first_name.clone())),
        guest_last_name: Set(contact.as_ref().map(|c| c.last_name.clone())),
        guest_phone: Set(contact.as_ref().and_then(|c| c.phone.clone())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    let product_ids: Vec<Uuid> = new_order.lines.iter().map(|line| line.product_id).collect();
    inventory_service::lock_products(txn, &product_ids).await?;

    let mut details = Vec::with_capacity(new_order.lines.len());
    for line in &new_order.lines {
        let product = inventory_service::reserve(txn, line.product_id, line.quantity).await?;
        let detail = insert_detail(txn, order.id, &product, line.quantity).await?;
        details.push(detail);
    }

    let mut order = write_total(txn, order).await?;

    if let Some(code) = new_order
        .discount_code
        .as_deref()
        .filter(|code| !code.trim().is_empty())
    {
        let applied =
            discount_service::apply(txn, code, order.id, new_order.user_id, order.total).await?;
        let mut active: OrderActive = order.into();
        active.discount_code = Set(Some(applied.code));
        active.discount_amount = Set(applied.discount_amount);
        order = active.update(txn).await?;
    }

    Ok(PlacedOrder { order, details })
}

/// Order placed straight from a list of lines, for guests and for buyers
/// coming from the gateway preference flow.
pub async fn create_direct_order(
    state: &AppState,
    user: Option<&AuthUser>,
    payload: DirectOrderRequest,
) -> AppResult<OrderWithDetails> {
    if payload.lines.is_empty() {
        return Err(AppError::EmptyCart);
    }
    if user.is_none() && payload.contact.is_none() {
        return Err(AppError::BadRequest("guest orders need contact details".into()));
    }

    let provisional_total = precheck_lines(&state.orm, &payload.lines).await?;
    let user_id = user.map(|u| u.user_id);

    let txn = state.orm.begin().await?;
    let placed = place_order(
        &txn,
        NewOrder {
            user_id,
            contact: payload.contact,
            shipping: payload.shipping,
            lines: payload.lines,
            discount_code: payload.discount_code,
            provisional_total,
        },
    )
    .await;

    let placed = match placed {
        Ok(placed) => placed,
        Err(err) => {
            txn.rollback().await?;
            tracing::info!(error = %err, "direct order rejected");
            return Err(err);
        }
    };
    txn.commit().await?;

    tracing::info!(order_id = %placed.order.id, total = placed.order.total, "direct order placed");
    audit::record(
        &state.orm,
        user_id,
        "order_create",
        "orders",
        serde_json::json!({
            "order_id": placed.order.id,
            "guest": user_id.is_none(),
            "discount_code": placed.order.discount_code,
        }),
    )
    .await;

    Ok(placed.into())
}

async fn insert_detail<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    product: &ProductModel,
    quantity: i32,
) -> AppResult<DetailModel> {
    let detail = DetailActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(product.id),
        quantity: Set(quantity),
        subtotal: Set(product.price * i64::from(quantity)),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(detail)
}

async fn order_details<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<DetailModel>> {
    let details = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order_id))
        .order_by_asc(DetailCol::CreatedAt)
        .all(conn)
        .await?;
    Ok(details)
}

/// Locks the order row. Owners may reach their own orders, staff any order;
/// everyone else gets `NotFound`.
pub async fn lock_order_for<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderModel> {
    let order = lock_order(conn, order_id).await?;
    if order.user_id != Some(user.user_id) && !user.is_staff() {
        return Err(AppError::NotFound);
    }
    Ok(order)
}

pub async fn lock_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Runs `event` through the order transition table and persists the result.
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    event: OrderEvent,
) -> AppResult<OrderModel> {
    let Some(next) = order.state.next(event) else {
        return Err(AppError::InvalidTransition {
            order_id: order.id,
            state: order.state,
            event,
        });
    };

    let from = order.state;
    let mut active: OrderActive = order.into();
    active.state = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(conn).await?;

    tracing::info!(order_id = %order.id, %from, to = %next, %event, "order transitioned");
    Ok(order)
}

/// Sets the total to the sum of the current detail subtotals.
async fn write_total<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<OrderModel> {
    let total: i64 = order_details(conn, order.id)
        .await?
        .iter()
        .map(|detail| detail.subtotal)
        .sum();

    if total == order.total {
        return Ok(order);
    }

    let mut active: OrderActive = order.into();
    active.total = Set(total);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

fn ensure_mutable(order: &OrderModel) -> AppResult<()> {
    if !order.state.allows_detail_mutation() {
        return Err(AppError::OrderLocked {
            order_id: order.id,
            state: order.state,
        });
    }
    Ok(())
}

async fn apply_detail_lines<C: ConnectionTrait>(
    txn: &C,
    order: &OrderModel,
    lines: &[DetailLine],
    releases: &mut Vec<StockRelease>,
) -> AppResult<usize> {
    let existing: HashMap<Uuid, DetailModel> = order_details(txn, order.id)
        .await?
        .into_iter()
        .map(|detail| (detail.id, detail))
        .collect();

    let mut product_ids: Vec<Uuid> = lines.iter().filter_map(|line| line.product_id).collect();
    product_ids.extend(
        lines
            .iter()
            .filter_map(|line| line.id)
            .filter_map(|id| existing.get(&id))
            .map(|detail| detail.product_id),
    );
    let locked: HashMap<Uuid, ProductModel> = inventory_service::lock_products(txn, &product_ids)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut applied = 0;
    for line in lines {
        let Some(product_id) = line.product_id else {
            continue;
        };
        if !locked.contains_key(&product_id) {
            tracing::debug!(order_id = %order.id, product_id = %product_id, "detail line skipped: unknown product");
            continue;
        }
        if line.quantity <= 0 {
            return Err(AppError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        match line.id {
            Some(detail_id) => {
                let detail = OrderDetails::find_by_id(detail_id)
                    .one(txn)
                    .await?
                    .filter(|detail| detail.order_id == order.id)
                    .ok_or(AppError::DetailNotOwned {
                        order_id: order.id,
                        detail_id,
                    })?;
                if detail.product_id != product_id {
                    return Err(AppError::BadRequest(format!(
                        "detail {detail_id} is for product {}, not {product_id}",
                        detail.product_id
                    )));
                }

                let delta = line.quantity - detail.quantity;
                if delta > 0 {
                    inventory_service::reserve(txn, detail.product_id, delta).await?;
                } else if delta < 0 {
                    releases.push(inventory_service::release(txn, detail.product_id, -delta).await?);
                }

                let product = Products::find_by_id(detail.product_id)
                    .one(txn)
                    .await?
                    .ok_or(AppError::NotFound)?;

                let mut active: DetailActive = detail.into();
                active.quantity = Set(line.quantity);
                active.subtotal = Set(product.price * i64::from(line.quantity));
                active.update(txn).await?;
            }
            None => {
                let product = inventory_service::reserve(txn, product_id, line.quantity).await?;
                insert_detail(txn, order.id, &product, line.quantity).await?;
            }
        }
        applied += 1;
    }
    Ok(applied)
}

/// Applies a batch of detail edits. Lines are applied in order and are not
/// rolled back when a later line fails: the total is recomputed, the work so
/// far is committed and the failing line's error is returned.
pub async fn update_details(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    lines: Vec<DetailLine>,
) -> AppResult<OrderWithDetails> {
    let txn = state.orm.begin().await?;
    let order = lock_order_for(&txn, user, order_id).await?;
    ensure_mutable(&order)?;

    let mut releases = Vec::new();
    let outcome = match apply_detail_lines(&txn, &order, &lines, &mut releases).await {
        Err(err @ AppError::OrmError(_)) => {
            txn.rollback().await?;
            return Err(err);
        }
        other => other,
    };

    let order = write_total(&txn, order).await?;
    let details = order_details(&txn, order.id).await?;
    txn.commit().await?;

    inventory_service::audit_clamps(&state.orm, Some(user.user_id), order.id, &releases).await;

    let applied = match outcome {
        Ok(applied) => applied,
        Err(err) => {
            tracing::warn!(order_id = %order.id, error = %err, "detail batch stopped early");
            audit::record(
                &state.orm,
                Some(user.user_id),
                "order_details_partial",
                "order_details",
                serde_json::json!({ "order_id": order.id, "error": err.to_string() }),
            )
            .await;
            return Err(err);
        }
    };

    tracing::info!(order_id = %order.id, applied, total = order.total, "order details updated");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_details_update",
        "order_details",
        serde_json::json!({ "order_id": order.id, "applied": applied, "total": order.total }),
    )
    .await;

    Ok(OrderWithDetails {
        order: order.into(),
        details: details.into_iter().map(OrderDetail::from).collect(),
    })
}

pub async fn remove_detail(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    detail_id: Uuid,
) -> AppResult<OrderWithDetails> {
    let txn = state.orm.begin().await?;
    let order = lock_order_for(&txn, user, order_id).await?;
    ensure_mutable(&order)?;

    let detail = OrderDetails::find_by_id(detail_id)
        .one(&txn)
        .await?
        .filter(|detail| detail.order_id == order.id)
        .ok_or(AppError::DetailNotFound { order_id, detail_id })?;

    let release = inventory_service::release(&txn, detail.product_id, detail.quantity).await?;
    detail.delete(&txn).await?;

    let order = write_total(&txn, order).await?;
    let details = order_details(&txn, order.id).await?;
    txn.commit().await?;

    inventory_service::audit_clamps(&state.orm, Some(user.user_id), order.id, &[release]).await;
    tracing::info!(order_id = %order.id, detail_id = %detail_id, total = order.total, "order detail removed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_detail_remove",
        "order_details",
        serde_json::json!({ "order_id": order.id, "detail_id": detail_id }),
    )
    .await;

    Ok(OrderWithDetails {
        order: order.into(),
        details: details.into_iter().map(OrderDetail::from).collect(),
    })
}

/// Releases every detail back to stock, once per order. Callers hold the
/// order lock.
async fn release_details<C: ConnectionTrait>(
    conn: &C,
    details: &[DetailModel],
) -> AppResult<Vec<StockRelease>> {
    let product_ids: Vec<Uuid> = details.iter().map(|detail| detail.product_id).collect();
    inventory_service::lock_products(conn, &product_ids).await?;

    let mut releases = Vec::with_capacity(details.len());
    for detail in details {
        releases.push(inventory_service::release(conn, detail.product_id, detail.quantity).await?);
    }
    Ok(releases)
}

pub async fn cancel(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let order = lock_order_for(&txn, user, order_id).await?;

    if order.state == OrderState::Cancelled {
        return Err(AppError::AlreadyCancelled { order_id });
    }
    if order.state.next(OrderEvent::Cancel).is_none() {
        return Err(AppError::InvalidCancelState {
            order_id,
            state: order.state,
        });
    }

    let details = order_details(&txn, order.id).await?;
    let releases = release_details(&txn, &details).await?;
    let order = transition(&txn, order, OrderEvent::Cancel).await?;
    txn.commit().await?;

    inventory_service::audit_clamps(&state.orm, Some(user.user_id), order.id, &releases).await;
    let released: i32 = releases.iter().map(|r| r.released).sum();
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id, "released": released }),
    )
    .await;

    Ok(order.into())
}

pub async fn recompute_total(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderTotal> {
    let txn = state.orm.begin().await?;
    let order = lock_order_for(&txn, user, order_id).await?;
    let order = write_total(&txn, order).await?;
    txn.commit().await?;

    Ok(OrderTotal {
        order_id: order.id,
        total: order.total,
    })
}

/// Removes an order and everything hanging off it. Stock is given back
/// unless the order was already cancelled, which released it before.
pub async fn force_delete(state: &AppState, admin: &AuthUser, order_id: Uuid) -> AppResult<()> {
    ensure_admin(admin)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;

    let pays = Pays::find()
        .filter(PayCol::OrderId.eq(order.id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let mut failed_pays = Vec::new();
    for pay in pays.into_iter().filter(|pay| pay.state.is_open()) {
        failed_pays.push(pay.id);
        let mut active: PayActive = pay.into();
        active.state = Set(PayState::Failed);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    }

    let shipment = Shipments::find()
        .filter(ShipmentCol::OrderId.eq(order.id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    let details = order_details(&txn, order.id).await?;
    let releases = if order.state == OrderState::Cancelled {
        Vec::new()
    } else {
        release_details(&txn, &details).await?
    };

    Pays::delete_many()
        .filter(PayCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    if let Some(shipment) = shipment {
        shipment.delete(&txn).await?;
    }
    DiscountCodeUses::delete_many()
        .filter(CodeUseCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    OrderDetails::delete_many()
        .filter(DetailCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    let previous_state = order.state;
    order.delete(&txn).await?;

    txn.commit().await?;

    inventory_service::audit_clamps(&state.orm, Some(admin.user_id), order_id, &releases).await;
    tracing::warn!(order_id = %order_id, state = %previous_state, "order force-deleted");
    audit::record(
        &state.orm,
        Some(admin.user_id),
        "order_force_delete",
        "orders",
        serde_json::json!({
            "order_id": order_id,
            "state": previous_state,
            "failed_pays": failed_pays,
            "released": releases.iter().map(|r| r.released).sum::<i32>(),
        }),
    )
    .await;

    Ok(())
}

pub async fn mark_preparing(state: &AppState, staff: &AuthUser, order_id: Uuid) -> AppResult<Order> {
    ensure_staff(staff)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let order = transition(&txn, order, OrderEvent::Prepare).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(staff.user_id),
        "order_prepare",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(order.into())
}

async fn list_with(
    state: &AppState,
    condition: Condition,
    query: &OrderListQuery,
) -> AppResult<(OrderList, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = condition;
    if let Some(order_state) = query.state {
        condition = condition.add(OrderCol::State.eq(order_state));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok((OrderList { items }, Meta::new(page, limit, total)))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<(OrderList, Meta)> {
    list_with(
        state,
        Condition::all().add(OrderCol::UserId.eq(user.user_id)),
        &query,
    )
    .await
}

pub async fn list_all_orders(
    state: &AppState,
    staff: &AuthUser,
    query: OrderListQuery,
) -> AppResult<(OrderList, Meta)> {
    ensure_staff(staff)?;
    list_with(state, Condition::all(), &query).await
}

async fn with_details(state: &AppState, order: OrderModel) -> AppResult<OrderWithDetails> {
    let details = order_details(&state.orm, order.id).await?;
    Ok(OrderWithDetails {
        order: order.into(),
        details: details.into_iter().map(OrderDetail::from).collect(),
    })
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderWithDetails> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(order_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    with_details(state, order).await
}

/// Unlocked read of an order the caller may see: their own, or any for staff.
pub async fn get_visible_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != Some(user.user_id) && !user.is_staff() {
        return Err(AppError::NotFound);
    }
    Ok(order)
}

pub async fn get_order_admin(
    state: &AppState,
    staff: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderWithDetails> {
    ensure_staff(staff)?;
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    with_details(state, order).await
}

/// Audit trail of an order, oldest first. Kept after a force delete.
pub async fn history(state: &AppState, staff: &AuthUser, order_id: Uuid) -> AppResult<Vec<AuditEntry>> {
    ensure_staff(staff)?;
    let entries = audit::for_order(&state.orm, order_id).await?;
    Ok(entries.into_iter().map(AuditEntry::from).collect())
}
