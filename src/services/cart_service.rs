use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        cart::{CartLine, CartView},
        orders::{CheckoutRequest, OrderLineRequest, OrderWithDetails},
    },
    entity::{
        CartItems, Carts, Products,
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol, Model as CartItemModel},
        carts::{ActiveModel as CartActive, Column as CartCol, Model as CartModel},
        products::{Column as ProdCol, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    services::order_service::{self, NewOrder},
    state::AppState,
};

/// Returns the user's cart, creating it on first use. Two concurrent first
/// calls both end up with the same row.
pub async fn get_or_create<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartModel> {
    if let Some(cart) = find_cart(conn, user_id).await? {
        return Ok(cart);
    }

    let now = Utc::now();
    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    Carts::insert(cart)
        .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;

    find_cart(conn, user_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart for {user_id} vanished after insert")))
}

async fn find_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Option<CartModel>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?;
    Ok(cart)
}

async fn cart_items<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<Vec<CartItemModel>> {
    let items = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::CreatedAt)
        .all(conn)
        .await?;
    Ok(items)
}

async fn find_item<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<CartItemModel>> {
    let item = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .one(conn)
        .await?;
    Ok(item)
}

async fn product_for_cart<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<ProductModel> {
    let product = Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let available = product.available();
    if !available.covers(quantity) {
        return Err(AppError::InsufficientStock {
            product_id,
            available: available.units(),
        });
    }
    Ok(product)
}

pub async fn view(state: &AppState, user: &AuthUser) -> AppResult<CartView> {
    let cart = get_or_create(&state.orm, user.user_id).await?;
    let items = cart_items(&state.orm, cart.id).await?;

    let ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let mut products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let Some(product) = products.remove(&item.product_id) else {
            continue;
        };
        lines.push(CartLine {
            id: item.id,
            subtotal: product.price * i64::from(item.quantity),
            product: Product::from(product),
            quantity: item.quantity,
        });
    }

    Ok(CartView {
        cart_id: cart.id,
        total: lines.iter().map(|line| line.subtotal).sum(),
        total_units: lines.iter().map(|line| i64::from(line.quantity)).sum(),
        items: lines,
    })
}

/// Adds `quantity` units on top of what the cart already holds. Stock is
/// checked but not reserved.
pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartView> {
    if quantity <= 0 {
        return Err(AppError::InvalidQuantity { quantity });
    }

    let cart = get_or_create(&state.orm, user.user_id).await?;
    let existing = find_item(&state.orm, cart.id, product_id).await?;
    let new_quantity = existing
        .as_ref()
        .map_or(0, |item| item.quantity)
        .checked_add(quantity)
        .ok_or(AppError::InvalidQuantity { quantity })?;
    product_for_cart(&state.orm, product_id, new_quantity).await?;

    match existing {
        Some(item) => {
            let mut active: CartItemActive = item.into();
            active.quantity = Set(new_quantity);
            active.update(&state.orm).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product_id),
                quantity: Set(new_quantity),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
        }
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": new_quantity }),
    )
    .await;

    view(state, user).await
}

/// Replaces the quantity of a line; zero or less removes it.
pub async fn set_item_quantity(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartView> {
    if quantity <= 0 {
        return remove_item(state, user, product_id).await;
    }

    let cart = get_or_create(&state.orm, user.user_id).await?;
    let item = find_item(&state.orm, cart.id, product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    product_for_cart(&state.orm, product_id, quantity).await?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(quantity);
    active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;

    view(state, user).await
}

pub async fn remove_item(state: &AppState, user: &AuthUser, product_id: Uuid) -> AppResult<CartView> {
    let cart = get_or_create(&state.orm, user.user_id).await?;
    let item = find_item(&state.orm, cart.id, product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    item.delete(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    view(state, user).await
}

pub async fn clear(state: &AppState, user: &AuthUser) -> AppResult<CartView> {
    let cart = get_or_create(&state.orm, user.user_id).await?;
    let removed = CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?
        .rows_affected;

    tracing::debug!(user_id = %user.user_id, removed, "cart cleared");
    view(state, user).await
}

/// Turns the cart into a pending order. Either every line is reserved and
/// the cart is emptied, or nothing at all is written.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<OrderWithDetails> {
    let cart = find_cart(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::EmptyCart)?;
    let items = cart_items(&state.orm, cart.id).await?;
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let lines: Vec<OrderLineRequest> = items
        .iter()
        .map(|item| OrderLineRequest {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();
    let provisional_total = order_service::precheck_lines(&state.orm, &lines).await?;

    let txn = state.orm.begin().await?;
    let placed = order_service::place_order(
        &txn,
        NewOrder {
            user_id: Some(user.user_id),
            contact: None,
            shipping: payload.shipping,
            lines,
            discount_code: payload.discount_code,
            provisional_total,
        },
    )
    .await;

    let placed = match placed {
        Ok(placed) => placed,
        Err(err) => {
            txn.rollback().await?;
            tracing::info!(user_id = %user.user_id, error = %err, "checkout rolled back");
            return Err(err);
        }
    };

    // Lines added after the snapshot stay in the cart.
    let ordered: Vec<Uuid> = items.iter().map(|item| item.id).collect();
    CartItems::delete_many()
        .filter(CartItemCol::Id.is_in(ordered))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %placed.order.id,
        user_id = %user.user_id,
        total = placed.order.total,
        discount = placed.order.discount_amount,
        "checkout committed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({
            "order_id": placed.order.id,
            "total": placed.order.total,
            "discount_code": placed.order.discount_code,
        }),
    )
    .await;

    Ok(placed.into())
}
