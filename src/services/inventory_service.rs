//! Per-product stock counters.
//!
//! `reserve` and `release` take the caller's connection so that they join the
//! caller's transaction; the product row is locked `FOR UPDATE` before it is
//! read and stays locked until that transaction ends.

use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    entity::products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Product,
    response::Meta,
    routes::params::LowStockQuery,
    state::AppState,
};

/// Outcome of giving units back to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRelease {
    pub product_id: Uuid,
    pub released: i32,
    /// Units that could not be released because `stock_sold` would have gone
    /// negative. Non-zero means the counters were already inconsistent.
    pub clamped: i32,
}

pub async fn lock_product<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Locks every listed product in ascending id order, so that concurrent
/// callers touching overlapping sets always acquire locks in the same order.
pub async fn lock_products<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> AppResult<Vec<ProductModel>> {
    let mut ids = product_ids.to_vec();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let products = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(conn)
        .await?;
    Ok(products)
}

pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<ProductModel> {
    if quantity <= 0 {
        return Err(AppError::InvalidQuantity { quantity });
    }

    let product = lock_product(conn, product_id).await?;
    let available = product.available();
    if !available.covers(quantity) {
        return Err(AppError::InsufficientStock {
            product_id,
            available: available.units(),
        });
    }

    let stock_sold = product
        .stock_sold
        .checked_add(quantity)
        .ok_or(AppError::InvalidQuantity { quantity })?;
    let mut active: ProductActive = product.into();
    active.stock_sold = Set(stock_sold);
    let updated = active.update(conn).await?;

    tracing::debug!(product_id = %product_id, quantity, stock_sold, "stock reserved");
    Ok(updated)
}

pub async fn release<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<StockRelease> {
    if quantity < 0 {
        return Err(AppError::InvalidQuantity { quantity });
    }

    let product = lock_product(conn, product_id).await?;
    let released = quantity.min(product.stock_sold.max(0));
    let clamped = quantity - released;

    if clamped > 0 {
        tracing::warn!(
            product_id = %product_id,
            requested = quantity,
            stock_sold = product.stock_sold,
            clamped,
            "stock release clamped at zero"
        );
    }

    if released > 0 || product.stock_sold < 0 {
        let stock_sold = (product.stock_sold - released).max(0);
        let mut active: ProductActive = product.into();
        active.stock_sold = Set(stock_sold);
        active.update(conn).await?;
    }

    Ok(StockRelease {
        product_id,
        released,
        clamped,
    })
}

/// Audits every clamped release; called once the owning transaction has
/// committed.
pub async fn audit_clamps<C: ConnectionTrait>(
    conn: &C,
    user_id: Option<Uuid>,
    order_id: Uuid,
    releases: &[StockRelease],
) {
    for release in releases.iter().filter(|r| r.clamped > 0) {
        audit::record(
            conn,
            user_id,
            "stock_release_clamped",
            "products",
            serde_json::json!({
                "order_id": order_id,
                "product_id": release.product_id,
                "released": release.released,
                "clamped": release.clamped,
            }),
        )
        .await;
    }
}

/// Admin restock or shrink of the supplier counter.
pub async fn adjust_supplier_stock(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    delta: i32,
) -> AppResult<Product> {
    ensure_staff(user)?;
    if delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = lock_product(&txn, product_id).await?;

    let stock_supplier = product
        .stock_supplier
        .checked_add(delta)
        .ok_or_else(|| AppError::BadRequest("stock adjustment out of range".into()))?;
    if stock_supplier < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }

    let mut active: ProductActive = product.into();
    active.stock_supplier = Set(stock_supplier);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": updated.id, "delta": delta }),
    )
    .await;

    Ok(updated.into())
}

/// Limited products whose available stock is at or below the threshold.
pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<(Vec<Product>, Meta)> {
    ensure_staff(user)?;
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::Unlimited.eq(false))
        .filter(
            Expr::expr(Expr::col(ProdCol::StockSupplier).sub(Expr::col(ProdCol::StockSold)))
                .lte(threshold),
        )
        .order_by_asc(ProdCol::StockSupplier)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok((items, Meta::new(page, limit, total)))
}
