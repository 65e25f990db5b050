#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use storefront_orders::{
    db::{create_orm_conn, run_migrations},
    dto::orders::{CheckoutRequest, OrderWithDetails},
    entity::{
        DiscountCodes, Products,
        discount_codes::{ActiveModel as CodeActive, Model as CodeModel},
        products::{ActiveModel as ProductActive, Model as ProductModel},
    },
    middleware::auth::AuthUser,
    error::AppResult,
    services::{
        cart_service,
        inventory_service::{self, StockRelease},
    },
    state::AppState,
};
use uuid::Uuid;

/// Fresh in-memory database. One connection keeps the database alive and
/// serialises transactions the way row locks do on Postgres.
pub async fn setup_state() -> AppState {
    let orm = create_orm_conn("sqlite::memory:", 1)
        .await
        .expect("sqlite connection");
    run_migrations(&orm).await.expect("migrations");
    AppState { orm }
}

pub fn customer() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    }
}

pub fn operator() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "operator".into(),
    }
}

pub async fn create_product(state: &AppState, price: i64, stock_supplier: i32) -> ProductModel {
    insert_product(state, price, stock_supplier, false).await
}

pub async fn create_unlimited_product(state: &AppState, price: i64) -> ProductModel {
    insert_product(state, price, 0, true).await
}

async fn insert_product(
    state: &AppState,
    price: i64,
    stock_supplier: i32,
    unlimited: bool,
) -> ProductModel {
    ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Product {}", Uuid::new_v4())),
        description: Set(None),
        price: Set(price),
        stock_supplier: Set(stock_supplier),
        stock_sold: Set(0),
        unlimited: Set(unlimited),
        disabled: Set(false),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .expect("insert product")
}

pub async fn reload_product(state: &AppState, id: Uuid) -> ProductModel {
    Products::find_by_id(id)
        .one(&state.orm)
        .await
        .expect("query product")
        .expect("product exists")
}

#[derive(Debug, Clone, Default)]
pub struct CodeSpec {
    pub percentage_bps: i32,
    pub uses_max: Option<i32>,
    pub uses_per_user: Option<i32>,
    pub minimum_amount: Option<i64>,
}

pub async fn create_code(state: &AppState, code: &str, spec: CodeSpec) -> CodeModel {
    CodeActive {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_uppercase()),
        description: Set(format!("{code} discount")),
        percentage_bps: Set(spec.percentage_bps),
        active: Set(true),
        starts_at: Set(None),
        expires_at: Set(None),
        uses_max: Set(spec.uses_max),
        uses_per_user: Set(spec.uses_per_user),
        uses_current: Set(0),
        minimum_amount: Set(spec.minimum_amount),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .expect("insert discount code")
}

pub async fn reload_code(state: &AppState, id: Uuid) -> CodeModel {
    DiscountCodes::find_by_id(id)
        .one(&state.orm)
        .await
        .expect("query code")
        .expect("code exists")
}

/// Puts `quantity` units of `product_id` in the cart and checks out.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> OrderWithDetails {
    cart_service::add_item(state, user, product_id, quantity)
        .await
        .expect("add to cart");
    cart_service::checkout(state, user, CheckoutRequest::default())
        .await
        .expect("checkout")
}

/// Reserves stock in a transaction of its own.
pub async fn reserve_units(state: &AppState, product_id: Uuid, quantity: i32) -> AppResult<ProductModel> {
    let txn = state.orm.begin().await?;
    let product = inventory_service::reserve(&txn, product_id, quantity).await?;
    txn.commit().await?;
    Ok(product)
}

/// Releases stock in a transaction of its own.
pub async fn release_units(state: &AppState, product_id: Uuid, quantity: i32) -> AppResult<StockRelease> {
    let txn = state.orm.begin().await?;
    let release = inventory_service::release(&txn, product_id, quantity).await?;
    txn.commit().await?;
    Ok(release)
}
