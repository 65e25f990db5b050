mod common;

use common::{
    CodeSpec, create_code, create_product, create_unlimited_product, customer, reload_code,
    reload_product,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use storefront_orders::{
    dto::orders::{CheckoutRequest, DirectOrderRequest, GuestContact, OrderLineRequest, ShippingInfo},
    entity::{DiscountCodeUses, Orders},
    error::AppError,
    lifecycle::OrderState,
    services::{
        cart_service,
        discount_service::{self, CodeRejection},
        order_service,
    },
};

#[tokio::test]
async fn checkout_reserves_stock_and_empties_the_cart() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_product(&state, 1_000, 5).await;

    cart_service::add_item(&state, &user, product.id, 5).await?;
    let placed = cart_service::checkout(&state, &user, CheckoutRequest::default()).await?;

    assert_eq!(placed.order.state, OrderState::Pending);
    assert_eq!(placed.order.total, 5_000);
    assert_eq!(placed.order.amount_due, 5_000);
    assert_eq!(placed.details.len(), 1);
    assert_eq!(placed.details[0].subtotal, 5_000);

    let product = reload_product(&state, product.id).await;
    assert_eq!(product.stock_sold, 5);
    assert_eq!(product.available().units(), 0);

    let cart = cart_service::view(&state, &user).await?;
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, 0);
    Ok(())
}

#[tokio::test]
async fn checkout_with_an_empty_cart_is_rejected() {
    let state = common::setup_state().await;
    let user = customer();

    let err = cart_service::checkout(&state, &user, CheckoutRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
}

#[tokio::test]
async fn cart_accumulates_and_checks_live_availability() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_product(&state, 250, 4).await;

    cart_service::add_item(&state, &user, product.id, 2).await?;
    let cart = cart_service::add_item(&state, &user, product.id, 1).await?;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total, 750);
    assert_eq!(cart.total_units, 3);

    let err = cart_service::add_item(&state, &user, product.id, 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock { available: 4, .. }
    ));

    let err = cart_service::add_item(&state, &user, product.id, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity { quantity: 0 }));

    // Cart lines never reserve stock.
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 0);

    let cart = cart_service::set_item_quantity(&state, &user, product.id, 0).await?;
    assert!(cart.items.is_empty());

    let err = cart_service::remove_item(&state, &user, product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn cart_is_created_once_per_user() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();

    let first = cart_service::get_or_create(&state.orm, user.user_id).await?;
    let second = cart_service::get_or_create(&state.orm, user.user_id).await?;
    assert_eq!(first.id, second.id);
    Ok(())
}

#[tokio::test]
async fn shortage_rejects_checkout_without_writing_anything() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let plenty = create_product(&state, 100, 10).await;
    let scarce = create_product(&state, 100, 2).await;

    cart_service::add_item(&state, &user, plenty.id, 3).await?;
    cart_service::add_item(&state, &user, scarce.id, 2).await?;

    // Someone else buys the scarce product first.
    let other = customer();
    common::place_order(&state, &other, scarce.id, 1).await;

    let err = cart_service::checkout(&state, &user, CheckoutRequest::default())
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientStock {
            product_id,
            available,
        } => {
            assert_eq!(product_id, scarce.id);
            assert_eq!(available, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(reload_product(&state, plenty.id).await.stock_sold, 0);
    assert_eq!(reload_product(&state, scarce.id).await.stock_sold, 1);
    assert_eq!(Orders::find().count(&state.orm).await?, 1);
    assert_eq!(cart_service::view(&state, &user).await?.items.len(), 2);
    Ok(())
}

#[tokio::test]
async fn rejected_code_rolls_back_reservations_and_the_order_shell() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_product(&state, 1_000, 5).await;
    create_code(
        &state,
        "BIGSPEND",
        CodeSpec {
            percentage_bps: 1_000,
            minimum_amount: Some(10_000),
            ..Default::default()
        },
    )
    .await;

    cart_service::add_item(&state, &user, product.id, 2).await?;
    let err = cart_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            discount_code: Some("bigspend".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        AppError::CodeInvalid {
            reason: CodeRejection::BelowMinimum { minimum: 10_000 },
            ..
        }
    ));
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 0);
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(cart_service::view(&state, &user).await?.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn discount_code_is_redeemed_on_checkout() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_product(&state, 999, 10).await;
    let code = create_code(
        &state,
        "WELCOME10",
        CodeSpec {
            percentage_bps: 1_000,
            uses_per_user: Some(1),
            ..Default::default()
        },
    )
    .await;

    cart_service::add_item(&state, &user, product.id, 1).await?;
    let placed = cart_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            discount_code: Some(" welcome10 ".into()),
            ..Default::default()
        },
    )
    .await?;

    assert_eq!(placed.order.total, 999);
    assert_eq!(placed.order.discount_amount, 99);
    assert_eq!(placed.order.amount_due, 900);
    assert_eq!(placed.order.discount_code.as_deref(), Some("WELCOME10"));
    assert_eq!(reload_code(&state, code.id).await.uses_current, 1);
    assert_eq!(DiscountCodeUses::find().count(&state.orm).await?, 1);

    // Second use by the same buyer hits the per-user limit.
    cart_service::add_item(&state, &user, product.id, 1).await?;
    let err = cart_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            discount_code: Some("WELCOME10".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::CodeInvalid {
            reason: CodeRejection::UserLimitReached { limit: 1 },
            ..
        }
    ));
    assert_eq!(reload_code(&state, code.id).await.uses_current, 1);
    Ok(())
}

#[tokio::test]
async fn code_preview_reports_the_first_failing_check() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    create_code(
        &state,
        "ONCE",
        CodeSpec {
            percentage_bps: 2_500,
            uses_max: Some(1),
            minimum_amount: Some(500),
            ..Default::default()
        },
    )
    .await;

    let missing = discount_service::validate(&state.orm, "nope", 1_000, None).await?;
    assert!(!missing.valid);
    assert_eq!(missing.reason, CodeRejection::NotFound.to_string());

    let low = discount_service::validate(&state.orm, "once", 100, None).await?;
    assert!(!low.valid);
    assert_eq!(
        low.reason,
        CodeRejection::BelowMinimum { minimum: 500 }.to_string()
    );

    let ok = discount_service::validate(&state.orm, "once", 1_000, None).await?;
    assert!(ok.valid);
    assert_eq!(ok.discount_amount, Some(250));
    Ok(())
}

#[tokio::test]
async fn guest_orders_carry_contact_details() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let product = create_product(&state, 300, 3).await;
    create_code(
        &state,
        "GUEST",
        CodeSpec {
            percentage_bps: 5_000,
            uses_per_user: Some(1),
            ..Default::default()
        },
    )
    .await;

    let request = || DirectOrderRequest {
        contact: Some(GuestContact {
            email: "guest@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
        }),
        shipping: ShippingInfo {
            address: Some("1 Analytical Way".into()),
            postal_code: Some("1000".into()),
            zone: Some("north".into()),
            cost: Some(150),
            payment_method: Some("gateway".into()),
        },
        lines: vec![OrderLineRequest {
            product_id: product.id,
            quantity: 1,
        }],
        discount_code: Some("GUEST".into()),
    };

    let first = order_service::create_direct_order(&state, None, request()).await?;
    assert_eq!(first.order.user_id, None);
    assert_eq!(first.order.guest_email.as_deref(), Some("guest@example.com"));
    assert_eq!(first.order.shipping_cost, 150);
    assert_eq!(first.order.discount_amount, 150);

    // Per-user limits do not apply to guests.
    let second = order_service::create_direct_order(&state, None, request()).await?;
    assert_eq!(second.order.discount_amount, 150);
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 2);

    let err = order_service::create_direct_order(
        &state,
        None,
        DirectOrderRequest {
            contact: None,
            ..request()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn cart_quantity_cannot_overflow() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_unlimited_product(&state, 1).await;

    cart_service::add_item(&state, &user, product.id, i32::MAX).await?;
    let err = cart_service::add_item(&state, &user, product.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity { quantity: 1 }));

    let cart = cart_service::view(&state, &user).await?;
    assert_eq!(cart.items[0].quantity, i32::MAX);
    Ok(())
}

#[tokio::test]
async fn direct_order_lines_cannot_overflow() {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_unlimited_product(&state, 1).await;

    let err = order_service::create_direct_order(
        &state,
        Some(&user),
        DirectOrderRequest {
            contact: None,
            shipping: ShippingInfo::default(),
            lines: vec![
                OrderLineRequest {
                    product_id: product.id,
                    quantity: i32::MAX,
                },
                OrderLineRequest {
                    product_id: product.id,
                    quantity: 1,
                },
            ],
            discount_code: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity { quantity: 1 }));
}
