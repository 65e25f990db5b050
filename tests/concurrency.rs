mod common;

use common::{CodeSpec, create_code, create_product, customer, place_order, reload_code, reload_product};
use storefront_orders::{
    dto::orders::CheckoutRequest,
    error::AppError,
    services::{cart_service, discount_service::CodeRejection, order_service},
};
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_checkouts_never_oversell() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let product = create_product(&state, 100, 3).await;

    let mut buyers = Vec::new();
    for _ in 0..8 {
        let buyer = customer();
        cart_service::add_item(&state, &buyer, product.id, 1).await?;
        buyers.push(buyer);
    }

    let mut tasks = JoinSet::new();
    for buyer in buyers {
        let state = state.clone();
        tasks.spawn(async move {
            cart_service::checkout(&state, &buyer, CheckoutRequest::default()).await
        });
    }

    let mut placed = 0;
    let mut short = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome? {
            Ok(_) => placed += 1,
            Err(AppError::InsufficientStock { .. }) => short += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(placed, 3);
    assert_eq!(short, 5);
    let product = reload_product(&state, product.id).await;
    assert_eq!(product.stock_sold, 3);
    assert!(product.stock_sold <= product.stock_supplier);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_use_code_is_redeemed_once() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let product = create_product(&state, 1_000, 10).await;
    let code = create_code(
        &state,
        "ONLYONE",
        CodeSpec {
            percentage_bps: 2_000,
            uses_max: Some(1),
            ..Default::default()
        },
    )
    .await;

    let mut tasks = JoinSet::new();
    for _ in 0..2 {
        let buyer = customer();
        cart_service::add_item(&state, &buyer, product.id, 1).await?;
        let state = state.clone();
        tasks.spawn(async move {
            cart_service::checkout(
                &state,
                &buyer,
                CheckoutRequest {
                    discount_code: Some("ONLYONE".into()),
                    ..Default::default()
                },
            )
            .await
        });
    }

    let mut redeemed = 0;
    let mut exhausted = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome? {
            Ok(placed) => {
                assert_eq!(placed.order.discount_amount, 200);
                redeemed += 1;
            }
            Err(AppError::CodeInvalid {
                reason: CodeRejection::Exhausted,
                ..
            }) => exhausted += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!((redeemed, exhausted), (1, 1));
    assert_eq!(reload_code(&state, code.id).await.uses_current, 1);
    // The losing checkout rolled back its reservation.
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancels_release_once() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_product(&state, 100, 5).await;
    let placed = place_order(&state, &user, product.id, 4).await;

    let mut tasks = JoinSet::new();
    for _ in 0..2 {
        let state = state.clone();
        let user = user.clone();
        let order_id = placed.order.id;
        tasks.spawn(async move { order_service::cancel(&state, &user, order_id).await });
    }

    let mut cancelled = 0;
    let mut repeated = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome? {
            Ok(_) => cancelled += 1,
            Err(AppError::AlreadyCancelled { .. }) => repeated += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!((cancelled, repeated), (1, 1));
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_line_added_during_checkout_is_never_lost() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let first = create_product(&state, 100, 5).await;
    let late = create_product(&state, 250, 5).await.id;
    let buyer = customer();
    cart_service::add_item(&state, &buyer, first.id, 1).await?;

    let checkout = {
        let state = state.clone();
        let buyer = buyer.clone();
        tokio::spawn(async move {
            cart_service::checkout(&state, &buyer, CheckoutRequest::default()).await
        })
    };
    let add = {
        let state = state.clone();
        let buyer = buyer.clone();
        tokio::spawn(async move { cart_service::add_item(&state, &buyer, late, 2).await })
    };

    let placed = checkout.await??;
    add.await??;

    let ordered = placed.details.iter().any(|d| d.product_id == late);
    let cart = cart_service::view(&state, &buyer).await?;
    let in_cart = cart.items.iter().any(|line| line.product.id == late);
    assert!(ordered ^ in_cart);
    assert!(placed.details.iter().any(|d| d.product_id == first.id));
    assert!(!cart.items.iter().any(|line| line.product.id == first.id));
    Ok(())
}
