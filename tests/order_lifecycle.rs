mod common;

use common::{
    admin, create_product, create_unlimited_product, customer, place_order, release_units,
    reload_product, reserve_units,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use storefront_orders::{
    dto::{orders::DetailLine, payments::CreatePayRequest},
    entity::{OrderDetails, Orders, Pays, order_details::Column as DetailCol},
    error::AppError,
    lifecycle::{OrderState, PayMethod},
    routes::params::OrderListQuery,
    services::{inventory_service, order_service, payment_service},
};
use uuid::Uuid;

#[tokio::test]
async fn cancel_gives_stock_back_exactly_once() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let product = create_product(&state, 500, 5).await;

    let placed = place_order(&state, &user, product.id, 2).await;
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 2);

    let order = order_service::cancel(&state, &user, placed.order.id).await?;
    assert_eq!(order.state, OrderState::Cancelled);
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 0);

    let err = order_service::cancel(&state, &user, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyCancelled { .. }));
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 0);

    let history: Vec<String> = order_service::history(&state, &admin(), placed.order.id)
        .await?
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(history, ["checkout", "order_cancel"]);

    let err = order_service::history(&state, &user, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn paid_orders_cannot_be_cancelled() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let staff = admin();
    let product = create_product(&state, 500, 5).await;
    let placed = place_order(&state, &user, product.id, 1).await;

    let pay = payment_service::create(
        &state,
        &user,
        CreatePayRequest {
            order_id: placed.order.id,
            method: PayMethod::Card,
            amount: None,
        },
    )
    .await?;
    payment_service::complete(&state, &staff, pay.id).await?;

    let err = order_service::cancel(&state, &user, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidCancelState {
            state: OrderState::Paid,
            ..
        }
    ));
    assert_eq!(reload_product(&state, product.id).await.stock_sold, 1);
    Ok(())
}

#[tokio::test]
async fn detail_edits_reconcile_stock_and_total() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let b = create_product(&state, 40, 10).await;
    let placed = place_order(&state, &user, a.id, 2).await;
    let detail_id = placed.details[0].id;

    let updated = order_service::update_details(
        &state,
        &user,
        placed.order.id,
        vec![
            DetailLine {
                id: Some(detail_id),
                product_id: Some(a.id),
                quantity: 5,
            },
            DetailLine {
                id: None,
                product_id: Some(b.id),
                quantity: 3,
            },
        ],
    )
    .await?;
    assert_eq!(updated.details.len(), 2);
    assert_eq!(updated.order.total, 5 * 100 + 3 * 40);
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 5);
    assert_eq!(reload_product(&state, b.id).await.stock_sold, 3);

    let updated = order_service::update_details(
        &state,
        &user,
        placed.order.id,
        vec![DetailLine {
            id: Some(detail_id),
            product_id: Some(a.id),
            quantity: 1,
        }],
    )
    .await?;
    assert_eq!(updated.order.total, 100 + 3 * 40);
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 1);

    let total = order_service::recompute_total(&state, &user, placed.order.id).await?;
    assert_eq!(total.total, updated.order.total);
    let again = order_service::recompute_total(&state, &user, placed.order.id).await?;
    assert_eq!(again.total, total.total);
    Ok(())
}

#[tokio::test]
async fn failing_detail_line_keeps_earlier_lines() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let b = create_product(&state, 70, 10).await;
    let mine = place_order(&state, &user, a.id, 1).await;
    let theirs = place_order(&state, &customer(), a.id, 1).await;

    let err = order_service::update_details(
        &state,
        &user,
        mine.order.id,
        vec![
            DetailLine {
                id: None,
                product_id: Some(b.id),
                quantity: 2,
            },
            DetailLine {
                id: Some(theirs.details[0].id),
                product_id: Some(a.id),
                quantity: 4,
            },
            DetailLine {
                id: None,
                product_id: Some(b.id),
                quantity: 1,
            },
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::DetailNotOwned { .. }));

    let order = order_service::get_order(&state, &user, mine.order.id).await?;
    assert_eq!(order.details.len(), 2);
    assert_eq!(order.order.total, 100 + 2 * 70);
    assert_eq!(reload_product(&state, b.id).await.stock_sold, 2);
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 2);

    let err = order_service::update_details(
        &state,
        &user,
        mine.order.id,
        vec![DetailLine {
            id: None,
            product_id: Some(b.id),
            quantity: 0,
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity { quantity: 0 }));
    Ok(())
}

#[tokio::test]
async fn lines_without_a_known_product_are_skipped() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let placed = place_order(&state, &user, a.id, 1).await;

    let updated = order_service::update_details(
        &state,
        &user,
        placed.order.id,
        vec![
            DetailLine {
                id: None,
                product_id: None,
                quantity: 3,
            },
            DetailLine {
                id: None,
                product_id: Some(Uuid::new_v4()),
                quantity: 3,
            },
        ],
    )
    .await?;
    assert_eq!(updated.details.len(), 1);
    assert_eq!(updated.order.total, 100);
    Ok(())
}

#[tokio::test]
async fn detail_batch_short_on_stock_stops_there() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 2).await;
    let placed = place_order(&state, &user, a.id, 1).await;

    let err = order_service::update_details(
        &state,
        &user,
        placed.order.id,
        vec![DetailLine {
            id: Some(placed.details[0].id),
            product_id: Some(a.id),
            quantity: 3,
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock { available: 1, .. }
    ));
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 1);
    Ok(())
}

#[tokio::test]
async fn removing_a_detail_releases_it() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let placed = place_order(&state, &user, a.id, 3).await;

    let err = order_service::remove_detail(&state, &user, placed.order.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DetailNotFound { .. }));

    let updated =
        order_service::remove_detail(&state, &user, placed.order.id, placed.details[0].id).await?;
    assert!(updated.details.is_empty());
    assert_eq!(updated.order.total, 0);
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 0);
    Ok(())
}

#[tokio::test]
async fn terminal_orders_are_locked() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let placed = place_order(&state, &user, a.id, 1).await;
    order_service::cancel(&state, &user, placed.order.id).await?;

    let err = order_service::update_details(
        &state,
        &user,
        placed.order.id,
        vec![DetailLine {
            id: None,
            product_id: Some(a.id),
            quantity: 1,
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::OrderLocked {
            state: OrderState::Cancelled,
            ..
        }
    ));

    let err = order_service::remove_detail(&state, &user, placed.order.id, placed.details[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OrderLocked { .. }));
    Ok(())
}

#[tokio::test]
async fn orders_are_private_to_their_owner() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let owner = customer();
    let stranger = customer();
    let a = create_product(&state, 100, 10).await;
    let placed = place_order(&state, &owner, a.id, 1).await;

    let err = order_service::get_order(&state, &stranger, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = order_service::cancel(&state, &stranger, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let (mine, meta) = order_service::list_orders(&state, &owner, OrderListQuery::default()).await?;
    assert_eq!(mine.items.len(), 1);
    assert_eq!(meta.total, Some(1));

    let (pending, _) = order_service::list_all_orders(
        &state,
        &admin(),
        OrderListQuery {
            state: Some(OrderState::Cancelled),
            ..Default::default()
        },
    )
    .await?;
    assert!(pending.items.is_empty());

    let err = order_service::list_all_orders(&state, &owner, OrderListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn force_delete_removes_the_order_and_releases_stock() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let placed = place_order(&state, &user, a.id, 4).await;
    payment_service::create(
        &state,
        &user,
        CreatePayRequest {
            order_id: placed.order.id,
            method: PayMethod::Transfer,
            amount: None,
        },
    )
    .await?;

    let err = order_service::force_delete(&state, &user, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    order_service::force_delete(&state, &admin(), placed.order.id).await?;

    assert_eq!(reload_product(&state, a.id).await.stock_sold, 0);
    assert!(Orders::find_by_id(placed.order.id).one(&state.orm).await?.is_none());
    assert_eq!(Pays::find().count(&state.orm).await?, 0);
    assert_eq!(
        OrderDetails::find()
            .filter(DetailCol::OrderId.eq(placed.order.id))
            .count(&state.orm)
            .await?,
        0
    );
    Ok(())
}

#[tokio::test]
async fn force_delete_of_cancelled_order_does_not_release_twice() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let cancelled = place_order(&state, &user, a.id, 2).await;
    place_order(&state, &user, a.id, 3).await;
    order_service::cancel(&state, &user, cancelled.order.id).await?;
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 3);

    order_service::force_delete(&state, &admin(), cancelled.order.id).await?;
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 3);
    Ok(())
}

#[tokio::test]
async fn release_is_floored_at_zero() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let a = create_product(&state, 100, 10).await;
    reserve_units(&state, a.id, 2).await?;

    let release = release_units(&state, a.id, 5).await?;
    assert_eq!(release.released, 2);
    assert_eq!(release.clamped, 3);
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 0);
    Ok(())
}

#[tokio::test]
async fn supplier_stock_adjustments_are_staff_only() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let a = create_product(&state, 100, 3).await;
    let staff = admin();

    let err = inventory_service::adjust_supplier_stock(&state, &customer(), a.id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let product = inventory_service::adjust_supplier_stock(&state, &staff, a.id, 5).await?;
    assert_eq!(product.stock_supplier, 8);
    assert_eq!(product.available, Some(8));

    let err = inventory_service::adjust_supplier_stock(&state, &staff, a.id, -9)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = inventory_service::adjust_supplier_stock(&state, &staff, a.id, i32::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(reload_product(&state, a.id).await.stock_supplier, 8);

    let (low, _) = inventory_service::list_low_stock(
        &state,
        &staff,
        storefront_orders::routes::params::LowStockQuery {
            threshold: Some(10),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(low.len(), 1);
    Ok(())
}

#[tokio::test]
async fn sold_counter_refuses_to_overflow() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let a = create_unlimited_product(&state, 1).await;
    reserve_units(&state, a.id, i32::MAX).await?;

    let err = reserve_units(&state, a.id, 1).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidQuantity { quantity: 1 }));
    assert_eq!(reload_product(&state, a.id).await.stock_sold, i32::MAX);
    Ok(())
}

#[tokio::test]
async fn a_detail_cannot_switch_product() -> anyhow::Result<()> {
    let state = common::setup_state().await;
    let user = customer();
    let a = create_product(&state, 100, 10).await;
    let b = create_product(&state, 40, 10).await;
    let placed = place_order(&state, &user, a.id, 2).await;

    let err = order_service::update_details(
        &state,
        &user,
        placed.order.id,
        vec![DetailLine {
            id: Some(placed.details[0].id),
            product_id: Some(b.id),
            quantity: 5,
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = order_service::get_order(&state, &user, placed.order.id).await?;
    assert_eq!(order.details[0].product_id, a.id);
    assert_eq!(order.details[0].quantity, 2);
    assert_eq!(order.order.total, 200);
    assert_eq!(reload_product(&state, a.id).await.stock_sold, 2);
    assert_eq!(reload_product(&state, b.id).await.stock_sold, 0);
    Ok(())
}
