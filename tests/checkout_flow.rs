mod common;

use common::{item, setup};
use marketplace_orders::{
    error::AppError,
    models::{OrderStatus, PaymentMethod, PaymentStatus, Role},
};
use uuid::Uuid;

#[tokio::test]
async fn total_uses_negotiated_prices_not_catalog_prices() -> anyhow::Result<()> {
    let app = setup().await?;
    let buyer = app.create_user(Role::Buyer).await?;
    let seller = app.create_user(Role::Seller).await?;
    // Catalog prices deliberately differ from what the buyer agreed to.
    let rice = app.create_product(&seller, 999).await?;
    let eggs = app.create_product(&seller, 999).await?;

    let orders = app
        .checkout(
            &buyer,
            PaymentMethod::Qr,
            vec![item(rice, 2, 100), item(eggs, 1, 50)],
        )
        .await?;

    assert_eq!(orders.len(), 1);
    let detail = &orders[0];
    assert_eq!(detail.order.final_total_price, 250);
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.buyer_id, buyer.user_id);
    assert_eq!(detail.order.seller_id, seller.user_id);
    assert_eq!(detail.order.note.as_deref(), Some("leave at the door"));
    assert_eq!(detail.items.len(), 2);
    assert!(detail.items.iter().any(|i| i.product_id == rice && i.negotiated_price == 100));

    assert_eq!(detail.payments.len(), 1);
    let payment = &detail.payments[0];
    assert_eq!(payment.amount, 250);
    assert_eq!(payment.status, PaymentStatus::Unpaid);
    assert_eq!(payment.payer_id, buyer.user_id);
    assert_eq!(payment.payment_method, PaymentMethod::Qr);
    Ok(())
}

#[tokio::test]
async fn cart_is_split_into_one_order_per_seller() -> anyhow::Result<()> {
    let app = setup().await?;
    let buyer = app.create_user(Role::Buyer).await?;
    let farm = app.create_user(Role::Seller).await?;
    let orchard = app.create_user(Role::Seller).await?;
    let rice = app.create_product(&farm, 10).await?;
    let mango = app.create_product(&orchard, 10).await?;
    let eggs = app.create_product(&farm, 10).await?;

    let orders = app
        .checkout(
            &buyer,
            PaymentMethod::CashOnDelivery,
            vec![item(rice, 1, 30), item(mango, 4, 5), item(eggs, 2, 10)],
        )
        .await?;

    assert_eq!(orders.len(), 2);
    let farm_order = orders
        .iter()
        .find(|o| o.order.seller_id == farm.user_id)
        .expect("farm order");
    assert_eq!(farm_order.items.len(), 2);
    assert_eq!(farm_order.order.final_total_price, 50);

    let orchard_order = orders
        .iter()
        .find(|o| o.order.seller_id == orchard.user_id)
        .expect("orchard order");
    assert_eq!(orchard_order.items.len(), 1);
    assert_eq!(orchard_order.order.final_total_price, 20);

    assert_eq!(app.order_count().await?, 2);
    assert_eq!(app.payment_count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn invalid_seller_rolls_back_every_group() -> anyhow::Result<()> {
    let app = setup().await?;
    let buyer = app.create_user(Role::Buyer).await?;
    let seller = app.create_user(Role::Seller).await?;
    let not_a_seller = app.create_user(Role::Buyer).await?;
    let good = app.create_product(&seller, 10).await?;
    let bad = app.create_product(&not_a_seller, 10).await?;

    let err = app
        .checkout(
            &buyer,
            PaymentMethod::Qr,
            vec![item(good, 1, 10), item(bad, 1, 10)],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    assert!(err.to_string().contains(&not_a_seller.user_id.to_string()));
    assert_eq!(app.orders_of_seller(&seller).await?, 0);
    assert_eq!(app.order_count().await?, 0);
    assert_eq!(app.payment_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_product_fails_without_creating_anything() -> anyhow::Result<()> {
    let app = setup().await?;
    let buyer = app.create_user(Role::Buyer).await?;
    let seller = app.create_user(Role::Seller).await?;
    let good = app.create_product(&seller, 10).await?;
    let missing = Uuid::new_v4();

    let err = app
        .checkout(
            &buyer,
            PaymentMethod::Qr,
            vec![item(good, 1, 10), item(missing, 1, 10)],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
    assert!(err.to_string().contains(&missing.to_string()));
    assert_eq!(app.order_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected() -> anyhow::Result<()> {
    let app = setup().await?;
    let buyer = app.create_user(Role::Buyer).await?;

    let err = app
        .checkout(&buyer, PaymentMethod::Qr, vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(app.order_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn sellers_cannot_check_out() -> anyhow::Result<()> {
    let app = setup().await?;
    let seller = app.create_user(Role::Seller).await?;
    let product = app.create_product(&seller, 10).await?;

    let err = app
        .checkout(&seller, PaymentMethod::Qr, vec![item(product, 1, 10)])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn repeated_product_lines_are_kept_as_separate_items() -> anyhow::Result<()> {
    let app = setup().await?;
    let buyer = app.create_user(Role::Buyer).await?;
    let seller = app.create_user(Role::Seller).await?;
    let product = app.create_product(&seller, 10).await?;

    let orders = app
        .checkout(
            &buyer,
            PaymentMethod::Momo,
            vec![item(product, 1, 10), item(product, 2, 8)],
        )
        .await?;

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 2);
    assert_eq!(orders[0].order.final_total_price, 26);
    Ok(())
}
