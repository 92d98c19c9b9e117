//! Splits a multi-seller cart into one order per seller.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutItem, CheckoutRequest, CheckoutResponse, MAX_TEXT_LEN, OrderDetail},
    entity::{
        order_items::ActiveModel as OrderItemActive, orders::ActiveModel as OrderActive,
        payments::ActiveModel as PaymentActive,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::{Order, OrderItem, OrderStatus, Payment, PaymentStatus, Role},
    response::ApiResponse,
    services::{catalog, identity},
    state::AppState,
};

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    ensure_role(user, Role::Buyer)?;
    validate_checkout(&payload)?;

    let orders = place_orders(state, user, &payload)
        .await
        .map_err(|err| err.during("checkout"))?;

    tracing::info!(
        buyer_id = %user.user_id,
        orders = orders.len(),
        "checkout completed"
    );

    for detail in &orders {
        audit::record(
            &state.orm,
            user.user_id,
            "checkout",
            serde_json::json!({
                "order_id": detail.order.id,
                "seller_id": detail.order.seller_id,
                "total": detail.order.final_total_price,
            }),
        )
        .await;
    }

    Ok(ApiResponse::single(
        "Checkout success",
        CheckoutResponse {
            total_orders: orders.len(),
            orders,
        },
    ))
}

async fn place_orders(
    state: &AppState,
    user: &AuthUser,
    payload: &CheckoutRequest,
) -> AppResult<Vec<OrderDetail>> {
    let txn = state.orm.begin().await?;

    let mut product_ids: Vec<Uuid> = payload.items.iter().map(|item| item.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let sellers = catalog::resolve_sellers_for_products(&txn, &product_ids).await?;
    if let Some(missing) = product_ids.iter().find(|id| !sellers.contains_key(*id)) {
        return Err(AppError::NotFound(format!("product {missing} does not exist")));
    }

    let now = Utc::now();
    let mut created = Vec::new();

    for (seller_id, items) in group_by_seller(&payload.items, &sellers) {
        let seller = identity::resolve_user(&txn, seller_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("seller {seller_id} does not exist")))?;
        if seller.role != Role::Seller {
            return Err(AppError::Validation(format!(
                "user {seller_id} is not allowed to sell"
            )));
        }

        let total = order_total(&items)?;

        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(user.user_id),
            seller_id: Set(seller.id),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            shipping_address: Set(payload.shipping_address.trim().to_string()),
            payment_method: Set(payload.payment_method.as_str().to_string()),
            note: Set(payload.note.clone()),
            issue_note: Set(None),
            cancel_reason: Set(None),
            final_total_price: Set(total),
            shipped_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut order_items = Vec::with_capacity(items.len());
        for item in &items {
            let row = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                negotiated_price: Set(item.price),
            }
            .insert(&txn)
            .await?;
            order_items.push(OrderItem::from(row));
        }

        let payment = PaymentActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            payer_id: Set(user.user_id),
            amount: Set(total),
            payment_method: Set(payload.payment_method.as_str().to_string()),
            status: Set(PaymentStatus::Unpaid.as_str().to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        created.push(OrderDetail {
            order: Order::try_from(order)?,
            items: order_items,
            payments: vec![Payment::try_from(payment)?],
        });
    }

    txn.commit().await?;
    Ok(created)
}

fn validate_checkout(payload: &CheckoutRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::Validation("Cart is empty".into()));
    }
    if payload.shipping_address.trim().is_empty() {
        return Err(AppError::Validation("Shipping address is required".into()));
    }
    if payload
        .note
        .as_ref()
        .is_some_and(|note| note.chars().count() > MAX_TEXT_LEN)
    {
        return Err(AppError::Validation(format!(
            "Note must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Quantity for product {} must be positive",
                item.product_id
            )));
        }
        if item.price <= 0 {
            return Err(AppError::Validation(format!(
                "Price for product {} must be positive",
                item.product_id
            )));
        }
    }
    Ok(())
}

/// Groups cart lines by owning seller, keeping sellers in first-seen order.
fn group_by_seller<'a>(
    items: &'a [CheckoutItem],
    sellers: &HashMap<Uuid, Uuid>,
) -> Vec<(Uuid, Vec<&'a CheckoutItem>)> {
    let mut groups: Vec<(Uuid, Vec<&CheckoutItem>)> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for item in items {
        let Some(&seller_id) = sellers.get(&item.product_id) else {
            continue;
        };
        let slot = *index.entry(seller_id).or_insert_with(|| {
            groups.push((seller_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(item);
    }

    groups
}

fn order_total(items: &[&CheckoutItem]) -> AppResult<i64> {
    items.iter().try_fold(0i64, |sum, item| {
        item.price
            .checked_mul(i64::from(item.quantity))
            .and_then(|line| sum.checked_add(line))
            .ok_or_else(|| AppError::Validation("Order total is too large".into()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;

    fn item(product_id: Uuid, quantity: i32, price: i64) -> CheckoutItem {
        CheckoutItem {
            product_id,
            quantity,
            price,
        }
    }

    fn request(items: Vec<CheckoutItem>) -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: "12 Market Street".into(),
            payment_method: PaymentMethod::CashOnDelivery,
            note: None,
            items,
        }
    }

    #[test]
    fn total_is_sum_of_quantity_times_price() {
        let a = item(Uuid::new_v4(), 2, 100);
        let b = item(Uuid::new_v4(), 1, 50);
        assert_eq!(order_total(&[&a, &b]).unwrap(), 250);
    }

    #[test]
    fn total_overflow_is_rejected() {
        let huge = item(Uuid::new_v4(), 2, i64::MAX);
        assert!(matches!(
            order_total(&[&huge]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn groups_follow_first_appearance() {
        let (seller_a, seller_b) = (Uuid::new_v4(), Uuid::new_v4());
        let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let sellers = HashMap::from([(p1, seller_b), (p2, seller_a), (p3, seller_b)]);
        let items = vec![item(p1, 1, 10), item(p2, 1, 20), item(p3, 1, 30)];

        let groups = group_by_seller(&items, &sellers);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, seller_b);
        assert_eq!(
            groups[0].1.iter().map(|i| i.product_id).collect::<Vec<_>>(),
            vec![p1, p3]
        );
        assert_eq!(groups[1].0, seller_a);
    }

    #[test]
    fn empty_cart_is_invalid() {
        assert!(matches!(
            validate_checkout(&request(vec![])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn non_positive_quantity_or_price_is_invalid() {
        let zero_qty = request(vec![item(Uuid::new_v4(), 0, 10)]);
        assert!(validate_checkout(&zero_qty).is_err());

        let free = request(vec![item(Uuid::new_v4(), 1, 0)]);
        assert!(validate_checkout(&free).is_err());

        let fine = request(vec![item(Uuid::new_v4(), 3, 10)]);
        assert!(validate_checkout(&fine).is_ok());
    }

    #[test]
    fn blank_address_is_invalid() {
        let mut payload = request(vec![item(Uuid::new_v4(), 1, 10)]);
        payload.shipping_address = "   ".into();
        assert!(validate_checkout(&payload).is_err());
    }
}
