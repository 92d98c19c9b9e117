use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RuntimeErr, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CancelOrderRequest, MAX_TEXT_LEN, OrderDetail, OrderList, ReportIssueRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    fulfillment::{
        OrderEvent, Party, assert_owner_and_state, check_issue_window, notifications_for,
        payment_effect,
    },
    middleware::auth::{AuthUser, ensure_role},
    models::{Order, OrderItem, OrderStatus, Payment, Role},
    notify,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Orders where the caller is the given party.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    party: Party,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    if party == Party::Seller {
        ensure_role(user, Role::Seller)?;
    }
    let (page, limit, offset) = query.pagination().normalize();

    let owner_col = match party {
        Party::Buyer => OrderCol::BuyerId,
        Party::Seller => OrderCol::SellerId,
    };
    let mut condition = Condition::all().add(owner_col.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await?;

    let orders = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

/// One order with its lines and payments, visible to its buyer and its seller.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| order_not_found(id))?;

    if order.buyer_id != user.user_id && order.seller_id != user.user_id {
        return Err(AppError::Forbidden(format!(
            "order {id} does not belong to you"
        )));
    }

    let detail = load_detail(&state.orm, order).await?;
    Ok(ApiResponse::single("OK", detail))
}

pub async fn confirm_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    apply(state, user, id, StatusChange::plain(OrderEvent::Confirm)).await
}

pub async fn ship_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    apply(state, user, id, StatusChange::plain(OrderEvent::Ship)).await
}

pub async fn complete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    apply(state, user, id, StatusChange::plain(OrderEvent::Complete)).await
}

pub async fn report_issue(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ReportIssueRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    let note = clean_text(payload.note, "Note")?;
    let change = StatusChange {
        event: OrderEvent::ReportIssue,
        text: note,
    };
    apply(state, user, id, change).await
}

pub async fn confirm_lost(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    apply(state, user, id, StatusChange::plain(OrderEvent::ConfirmLost)).await
}

/// Sellers must give a reason, which is forwarded to the buyer. Buyers may
/// only withdraw orders the seller has not confirmed yet.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    let change = match user.role {
        Role::Seller => {
            let reason = clean_text(payload.reason, "Reason")?.ok_or_else(|| {
                AppError::Validation("A reason is required to cancel an order".into())
            })?;
            StatusChange {
                event: OrderEvent::SellerCancel,
                text: Some(reason),
            }
        }
        Role::Buyer | Role::Admin => StatusChange::plain(OrderEvent::BuyerCancel),
    };
    apply(state, user, id, change).await
}

/// Attempts per transition when the database reports a lock conflict.
const MAX_ATTEMPTS: u32 = 8;

struct StatusChange {
    event: OrderEvent,
    /// Issue note or cancel reason, depending on the event.
    text: Option<String>,
}

impl StatusChange {
    fn plain(event: OrderEvent) -> Self {
        Self { event, text: None }
    }
}

async fn apply(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    change: StatusChange,
) -> AppResult<ApiResponse<OrderDetail>> {
    let event = change.event;
    let (from, detail) = apply_with_retry(state, user, id, &change)
        .await
        .map_err(|err| err.during("order update"))?;
    let to = detail.order.status;

    tracing::info!(
        order_id = %id,
        actor = %user.user_id,
        from = %from,
        to = %to,
        "order transitioned"
    );

    audit::record(
        &state.orm,
        user.user_id,
        event.audit_action(),
        serde_json::json!({ "order_id": id, "from": from, "to": to }),
    )
    .await;

    // Outside the transaction; delivery failures are only logged.
    notify::dispatch(state.notifier.as_ref(), &notifications_for(event, &detail.order)).await;

    Ok(ApiResponse::single("Order updated", detail))
}

/// Reruns the whole transaction after a lock conflict. The rerun reads the
/// status the competing writer committed, so the loser of a race ends up with
/// the state guard error instead of a storage failure.
async fn apply_with_retry(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    change: &StatusChange,
) -> AppResult<(OrderStatus, OrderDetail)> {
    let mut attempt = 1;
    loop {
        match apply_in_txn(state, user, id, change).await {
            Err(AppError::Storage { source, .. })
                if attempt < MAX_ATTEMPTS && is_lock_conflict(&source) =>
            {
                tracing::debug!(
                    order_id = %id,
                    attempt,
                    error = %source,
                    "lock conflict, retrying"
                );
                tokio::time::sleep(Duration::from_millis(10 << attempt.min(5))).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// SQLite busy/locked codes and Postgres serialization failure or deadlock.
fn is_lock_conflict(err: &DbErr) -> bool {
    let (DbErr::Conn(runtime) | DbErr::Exec(runtime) | DbErr::Query(runtime)) = err else {
        return false;
    };
    let RuntimeErr::SqlxError(sqlx_err) = runtime else {
        return false;
    };
    sqlx_err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| {
            matches!(
                &*code,
                "5" | "6" | "261" | "262" | "517" | "40001" | "40P01"
            )
        })
}

async fn apply_in_txn(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    change: &StatusChange,
) -> AppResult<(OrderStatus, OrderDetail)> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| order_not_found(id))?;
    let order = Order::try_from(order)?;

    let transition = assert_owner_and_state(&order, user, change.event)?;
    if transition.time_gated {
        check_issue_window(
            order.shipped_at,
            order.updated_at,
            now.with_timezone(&Utc),
            state.fulfillment.issue_report_delay,
        )?;
    }

    // Compare-and-set on the status read above: a concurrent writer that got
    // there first leaves zero rows to update.
    let mut update = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(transition.to.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now))
        .filter(OrderCol::Id.eq(order.id))
        .filter(OrderCol::Status.eq(order.status.as_str()));
    update = match change.event {
        OrderEvent::Ship => update.col_expr(OrderCol::ShippedAt, Expr::value(Some(now))),
        OrderEvent::ReportIssue => {
            update.col_expr(OrderCol::IssueNote, Expr::value(change.text.clone()))
        }
        OrderEvent::SellerCancel => {
            update.col_expr(OrderCol::CancelReason, Expr::value(change.text.clone()))
        }
        _ => update,
    };

    let result = update.exec(&txn).await?;
    if result.rows_affected == 0 {
        let current = Orders::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| order_not_found(id))?;
        return Err(AppError::InvalidState {
            order_id: id,
            current: current.status.parse()?,
            action: change.event.action(),
        });
    }

    if let Some(payment_status) = payment_effect(change.event, order.payment_method) {
        Payments::update_many()
            .col_expr(PaymentCol::Status, Expr::value(payment_status.as_str()))
            .col_expr(PaymentCol::UpdatedAt, Expr::value(now))
            .filter(PaymentCol::OrderId.eq(order.id))
            .exec(&txn)
            .await?;
    }

    let updated = Orders::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| order_not_found(id))?;
    let detail = load_detail(&txn, updated).await?;

    txn.commit().await?;
    Ok((order.status, detail))
}

async fn load_detail<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<OrderDetail> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    let payments = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .order_by_asc(PaymentCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Payment::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OrderDetail {
        order: Order::try_from(order)?,
        items,
        payments,
    })
}

/// Trims optional free text; blank becomes `None`.
fn clean_text(text: Option<String>, field: &str) -> AppResult<Option<String>> {
    let Some(text) = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(Some(text))
}

fn order_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("order {id} not found"))
}
