use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CancelOrderRequest, CheckoutRequest, CheckoutResponse, OrderDetail, OrderList,
        ReportIssueRequest,
    },
    error::AppResult,
    fulfillment::Party,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{checkout_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/selling", get(list_selling_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/confirm", patch(confirm_order))
        .route("/{id}/ship", patch(ship_order))
        .route("/{id}/complete", patch(complete_order))
        .route("/{id}/report-issue", patch(report_issue))
        .route("/{id}/confirm-lost", patch(confirm_lost))
        .route("/{id}/cancel", patch(cancel_order))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "One order created per seller in the cart", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart, bad line or seller not allowed to sell"),
        (status = 403, description = "Only buyers can check out"),
        (status = 404, description = "Unknown product or seller"),
        (status = 500, description = "Checkout could not be completed, retry"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = checkout_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<u64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status, e.g. SHIPPING"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders placed by the caller", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, Party::Buyer, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/selling",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<u64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status, e.g. PENDING"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders received by the calling seller", body = ApiResponse<OrderList>),
        (status = 403, description = "Caller is not a seller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_selling_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, Party::Seller, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items and payments", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Caller is neither buyer nor seller of the order"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/confirm",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "PENDING -> CONFIRMED", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Not the seller of this order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order is not PENDING"),
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn confirm_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::confirm_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/ship",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "CONFIRMED -> SHIPPING", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Not the seller of this order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order is not CONFIRMED"),
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn ship_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::ship_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/complete",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "SHIPPING -> COMPLETED, payment marked PAID", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Not the buyer of this order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order is not SHIPPING"),
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn complete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::complete_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/report-issue",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body(content = ReportIssueRequest, description = "Optional note"),
    responses(
        (status = 200, description = "SHIPPING -> ISSUE_REPORTED", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Note too long"),
        (status = 403, description = "Not the buyer of this order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order is not SHIPPING"),
        (status = 422, description = "Issue window has not opened yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn report_issue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReportIssueRequest>>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let resp = order_service::report_issue(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/confirm-lost",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "ISSUE_REPORTED -> FAILED, payment REFUNDING or FAILED", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Not the seller of this order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order is not ISSUE_REPORTED"),
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn confirm_lost(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::confirm_lost(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body(content = CancelOrderRequest, description = "Reason, required for sellers"),
    responses(
        (status = 200, description = "Order CANCELLED", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Seller gave no reason"),
        (status = 403, description = "Not a party to this order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order can no longer be cancelled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelOrderRequest>>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let resp = order_service::cancel_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
