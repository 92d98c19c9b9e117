use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, Payment, PaymentMethod};

/// Longest free text accepted for notes and cancel reasons.
pub const MAX_TEXT_LEN: usize = 500;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price the buyer agreed to; stored as the negotiated price.
    pub price: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    pub items: Vec<CheckoutItem>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReportIssueRequest {
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    /// Required when the seller cancels.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub total_orders: usize,
    pub orders: Vec<OrderDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
