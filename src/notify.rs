//! Outbound notifications raised by order transitions.
//!
//! Delivery is best effort: [`dispatch`] runs after the transaction commits and
//! only logs failures, so a lost message never undoes a state change.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::PaymentMethod;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Seller cancelled; tells the buyer why.
    OrderCancelled {
        order_id: Uuid,
        buyer_id: Uuid,
        reason: String,
    },
    /// Confirmation to the buyer that their report was filed.
    IssueReportedToBuyer {
        order_id: Uuid,
        buyer_id: Uuid,
        note: Option<String>,
    },
    /// Alert to the seller that a buyer reported the parcel missing.
    IssueReportedToSeller {
        order_id: Uuid,
        seller_id: Uuid,
        buyer_id: Uuid,
        note: Option<String>,
        payment_method: PaymentMethod,
    },
    RefundInitiated {
        order_id: Uuid,
        buyer_id: Uuid,
        amount: i64,
        payment_method: PaymentMethod,
    },
}

impl Notification {
    pub fn order_id(&self) -> Uuid {
        match self {
            Notification::OrderCancelled { order_id, .. }
            | Notification::IssueReportedToBuyer { order_id, .. }
            | Notification::IssueReportedToSeller { order_id, .. }
            | Notification::RefundInitiated { order_id, .. } => *order_id,
        }
    }

    pub fn recipient(&self) -> Uuid {
        match self {
            Notification::OrderCancelled { buyer_id, .. }
            | Notification::IssueReportedToBuyer { buyer_id, .. }
            | Notification::RefundInitiated { buyer_id, .. } => *buyer_id,
            Notification::IssueReportedToSeller { seller_id, .. } => *seller_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::OrderCancelled { .. } => "order_cancelled",
            Notification::IssueReportedToBuyer { .. } => "issue_reported_to_buyer",
            Notification::IssueReportedToSeller { .. } => "issue_reported_to_seller",
            Notification::RefundInitiated { .. } => "refund_initiated",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sends each notification in turn. Failures are logged and dropped.
pub async fn dispatch(notifier: &dyn Notifier, notifications: &[Notification]) {
    for notification in notifications {
        match notifier.send(notification).await {
            Ok(()) => tracing::debug!(
                kind = notification.kind(),
                order_id = %notification.order_id(),
                recipient = %notification.recipient(),
                "notification sent"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                kind = notification.kind(),
                order_id = %notification.order_id(),
                recipient = %notification.recipient(),
                "notification delivery failed"
            ),
        }
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notification)
            .map_err(|err| NotifyError::Rejected(err.to_string()))?;
        tracing::info!(
            kind = notification.kind(),
            recipient = %notification.recipient(),
            payload = %payload,
            "notification"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    fail: bool,
}

/// Keeps sent notifications in memory. Can be told to fail every send.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail = fail;
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.state
            .read()
            .map(|state| state.sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| NotifyError::Unavailable("notifier state poisoned".into()))?;
        if state.fail {
            return Err(NotifyError::Unavailable("simulated outage".into()));
        }
        state.sent.push(notification.clone());
        Ok(())
    }
}
