//! Order lifecycle rules.
//!
//! Every status change an order can go through is listed in [`TRANSITIONS`].
//! The services consult this table for the target state, the party allowed to
//! trigger it and the payment status that has to move along with it; nothing
//! else decides whether a transition is legal.
//!
//! ```text
//! PENDING ──confirm──► CONFIRMED ──ship──► SHIPPING ──complete──► COMPLETED
//!    │                     │                  │
//!    │                     │              report-issue (after the issue window)
//!    │                     │                  ▼
//!    │                     │            ISSUE_REPORTED ──confirm-lost──► FAILED
//!    └──cancel─────────────┴──► CANCELLED
//! ```

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderStatus, PaymentMethod, PaymentStatus, Role},
    notify::Notification,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEvent {
    Confirm,
    Ship,
    Complete,
    ReportIssue,
    ConfirmLost,
    SellerCancel,
    BuyerCancel,
}

impl OrderEvent {
    pub const ALL: [OrderEvent; 7] = [
        OrderEvent::Confirm,
        OrderEvent::Ship,
        OrderEvent::Complete,
        OrderEvent::ReportIssue,
        OrderEvent::ConfirmLost,
        OrderEvent::SellerCancel,
        OrderEvent::BuyerCancel,
    ];

    /// Verb used in error messages.
    pub fn action(&self) -> &'static str {
        match self {
            OrderEvent::Confirm => "confirm",
            OrderEvent::Ship => "ship",
            OrderEvent::Complete => "complete",
            OrderEvent::ReportIssue => "report an issue on",
            OrderEvent::ConfirmLost => "confirm loss of",
            OrderEvent::SellerCancel | OrderEvent::BuyerCancel => "cancel",
        }
    }

    /// Name written to the audit log.
    pub fn audit_action(&self) -> &'static str {
        match self {
            OrderEvent::Confirm => "order_confirmed",
            OrderEvent::Ship => "order_shipped",
            OrderEvent::Complete => "order_completed",
            OrderEvent::ReportIssue => "order_issue_reported",
            OrderEvent::ConfirmLost => "order_confirmed_lost",
            OrderEvent::SellerCancel => "order_cancelled_by_seller",
            OrderEvent::BuyerCancel => "order_cancelled_by_buyer",
        }
    }
}

/// Which side of the order may trigger a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Buyer,
    Seller,
}

impl Party {
    pub fn role(&self) -> Role {
        match self {
            Party::Buyer => Role::Buyer,
            Party::Seller => Role::Seller,
        }
    }

    pub fn owner_of(&self, order: &Order) -> Uuid {
        match self {
            Party::Buyer => order.buyer_id,
            Party::Seller => order.seller_id,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Transition {
    pub event: OrderEvent,
    pub from: &'static [OrderStatus],
    pub to: OrderStatus,
    pub actor: Party,
    /// Only open once the issue window since shipment has passed.
    pub time_gated: bool,
}

pub static TRANSITIONS: [Transition; 7] = [
    Transition {
        event: OrderEvent::Confirm,
        from: &[OrderStatus::Pending],
        to: OrderStatus::Confirmed,
        actor: Party::Seller,
        time_gated: false,
    },
    Transition {
        event: OrderEvent::Ship,
        from: &[OrderStatus::Confirmed],
        to: OrderStatus::Shipping,
        actor: Party::Seller,
        time_gated: false,
    },
    Transition {
        event: OrderEvent::Complete,
        from: &[OrderStatus::Shipping],
        to: OrderStatus::Completed,
        actor: Party::Buyer,
        time_gated: false,
    },
    Transition {
        event: OrderEvent::ReportIssue,
        from: &[OrderStatus::Shipping],
        to: OrderStatus::IssueReported,
        actor: Party::Buyer,
        time_gated: true,
    },
    Transition {
        event: OrderEvent::ConfirmLost,
        from: &[OrderStatus::IssueReported],
        to: OrderStatus::Failed,
        actor: Party::Seller,
        time_gated: false,
    },
    Transition {
        event: OrderEvent::SellerCancel,
        from: &[OrderStatus::Pending, OrderStatus::Confirmed],
        to: OrderStatus::Cancelled,
        actor: Party::Seller,
        time_gated: false,
    },
    Transition {
        event: OrderEvent::BuyerCancel,
        from: &[OrderStatus::Pending],
        to: OrderStatus::Cancelled,
        actor: Party::Buyer,
        time_gated: false,
    },
];

pub fn transition_for(event: OrderEvent) -> &'static Transition {
    let row = match event {
        OrderEvent::Confirm => 0,
        OrderEvent::Ship => 1,
        OrderEvent::Complete => 2,
        OrderEvent::ReportIssue => 3,
        OrderEvent::ConfirmLost => 4,
        OrderEvent::SellerCancel => 5,
        OrderEvent::BuyerCancel => 6,
    };
    &TRANSITIONS[row]
}

/// The state `event` leads to from `current`, if the table allows it at all.
pub fn next_state(current: OrderStatus, event: OrderEvent) -> Option<OrderStatus> {
    let transition = transition_for(event);
    transition
        .from
        .contains(&current)
        .then_some(transition.to)
}

/// Checks that `actor` may fire `event` on `order` right now.
///
/// Role and ownership are checked before state, so a stranger probing an
/// order learns nothing about where it is in its lifecycle.
pub fn assert_owner_and_state(
    order: &Order,
    actor: &AuthUser,
    event: OrderEvent,
) -> AppResult<&'static Transition> {
    let transition = transition_for(event);
    let required = transition.actor.role();

    if actor.role != required {
        return Err(AppError::Forbidden(format!(
            "only the {required} of an order can {} it",
            event.action()
        )));
    }
    if transition.actor.owner_of(order) != actor.user_id {
        return Err(AppError::Forbidden(format!(
            "order {} does not belong to you",
            order.id
        )));
    }
    if !transition.from.contains(&order.status) {
        return Err(AppError::InvalidState {
            order_id: order.id,
            current: order.status,
            action: event.action(),
        });
    }

    Ok(transition)
}

/// Rejects a report made before `delay` has passed since shipment.
///
/// Orders without `shipped_at` measure from `updated_at`.
pub fn check_issue_window(
    shipped_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    now: DateTime<Utc>,
    delay: Duration,
) -> AppResult<()> {
    let since = shipped_at.unwrap_or(updated_at);
    let elapsed = now.signed_duration_since(since);
    if elapsed < delay {
        return Err(AppError::TooEarly {
            remaining: delay - elapsed,
        });
    }
    Ok(())
}

/// Payment status that must be written in the same transaction as the order.
pub fn payment_effect(event: OrderEvent, method: PaymentMethod) -> Option<PaymentStatus> {
    match event {
        OrderEvent::Complete => Some(PaymentStatus::Paid),
        OrderEvent::ConfirmLost if method.is_prepaid() => Some(PaymentStatus::Refunding),
        // Nothing was collected on a cash order, so there is nothing to refund.
        OrderEvent::ConfirmLost => Some(PaymentStatus::Failed),
        _ => None,
    }
}

/// Notifications owed once `event` has been committed on `order`.
///
/// `order` is the state after the transition.
pub fn notifications_for(event: OrderEvent, order: &Order) -> Vec<Notification> {
    match event {
        OrderEvent::SellerCancel => vec![Notification::OrderCancelled {
            order_id: order.id,
            buyer_id: order.buyer_id,
            reason: order.cancel_reason.clone().unwrap_or_default(),
        }],
        OrderEvent::ReportIssue => vec![
            Notification::IssueReportedToBuyer {
                order_id: order.id,
                buyer_id: order.buyer_id,
                note: order.issue_note.clone(),
            },
            Notification::IssueReportedToSeller {
                order_id: order.id,
                seller_id: order.seller_id,
                buyer_id: order.buyer_id,
                note: order.issue_note.clone(),
                payment_method: order.payment_method,
            },
        ],
        OrderEvent::ConfirmLost if order.payment_method.is_prepaid() => {
            vec![Notification::RefundInitiated {
                order_id: order.id,
                buyer_id: order.buyer_id,
                amount: order.final_total_price,
                payment_method: order.payment_method,
            }]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_in(status: OrderStatus, method: PaymentMethod) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            status,
            shipping_address: "12 Market Street".into(),
            payment_method: method,
            note: None,
            issue_note: None,
            cancel_reason: None,
            final_total_price: 250,
            shipped_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_documented_pairs_lead_anywhere() {
        use OrderEvent::*;
        use OrderStatus::*;
        let documented = [
            (Pending, Confirm, Confirmed),
            (Confirmed, Ship, Shipping),
            (Shipping, Complete, Completed),
            (Shipping, ReportIssue, IssueReported),
            (IssueReported, ConfirmLost, Failed),
            (Pending, SellerCancel, Cancelled),
            (Confirmed, SellerCancel, Cancelled),
            (Pending, BuyerCancel, Cancelled),
        ];

        for state in OrderStatus::ALL {
            for event in OrderEvent::ALL {
                let expected = documented
                    .iter()
                    .find(|(from, ev, _)| *from == state && *ev == event)
                    .map(|(_, _, to)| *to);
                assert_eq!(next_state(state, event), expected, "{state} + {event:?}");
            }
        }
    }

    #[test]
    fn terminal_states_have_no_way_out() {
        for state in OrderStatus::ALL.into_iter().filter(OrderStatus::is_terminal) {
            for event in OrderEvent::ALL {
                assert_eq!(next_state(state, event), None);
            }
        }
    }

    #[test]
    fn every_event_has_exactly_one_row() {
        for event in OrderEvent::ALL {
            let rows = TRANSITIONS.iter().filter(|t| t.event == event).count();
            assert_eq!(rows, 1, "{event:?}");
            assert_eq!(transition_for(event).event, event);
        }
    }

    #[test]
    fn owner_seller_may_confirm_pending_order() {
        let order = order_in(OrderStatus::Pending, PaymentMethod::Qr);
        let seller = AuthUser::new(order.seller_id, Role::Seller);

        let transition = assert_owner_and_state(&order, &seller, OrderEvent::Confirm).unwrap();
        assert_eq!(transition.to, OrderStatus::Confirmed);
    }

    #[test]
    fn foreign_seller_is_forbidden_even_in_the_wrong_state() {
        let order = order_in(OrderStatus::Completed, PaymentMethod::Qr);
        let stranger = AuthUser::new(Uuid::new_v4(), Role::Seller);

        let err = assert_owner_and_state(&order, &stranger, OrderEvent::Confirm).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn buyer_cannot_fire_seller_events() {
        let order = order_in(OrderStatus::Pending, PaymentMethod::Qr);
        let buyer = AuthUser::new(order.buyer_id, Role::Buyer);

        let err = assert_owner_and_state(&order, &buyer, OrderEvent::Confirm).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn wrong_state_names_the_current_state() {
        let order = order_in(OrderStatus::Confirmed, PaymentMethod::Qr);
        let seller = AuthUser::new(order.seller_id, Role::Seller);

        let err = assert_owner_and_state(&order, &seller, OrderEvent::Confirm).unwrap_err();
        match err {
            AppError::InvalidState { current, .. } => assert_eq!(current, OrderStatus::Confirmed),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn issue_window_counts_from_shipment() {
        let shipped = Utc::now();
        let delay = Duration::days(3);

        let err = check_issue_window(Some(shipped), shipped, shipped + Duration::hours(1), delay)
            .unwrap_err();
        match err {
            AppError::TooEarly { remaining } => {
                assert_eq!(remaining, Duration::days(3) - Duration::hours(1))
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let later = shipped + Duration::days(3) + Duration::hours(1);
        assert!(check_issue_window(Some(shipped), shipped, later, delay).is_ok());
        assert!(check_issue_window(Some(shipped), shipped, shipped + delay, delay).is_ok());
    }

    #[test]
    fn issue_window_falls_back_to_updated_at() {
        let updated = Utc::now() - Duration::days(4);
        assert!(check_issue_window(None, updated, Utc::now(), Duration::days(3)).is_ok());

        let recent = Utc::now() - Duration::hours(2);
        assert!(check_issue_window(None, recent, Utc::now(), Duration::days(3)).is_err());
    }

    #[test]
    fn payment_moves_with_the_order() {
        assert_eq!(
            payment_effect(OrderEvent::Complete, PaymentMethod::CashOnDelivery),
            Some(PaymentStatus::Paid)
        );
        assert_eq!(
            payment_effect(OrderEvent::ConfirmLost, PaymentMethod::ZaloPay),
            Some(PaymentStatus::Refunding)
        );
        assert_eq!(
            payment_effect(OrderEvent::ConfirmLost, PaymentMethod::CashOnDelivery),
            Some(PaymentStatus::Failed)
        );
        for event in [
            OrderEvent::Confirm,
            OrderEvent::Ship,
            OrderEvent::ReportIssue,
            OrderEvent::SellerCancel,
            OrderEvent::BuyerCancel,
        ] {
            assert_eq!(payment_effect(event, PaymentMethod::Qr), None);
        }
    }

    #[test]
    fn refund_notice_only_for_prepaid_orders() {
        let prepaid = order_in(OrderStatus::Failed, PaymentMethod::Momo);
        assert!(matches!(
            notifications_for(OrderEvent::ConfirmLost, &prepaid).as_slice(),
            [Notification::RefundInitiated { amount: 250, .. }]
        ));

        let cash = order_in(OrderStatus::Failed, PaymentMethod::CashOnDelivery);
        assert!(notifications_for(OrderEvent::ConfirmLost, &cash).is_empty());
    }

    #[test]
    fn issue_report_notifies_both_sides() {
        let mut order = order_in(OrderStatus::IssueReported, PaymentMethod::Qr);
        order.issue_note = Some("never arrived".into());

        let sent = notifications_for(OrderEvent::ReportIssue, &order);
        let recipients: Vec<_> = sent.iter().map(Notification::recipient).collect();
        assert_eq!(recipients, vec![order.buyer_id, order.seller_id]);
    }

    #[test]
    fn buyer_cancel_is_silent() {
        let order = order_in(OrderStatus::Cancelled, PaymentMethod::Qr);
        assert!(notifications_for(OrderEvent::BuyerCancel, &order).is_empty());
    }
}
