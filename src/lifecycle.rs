use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{entity} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// A status column with a fixed set of allowed moves.
pub trait StateMachine: Copy + PartialEq {
    const ENTITY: &'static str;

    fn as_str(&self) -> &'static str;

    fn allows(self, to: Self) -> bool;

    fn is_terminal(self) -> bool;

    fn transition(self, to: Self) -> Result<Self, TransitionError> {
        if self.allows(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                entity: Self::ENTITY,
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Open orders hold reserved stock and can still be paid.
    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

impl StateMachine for OrderStatus {
    const ENTITY: &'static str = "order";

    fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    fn allows(self, to: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed) | (Confirmed, Delivered) | (Pending | Confirmed, Cancelled)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl StateMachine for DeliveryStatus {
    const ENTITY: &'static str = "delivery";

    fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Scheduled => "scheduled",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    fn allows(self, to: Self) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, to),
            (Scheduled, InTransit) | (InTransit, Delivered) | (Scheduled | InTransit, Failed)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl StateMachine for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    fn allows(self, to: Self) -> bool {
        use PaymentStatus::*;
        matches!((self, to), (Pending, Paid) | (Pending, Failed) | (Paid, Refunded))
    }

    fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(OrderStatus, DeliveryStatus, PaymentStatus);

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn order_moves_forward_only() {
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Confirmed),
            Ok(OrderStatus::Confirmed)
        );
        assert_eq!(
            OrderStatus::Confirmed.transition(OrderStatus::Delivered),
            Ok(OrderStatus::Delivered)
        );
        assert!(OrderStatus::Confirmed.transition(OrderStatus::Pending).is_err());
        assert!(OrderStatus::Pending.transition(OrderStatus::Delivered).is_err());
    }

    #[test]
    fn order_cancellation_only_before_delivery() {
        assert!(OrderStatus::Pending.allows(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.allows(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.allows(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.allows(OrderStatus::Cancelled));
    }

    #[test]
    fn no_state_is_reentered() {
        for s in OrderStatus::iter() {
            assert!(!s.allows(s), "order {s} re-entered");
        }
        for s in DeliveryStatus::iter() {
            assert!(!s.allows(s), "delivery {s} re-entered");
        }
        for s in PaymentStatus::iter() {
            assert!(!s.allows(s), "payment {s} re-entered");
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in DeliveryStatus::iter().filter(|s| s.is_terminal()) {
            assert!(DeliveryStatus::iter().all(|to| !from.allows(to)));
        }
        for from in OrderStatus::iter().filter(|s| s.is_terminal()) {
            assert!(OrderStatus::iter().all(|to| !from.allows(to)));
        }
        for from in PaymentStatus::iter().filter(|s| s.is_terminal()) {
            assert!(PaymentStatus::iter().all(|to| !from.allows(to)));
        }
    }

    #[test]
    fn delivery_can_fail_from_any_open_state() {
        assert!(DeliveryStatus::Scheduled.allows(DeliveryStatus::Failed));
        assert!(DeliveryStatus::InTransit.allows(DeliveryStatus::Failed));
        assert!(!DeliveryStatus::Scheduled.allows(DeliveryStatus::Delivered));
    }

    #[test]
    fn payment_refund_requires_paid() {
        assert!(PaymentStatus::Paid.allows(PaymentStatus::Refunded));
        let err = PaymentStatus::Pending
            .transition(PaymentStatus::Refunded)
            .unwrap_err();
        assert_eq!(err.to_string(), "payment cannot move from pending to refunded");
    }

    #[test]
    fn only_pending_and_confirmed_are_open() {
        assert!(OrderStatus::Pending.is_open());
        assert!(OrderStatus::Confirmed.is_open());
        assert!(!OrderStatus::Delivered.is_open());
        assert!(!OrderStatus::Cancelled.is_open());
    }
}
