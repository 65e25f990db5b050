//! State machines for orders, payments and shipments.
//!
//! Every state change in the engine goes through one of the tables below;
//! services never assign a state that the table has not produced.

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_review")]
    InReview,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Events that move an order between states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    SubmitForReview,
    RevertReview,
    Pay,
    Prepare,
    Ship,
    Deliver,
    Cancel,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::InReview => "in_review",
            OrderState::Paid => "paid",
            OrderState::Preparing => "preparing",
            OrderState::Shipped => "shipped",
            OrderState::Delivered => "delivered",
            OrderState::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled orders accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    /// Details may only change while the order is still live.
    pub fn allows_detail_mutation(&self) -> bool {
        !self.is_terminal()
    }

    /// The order transition table. `None` means the event is not allowed
    /// from this state.
    pub fn next(&self, event: OrderEvent) -> Option<OrderState> {
        use OrderEvent as E;
        use OrderState as S;

        match (self, event) {
            (S::Pending, E::SubmitForReview) => Some(S::InReview),
            (S::InReview, E::RevertReview) => Some(S::Pending),
            (S::Pending | S::InReview, E::Pay) => Some(S::Paid),
            (S::Paid, E::Prepare) => Some(S::Preparing),
            (S::Paid | S::Preparing, E::Ship) => Some(S::Shipped),
            (S::Paid | S::Preparing | S::Shipped, E::Deliver) => Some(S::Delivered),
            (S::Pending | S::Preparing, E::Cancel) => Some(S::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderEvent::SubmitForReview => "submit_for_review",
            OrderEvent::RevertReview => "revert_review",
            OrderEvent::Pay => "pay",
            OrderEvent::Prepare => "prepare",
            OrderEvent::Ship => "ship",
            OrderEvent::Deliver => "deliver",
            OrderEvent::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PayState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_review")]
    InReview,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayState::Pending => "pending",
            PayState::InReview => "in_review",
            PayState::Completed => "completed",
            PayState::Failed => "failed",
            PayState::Cancelled => "cancelled",
        }
    }

    /// Open payments still wait for a resolution. An order has at most one.
    pub fn is_open(&self) -> bool {
        matches!(self, PayState::Pending | PayState::InReview)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub fn can_transition_to(&self, to: PayState) -> bool {
        use PayState as S;

        matches!(
            (self, to),
            (S::Pending, S::InReview | S::Completed | S::Failed | S::Cancelled)
                | (S::InReview, S::Completed | S::Failed | S::Cancelled)
        )
    }

    /// Ordering used when gateway notifications race: a payment never moves
    /// to a state of lower rank.
    pub fn rank(&self) -> u8 {
        match self {
            PayState::Pending => 0,
            PayState::InReview => 1,
            PayState::Completed | PayState::Failed | PayState::Cancelled => 2,
        }
    }

    /// Maps a gateway status string onto a payment state.
    pub fn from_gateway_status(status: &str) -> PayState {
        match status.trim().to_ascii_lowercase().as_str() {
            "approved" => PayState::Completed,
            "pending" => PayState::Pending,
            "rejected" | "cancelled" => PayState::Failed,
            _ => PayState::InReview,
        }
    }
}

impl fmt::Display for PayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PayMethod {
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "paypal")]
    Paypal,
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

impl ShipmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentState::Pending => "pending",
            ShipmentState::Preparing => "preparing",
            ShipmentState::InTransit => "in_transit",
            ShipmentState::Delivered => "delivered",
        }
    }

    /// The order event a shipment state drags along, if any.
    pub fn order_event(&self) -> Option<(OrderEvent, OrderState)> {
        match self {
            ShipmentState::InTransit => Some((OrderEvent::Ship, OrderState::Shipped)),
            ShipmentState::Delivered => Some((OrderEvent::Deliver, OrderState::Delivered)),
            ShipmentState::Pending | ShipmentState::Preparing => None,
        }
    }
}

impl FromStr for ShipmentState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ShipmentState::Pending),
            "preparing" => Ok(ShipmentState::Preparing),
            "in_transit" => Ok(ShipmentState::InTransit),
            "delivered" => Ok(ShipmentState::Delivered),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_orders_reject_every_event() {
        let events = [
            OrderEvent::SubmitForReview,
            OrderEvent::RevertReview,
            OrderEvent::Pay,
            OrderEvent::Prepare,
            OrderEvent::Ship,
            OrderEvent::Deliver,
            OrderEvent::Cancel,
        ];
        for state in [OrderState::Delivered, OrderState::Cancelled] {
            assert!(state.is_terminal());
            for event in events {
                assert_eq!(state.next(event), None, "{state} accepted {event}");
            }
        }
    }

    #[test]
    fn cancel_only_from_pending_or_preparing() {
        assert_eq!(
            OrderState::Pending.next(OrderEvent::Cancel),
            Some(OrderState::Cancelled)
        );
        assert_eq!(
            OrderState::Preparing.next(OrderEvent::Cancel),
            Some(OrderState::Cancelled)
        );
        assert_eq!(OrderState::Paid.next(OrderEvent::Cancel), None);
        assert_eq!(OrderState::Shipped.next(OrderEvent::Cancel), None);
        assert_eq!(OrderState::InReview.next(OrderEvent::Cancel), None);
    }

    #[test]
    fn shipping_follows_payment() {
        assert_eq!(OrderState::Pending.next(OrderEvent::Ship), None);
        assert_eq!(
            OrderState::Preparing.next(OrderEvent::Ship),
            Some(OrderState::Shipped)
        );
        assert_eq!(
            OrderState::Shipped.next(OrderEvent::Deliver),
            Some(OrderState::Delivered)
        );
    }

    #[test]
    fn open_payments_resolve_once() {
        assert!(PayState::Pending.can_transition_to(PayState::InReview));
        assert!(PayState::InReview.can_transition_to(PayState::Completed));
        assert!(!PayState::InReview.can_transition_to(PayState::Pending));
        for terminal in [PayState::Completed, PayState::Failed, PayState::Cancelled] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(PayState::Pending));
            assert!(!terminal.can_transition_to(PayState::Completed));
        }
    }

    #[test]
    fn gateway_statuses_map_to_pay_states() {
        assert_eq!(PayState::from_gateway_status("approved"), PayState::Completed);
        assert_eq!(PayState::from_gateway_status("pending"), PayState::Pending);
        assert_eq!(PayState::from_gateway_status("rejected"), PayState::Failed);
        assert_eq!(PayState::from_gateway_status("cancelled"), PayState::Failed);
        assert_eq!(PayState::from_gateway_status("in_process"), PayState::InReview);
    }

    #[test]
    fn unknown_shipment_state_is_rejected() {
        assert_eq!(
            "in_transit".parse::<ShipmentState>(),
            Ok(ShipmentState::InTransit)
        );
        assert_eq!(
            "lost".parse::<ShipmentState>(),
            Err("lost".to_string())
        );
    }
}
