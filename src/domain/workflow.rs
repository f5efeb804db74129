//! Transition tables for the two order status axes.
//!
//! Every admin or customer action that moves an order goes through
//! [`next_fulfillment`] or [`next_payment`] before anything is written.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::status::{FulfillmentStatus, PaymentStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentAction {
    CheckIn,
    AssignCarrier,
    MarkDelivered,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAction {
    MarkPaid,
    MarkUnpaid,
    MarkFailed,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action:?} an order whose fulfillment status is {from}")]
    Fulfillment {
        action: FulfillmentAction,
        from: FulfillmentStatus,
    },
    #[error("cannot {action:?} a payment whose status is {from}")]
    Payment {
        action: PaymentAction,
        from: PaymentStatus,
    },
    #[error("payment of a cancelled order cannot change")]
    OrderCancelled,
}

use FulfillmentAction as FA;
use FulfillmentStatus as FS;
use PaymentAction as PA;
use PaymentStatus as PS;

const FULFILLMENT_TRANSITIONS: &[(FulfillmentAction, FulfillmentStatus, FulfillmentStatus)] = &[
    (FA::CheckIn, FS::Pending, FS::CheckedIn),
    (FA::CheckIn, FS::Processing, FS::CheckedIn),
    (FA::CheckIn, FS::Confirmed, FS::CheckedIn),
    (FA::AssignCarrier, FS::CheckedIn, FS::InTransit),
    // editing carrier details of a shipment already on its way
    (FA::AssignCarrier, FS::InTransit, FS::InTransit),
    (FA::MarkDelivered, FS::InTransit, FS::Delivered),
    (FA::Cancel, FS::Pending, FS::Cancelled),
    (FA::Cancel, FS::Processing, FS::Cancelled),
    (FA::Cancel, FS::Confirmed, FS::Cancelled),
    (FA::Cancel, FS::CheckedIn, FS::Cancelled),
    (FA::Cancel, FS::InTransit, FS::Cancelled),
];

const PAYMENT_TRANSITIONS: &[(PaymentAction, PaymentStatus, PaymentStatus)] = &[
    (PA::MarkPaid, PS::Pending, PS::Completed),
    (PA::MarkPaid, PS::Failed, PS::Completed),
    (PA::MarkUnpaid, PS::Completed, PS::Pending),
    (PA::MarkUnpaid, PS::Success, PS::Pending),
    (PA::MarkFailed, PS::Pending, PS::Failed),
    (PA::Cancel, PS::Pending, PS::Cancelled),
    (PA::Cancel, PS::Failed, PS::Cancelled),
];

const ALL_FULFILLMENT_ACTIONS: [FulfillmentAction; 4] =
    [FA::CheckIn, FA::AssignCarrier, FA::MarkDelivered, FA::Cancel];
const ALL_PAYMENT_ACTIONS: [PaymentAction; 4] =
    [PA::MarkPaid, PA::MarkUnpaid, PA::MarkFailed, PA::Cancel];

pub fn next_fulfillment(
    from: FulfillmentStatus,
    action: FulfillmentAction,
) -> Result<FulfillmentStatus, TransitionError> {
    FULFILLMENT_TRANSITIONS
        .iter()
        .find(|(a, f, _)| *a == action && *f == from)
        .map(|(_, _, to)| *to)
        .ok_or(TransitionError::Fulfillment { action, from })
}

/// Payment moves are refused once the order itself has been cancelled.
pub fn next_payment(
    from: PaymentStatus,
    fulfillment: FulfillmentStatus,
    action: PaymentAction,
) -> Result<PaymentStatus, TransitionError> {
    if fulfillment == FS::Cancelled {
        return Err(TransitionError::OrderCancelled);
    }
    PAYMENT_TRANSITIONS
        .iter()
        .find(|(a, f, _)| *a == action && *f == from)
        .map(|(_, _, to)| *to)
        .ok_or(TransitionError::Payment { action, from })
}

pub fn fulfillment_actions(from: FulfillmentStatus) -> Vec<FulfillmentAction> {
    ALL_FULFILLMENT_ACTIONS
        .into_iter()
        .filter(|action| next_fulfillment(from, *action).is_ok())
        .collect()
}

pub fn payment_actions(from: PaymentStatus, fulfillment: FulfillmentStatus) -> Vec<PaymentAction> {
    ALL_PAYMENT_ACTIONS
        .into_iter()
        .filter(|action| next_payment(from, fulfillment, *action).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use sea_orm::Iterable;

    use super::*;

    #[test]
    fn happy_path_reaches_delivered() {
        let mut status = FS::Pending;
        for action in [FA::CheckIn, FA::AssignCarrier, FA::MarkDelivered] {
            status = next_fulfillment(status, action).unwrap();
        }
        assert_eq!(status, FS::Delivered);
    }

    #[test]
    fn delivery_details_need_check_in() {
        assert!(next_fulfillment(FS::Pending, FA::AssignCarrier).is_err());
        assert_eq!(
            next_fulfillment(FS::CheckedIn, FA::AssignCarrier),
            Ok(FS::InTransit)
        );
        assert_eq!(
            next_fulfillment(FS::InTransit, FA::AssignCarrier),
            Ok(FS::InTransit)
        );
    }

    #[test]
    fn mark_delivered_only_from_in_transit() {
        for from in [FS::Pending, FS::Processing, FS::Confirmed, FS::CheckedIn] {
            assert_eq!(
                next_fulfillment(from, FA::MarkDelivered),
                Err(TransitionError::Fulfillment {
                    action: FA::MarkDelivered,
                    from
                })
            );
        }
    }

    #[test]
    fn terminal_states_reject_everything() {
        for from in FS::iter() {
            assert_eq!(fulfillment_actions(from).is_empty(), from.is_terminal(), "{from}");
        }
    }

    #[test]
    fn check_in_matches_waiting_states() {
        for from in FS::iter() {
            assert_eq!(
                next_fulfillment(from, FA::CheckIn).is_ok(),
                from.awaiting_check_in(),
                "{from}"
            );
        }
    }

    #[test]
    fn cancel_reachable_from_every_open_state() {
        for from in [FS::Pending, FS::Processing, FS::Confirmed, FS::CheckedIn, FS::InTransit] {
            assert_eq!(next_fulfillment(from, FA::Cancel), Ok(FS::Cancelled));
        }
    }

    #[test]
    fn payment_toggle() {
        let paid = next_payment(PS::Pending, FS::Pending, PA::MarkPaid).unwrap();
        assert_eq!(paid, PS::Completed);
        let unpaid = next_payment(paid, FS::Delivered, PA::MarkUnpaid).unwrap();
        assert_eq!(unpaid, PS::Pending);
        assert!(next_payment(PS::Cancelled, FS::Pending, PA::MarkPaid).is_err());
    }

    #[test]
    fn payment_frozen_on_cancelled_order() {
        assert_eq!(
            next_payment(PS::Pending, FS::Cancelled, PA::MarkPaid),
            Err(TransitionError::OrderCancelled)
        );
        assert!(payment_actions(PS::Pending, FS::Cancelled).is_empty());
    }

    #[test]
    fn available_actions_follow_table() {
        assert_eq!(fulfillment_actions(FS::Pending), vec![FA::CheckIn, FA::Cancel]);
        assert_eq!(
            fulfillment_actions(FS::InTransit),
            vec![FA::AssignCarrier, FA::MarkDelivered, FA::Cancel]
        );
        assert_eq!(
            payment_actions(PS::Pending, FS::Pending),
            vec![PA::MarkPaid, PA::MarkFailed, PA::Cancel]
        );
    }
}
