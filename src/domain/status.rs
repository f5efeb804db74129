//! Payment and fulfillment status of an order.
//!
//! The two axes are independent: a paid order can still be waiting for
//! check-in, and a delivered order may be cash-on-delivery and unpaid.

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "CHECKED_IN")]
    CheckedIn,
    #[sea_orm(string_value = "IN_TRANSIT")]
    InTransit,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Money has been received.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Success)
    }

    /// Lenient parse used for query strings and imported documents.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "PENDING" | "UNPAID" => Some(PaymentStatus::Pending),
            "COMPLETED" | "PAID" => Some(PaymentStatus::Completed),
            "SUCCESS" => Some(PaymentStatus::Success),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" | "CANCELED" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "PENDING",
            FulfillmentStatus::Processing => "PROCESSING",
            FulfillmentStatus::Confirmed => "CONFIRMED",
            FulfillmentStatus::CheckedIn => "CHECKED_IN",
            FulfillmentStatus::InTransit => "IN_TRANSIT",
            FulfillmentStatus::Delivered => "DELIVERED",
            FulfillmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FulfillmentStatus::Delivered | FulfillmentStatus::Cancelled)
    }

    /// Still waiting for an admin to check the order in.
    pub fn awaiting_check_in(&self) -> bool {
        matches!(
            self,
            FulfillmentStatus::Pending | FulfillmentStatus::Processing | FulfillmentStatus::Confirmed
        )
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "PENDING" => Some(FulfillmentStatus::Pending),
            "PROCESSING" => Some(FulfillmentStatus::Processing),
            "CONFIRMED" => Some(FulfillmentStatus::Confirmed),
            "CHECKED_IN" | "CHECKEDIN" => Some(FulfillmentStatus::CheckedIn),
            "IN_TRANSIT" | "INTRANSIT" | "SHIPPED" => Some(FulfillmentStatus::InTransit),
            "DELIVERED" => Some(FulfillmentStatus::Delivered),
            "CANCELLED" | "CANCELED" => Some(FulfillmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}
