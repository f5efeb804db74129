use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::{
        delivery::SkippedItem,
        legacy::LegacyOrder,
        workflow::PaymentAction,
    },
    models::Order,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    pub action: PaymentAction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportOrdersRequest {
    pub orders: Vec<LegacyOrder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped_duplicates: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryOutcome {
    pub order: Order,
    pub decremented_products: usize,
    /// Lines whose stock could not be adjusted.
    pub skipped_items: Vec<SkippedItem>,
}
