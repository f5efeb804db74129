use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::workflow::{FulfillmentAction, PaymentAction},
    models::Order,
};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// Totals are priced server-side; unknown fields such as a client
/// shipping cost are rejected.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CheckoutRequest {
    pub personal_info: PersonalInfo,
    pub delivery_address: DeliveryAddress,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// An order together with what may be done to it next.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderView {
    pub order: Order,
    pub fulfillment_actions: Vec<FulfillmentAction>,
    pub payment_actions: Vec<PaymentAction>,
}
