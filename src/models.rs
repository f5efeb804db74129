use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        aggregate::OrderSnapshot,
        delivery::DeliveryDetails,
        status::{FulfillmentStatus, PaymentStatus},
    },
    entity::{orders, products, users, wishlist_items},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Price in paise.
    pub price: i64,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_ganesh_idol: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WishlistItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub order_number: String,
    #[schema(value_type = Object)]
    pub order_details: Value,
    /// Total in paise.
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub delivery_details: Option<DeliveryDetails>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeasonMode {
    Normal,
    Ganesh,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Season {
    pub mode: SeasonMode,
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn user_from_entity(model: users::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        display_name: model.display_name,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        images: serde_json::from_value(model.images).unwrap_or_default(),
        is_ganesh_idol: model.is_ganesh_idol,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn wishlist_item_from_entity(model: wishlist_items::Model) -> WishlistItem {
    WishlistItem {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn order_from_entity(model: orders::Model) -> Order {
    let delivery_details = delivery_from_entity(&model);
    Order {
        id: model.id,
        user_id: model.user_id,
        order_number: model.order_number,
        order_details: model.order_details,
        total_amount: model.total_amount,
        payment_status: model.payment_status,
        fulfillment_status: model.fulfillment_status,
        delivery_details,
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Carrier details are present once a company or consignment number was saved.
pub fn delivery_from_entity(model: &orders::Model) -> Option<DeliveryDetails> {
    if model.delivery_company.is_none() && model.consignment_number.is_none() {
        return None;
    }
    Some(DeliveryDetails {
        company: model.delivery_company.clone().unwrap_or_default(),
        consignment_number: model.consignment_number.clone().unwrap_or_default(),
        tentative_date: model.tentative_date,
        remarks: model.delivery_remarks.clone(),
    })
}

pub fn snapshot_from_entity(model: &orders::Model) -> OrderSnapshot {
    OrderSnapshot {
        id: model.id,
        created_at: model.created_at.with_timezone(&Utc),
        total_amount: model.total_amount,
        payment_status: model.payment_status,
        fulfillment_status: model.fulfillment_status,
        delivery: delivery_from_entity(model),
    }
}
