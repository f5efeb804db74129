use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartQuantityRequest {
    pub quantity: i32,
}

/// One product in the cart, possibly backed by several stored rows.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub product: Product,
    pub quantity: i64,
    pub line_total: i64,
    pub row_ids: Vec<Uuid>,
}

/// A row pointing at a product that no longer exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrphanCartRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub lines: Vec<CartLineDto>,
    pub orphans: Vec<OrphanCartRow>,
    pub subtotal: i64,
    pub item_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartMutation {
    pub product_id: Uuid,
    pub quantity: i64,
    pub removed_rows: u64,
}
