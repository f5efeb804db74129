use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        cart::CartMutation,
        wishlist::{AddWishlistRequest, WishlistProductList},
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        wishlist_items::{ActiveModel as WishActive, Column as WishCol, Entity as WishlistItems},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{WishlistItem, product_from_entity, wishlist_item_from_entity},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::cart_service,
    state::AppState,
};

/// Wishlisted products, newest first. Rows whose product is gone are not listed.
pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<WishlistProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = WishlistItems::find()
        .filter(WishCol::UserId.eq(user.user_id))
        .order_by_desc(WishCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let mut products: HashMap<Uuid, _> = if ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };

    let items = rows
        .iter()
        .filter_map(|r| products.remove(&r.product_id))
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", WishlistProductList { items }, Some(meta)))
}

pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<WishlistItem>> {
    let product = Products::find_by_id(payload.product_id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::BadRequest("Product not found".into()));
    }

    let existing = WishlistItems::find()
        .filter(
            Condition::all()
                .add(WishCol::UserId.eq(user.user_id))
                .add(WishCol::ProductId.eq(payload.product_id)),
        )
        .one(&state.orm)
        .await?;

    let row = match existing {
        Some(row) => row,
        None => {
            WishActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    audit::record(
        &state.pool,
        user.user_id,
        "wishlist_add",
        "wishlist_items",
        serde_json::json!({ "product_id": payload.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to wishlist",
        wishlist_item_from_entity(row),
        Some(Meta::empty()),
    ))
}

async fn delete_row<C: ConnectionTrait>(conn: &C, user_id: Uuid, product_id: Uuid) -> AppResult<u64> {
    let result = WishlistItems::delete_many()
        .filter(
            Condition::all()
                .add(WishCol::UserId.eq(user_id))
                .add(WishCol::ProductId.eq(product_id)),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if delete_row(&state.orm, user.user_id, product_id).await? == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "wishlist_remove",
        "wishlist_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from wishlist",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Put one unit in the cart and drop the wishlist entry, both or neither.
pub async fn move_to_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartMutation>> {
    let txn = state.orm.begin().await?;
    let mutation = cart_service::add_quantity_in(&txn, user.user_id, product_id, 1).await?;
    if delete_row(&txn, user.user_id, product_id).await? == 0 {
        return Err(AppError::NotFound);
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "wishlist_move_to_cart",
        "wishlist_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success("Moved to cart", mutation, Some(Meta::empty())))
}
