use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    domain::cart::{ConsolidatedCart, PricedProduct, RawCartRow, consolidate},
    dto::cart::{AddToCartRequest, CartLineDto, CartMutation, CartView, OrphanCartRow},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::product_from_entity,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// The user's cart as stored rows plus the products those rows still resolve to.
pub(crate) async fn load_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<(ConsolidatedCart, HashMap<Uuid, ProductModel>)> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(conn)
        .await?;

    let mut product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    product_ids.sort();
    product_ids.dedup();

    let products: HashMap<Uuid, ProductModel> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };

    let raw: Vec<RawCartRow> = rows
        .iter()
        .map(|r| RawCartRow {
            id: r.id,
            product_id: r.product_id,
            quantity: r.quantity,
        })
        .collect();
    let priced: Vec<PricedProduct> = products
        .values()
        .map(|p| PricedProduct {
            id: p.id,
            price: p.price,
        })
        .collect();

    Ok((consolidate(&raw, &priced), products))
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let (cart, mut products) = load_cart(&state.orm, user.user_id).await?;

    if !cart.orphans.is_empty() {
        tracing::debug!(
            user_id = %user.user_id,
            orphans = cart.orphans.len(),
            "cart rows reference missing products"
        );
    }

    let lines = cart
        .lines
        .iter()
        .filter_map(|line| {
            let product = products.remove(&line.product_id)?;
            let line_total = product.price.saturating_mul(line.quantity);
            Some(CartLineDto {
                product: product_from_entity(product),
                quantity: line.quantity,
                line_total,
                row_ids: line.row_ids.clone(),
            })
        })
        .collect::<Vec<_>>();

    let orphans = cart
        .orphans
        .iter()
        .map(|o| OrphanCartRow {
            id: o.id,
            product_id: o.product_id,
            quantity: o.quantity,
        })
        .collect();

    let meta = Meta::total(lines.len());
    let view = CartView {
        lines,
        orphans,
        subtotal: cart.subtotal,
        item_count: cart.item_count,
    };
    Ok(ApiResponse::success("OK", view, Some(meta)))
}

/// Serialise cart writes for one user by locking their account row.
async fn lock_user(txn: &DatabaseTransaction, user_id: Uuid) -> AppResult<()> {
    Users::find_by_id(user_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;
    Ok(())
}

async fn rows_for_product(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    product_id: Uuid,
) -> AppResult<Vec<CartModel>> {
    let rows = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user_id))
                .add(CartCol::ProductId.eq(product_id)),
        )
        .order_by_asc(CartCol::CreatedAt)
        .all(txn)
        .await?;
    Ok(rows)
}

/// Keep the oldest row with `quantity` and delete the rest.
async fn collapse_rows(
    txn: &DatabaseTransaction,
    rows: Vec<CartModel>,
    quantity: i64,
) -> AppResult<u64> {
    let quantity = i32::try_from(quantity)
        .map_err(|_| AppError::BadRequest("quantity is too large".into()))?;
    let mut rows = rows.into_iter();
    let Some(first) = rows.next() else {
        return Ok(0);
    };
    let extra: Vec<Uuid> = rows.map(|r| r.id).collect();

    let mut active: CartActive = first.into();
    active.quantity = Set(quantity);
    active.update(txn).await?;

    if extra.is_empty() {
        return Ok(0);
    }
    let deleted = CartItems::delete_many()
        .filter(CartCol::Id.is_in(extra))
        .exec(txn)
        .await?;
    Ok(deleted.rows_affected)
}

fn check_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Upsert by (user, product) inside `txn`: add `quantity` to whatever is already there.
pub(crate) async fn add_quantity_in(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartMutation> {
    check_quantity(quantity)?;

    let product = Products::find_by_id(product_id).one(txn).await?;
    if product.is_none() {
        return Err(AppError::BadRequest("product not found".to_string()));
    }

    lock_user(txn, user_id).await?;
    let rows = rows_for_product(txn, user_id, product_id).await?;

    if rows.is_empty() {
        CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;
        return Ok(CartMutation {
            product_id,
            quantity: i64::from(quantity),
            removed_rows: 0,
        });
    }

    let total = rows
        .iter()
        .map(|r| i64::from(r.quantity))
        .fold(i64::from(quantity), i64::saturating_add);
    let removed_rows = collapse_rows(txn, rows, total).await?;
    Ok(CartMutation {
        product_id,
        quantity: total,
        removed_rows,
    })
}

async fn add_quantity(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartMutation> {
    let txn = state.orm.begin().await?;
    let mutation = add_quantity_in(&txn, user.user_id, product_id, quantity).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;

    Ok(mutation)
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartMutation>> {
    let mutation = add_quantity(state, user, payload.product_id, payload.quantity).await?;
    Ok(ApiResponse::success("Added to cart", mutation, Some(Meta::empty())))
}

/// Set the quantity for a product, folding any duplicate rows into one.
pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<ApiResponse<CartMutation>> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    lock_user(&txn, user.user_id).await?;
    let rows = rows_for_product(&txn, user.user_id, product_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound);
    }
    let removed_rows = collapse_rows(&txn, rows, i64::from(quantity)).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart updated",
        CartMutation {
            product_id,
            quantity: i64::from(quantity),
            removed_rows,
        },
        Some(Meta::empty()),
    ))
}

/// Delete every row for the product so no duplicate can resurface.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartMutation>> {
    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::ProductId.eq(product_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "rows": result.rows_affected }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        CartMutation {
            product_id,
            quantity: 0,
            removed_rows: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}

/// Drop rows whose product has been deleted.
pub async fn purge_orphans(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let (cart, _) = load_cart(&state.orm, user.user_id).await?;
    let ids: Vec<Uuid> = cart.orphans.iter().map(|o| o.id).collect();
    if ids.is_empty() {
        return Ok(ApiResponse::success(
            "Nothing to remove",
            serde_json::json!({ "removed": 0 }),
            Some(Meta::empty()),
        ));
    }

    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::Id.is_in(ids)),
        )
        .exec(&state.orm)
        .await?;

    tracing::info!(user_id = %user.user_id, removed = result.rows_affected, "purged orphan cart rows");

    Ok(ApiResponse::success(
        "Removed unavailable items",
        serde_json::json!({ "removed": result.rows_affected }),
        Some(Meta::empty()),
    ))
}
