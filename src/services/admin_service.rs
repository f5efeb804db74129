use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::{Expr, LockType};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        aggregate::{DashboardSummary, OrderLedger},
        delivery::{DeliveryDetails, extract_line_items, plan_stock_decrements},
        legacy::{self, ImportedOrder},
        workflow::{FulfillmentAction, next_fulfillment, next_payment},
    },
    dto::{
        admin::{DeliveryOutcome, ImportOrdersRequest, ImportSummary, InventoryAdjustRequest, UpdatePaymentRequest},
        orders::{OrderList, OrderView},
        products::ProductList,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, order_from_entity, product_from_entity, snapshot_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, OrderListQuery},
    services::order_service::{list_with, lock_order, order_filter, order_view},
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(state, user).await?;
    let (orders, meta) = list_with(state, order_filter(&query), &query).await?;
    let items = orders.into_iter().map(order_from_entity).collect();
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    ensure_admin(state, user).await?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Order found", order_view(order), Some(Meta::empty())))
}

/// Move an order along the fulfillment axis, optionally saving carrier details.
async fn advance_fulfillment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    action: FulfillmentAction,
    details: Option<DeliveryDetails>,
) -> AppResult<OrderModel> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id, None).await?;
    let from = order.fulfillment_status;
    let next = next_fulfillment(from, action)?;

    let mut active: OrderActive = order.into();
    active.fulfillment_status = Set(next);
    active.updated_at = Set(Utc::now().into());
    if let Some(details) = details {
        active.delivery_company = Set(Some(details.company.trim().to_string()));
        active.consignment_number = Set(Some(details.consignment_number.trim().to_string()));
        active.tentative_date = Set(details.tentative_date);
        active.delivery_remarks = Set(details.remarks.filter(|r| !r.trim().is_empty()));
    }
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, %from, to = %next, ?action, "order advanced");
    audit::record(
        &state.pool,
        user.user_id,
        "order_fulfillment",
        "orders",
        json!({ "order_id": order.id, "from": from, "to": next }),
    )
    .await;
    Ok(order)
}

pub async fn check_in(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    ensure_admin(state, user).await?;
    let order = advance_fulfillment(state, user, id, FulfillmentAction::CheckIn, None).await?;
    Ok(ApiResponse::success("Order checked in", order_view(order), Some(Meta::empty())))
}

pub async fn save_delivery_details(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: DeliveryDetails,
) -> AppResult<ApiResponse<OrderView>> {
    ensure_admin(state, user).await?;
    payload.validate().map_err(AppError::BadRequest)?;
    let order =
        advance_fulfillment(state, user, id, FulfillmentAction::AssignCarrier, Some(payload)).await?;
    Ok(ApiResponse::success(
        "Delivery details saved",
        order_view(order),
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    ensure_admin(state, user).await?;
    let order = advance_fulfillment(state, user, id, FulfillmentAction::Cancel, None).await?;
    Ok(ApiResponse::success("Order cancelled", order_view(order), Some(Meta::empty())))
}

/// Deliver the order and take its items off stock in one transaction.
///
/// Lines whose product id is missing or unknown are skipped and reported;
/// they never abort the delivery.
pub async fn mark_delivered(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeliveryOutcome>> {
    ensure_admin(state, user).await?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id, None).await?;
    let next = next_fulfillment(order.fulfillment_status, FulfillmentAction::MarkDelivered)?;

    let items = extract_line_items(&order.order_details, order.legacy_items.as_ref());
    let ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let existing: HashSet<Uuid> = if ids.is_empty() {
        HashSet::new()
    } else {
        Products::find()
            .select_only()
            .column(ProdCol::Id)
            .filter(ProdCol::Id.is_in(ids))
            .lock(LockType::Update)
            .into_tuple::<Uuid>()
            .all(&txn)
            .await?
            .into_iter()
            .collect()
    };

    let plan = plan_stock_decrements(&items, &existing);
    for skipped in &plan.skipped {
        tracing::warn!(
            order_id = %order.id,
            product_id = ?skipped.product_id,
            reason = ?skipped.reason,
            "stock decrement skipped"
        );
    }

    for (product_id, quantity) in &plan.decrements {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*quantity))
            .filter(ProdCol::Id.eq(*product_id))
            .exec(&txn)
            .await?;
    }

    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.fulfillment_status = Set(next);
    active.delivered_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        decremented = plan.decrements.len(),
        skipped = plan.skipped.len(),
        "order delivered"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_delivered",
        "orders",
        json!({ "order_id": order.id, "decrements": plan.decrements.len() }),
    )
    .await;

    let outcome = DeliveryOutcome {
        order: order_from_entity(order),
        decremented_products: plan.decrements.len(),
        skipped_items: plan.skipped,
    };
    Ok(ApiResponse::success("Order marked as delivered", outcome, Some(Meta::empty())))
}

pub async fn update_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePaymentRequest,
) -> AppResult<ApiResponse<OrderView>> {
    ensure_admin(state, user).await?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id, None).await?;
    let from = order.payment_status;
    let next = next_payment(from, order.fulfillment_status, payload.action)?;

    let mut active: OrderActive = order.into();
    active.payment_status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_payment",
        "orders",
        json!({ "order_id": order.id, "from": from, "to": next }),
    )
    .await;

    Ok(ApiResponse::success("Payment updated", order_view(order), Some(Meta::empty())))
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardSummary>> {
    ensure_admin(state, user).await?;
    let orders = Orders::find().all(&state.orm).await?;
    let ledger = OrderLedger::from_snapshots(orders.iter().map(snapshot_from_entity));
    Ok(ApiResponse::success("Dashboard", ledger.summary(), Some(Meta::total(ledger.len()))))
}

/// Bring in orders exported from the old document store.
pub async fn import_orders(
    state: &AppState,
    user: &AuthUser,
    payload: ImportOrdersRequest,
) -> AppResult<ApiResponse<ImportSummary>> {
    ensure_admin(state, user).await?;
    let now = Utc::now();
    let docs: Vec<ImportedOrder> = payload
        .orders
        .into_iter()
        .map(|doc| legacy::normalize(doc, now))
        .collect();

    let numbers: Vec<String> = docs.iter().map(|d| d.order_number.clone()).collect();
    let mut seen: HashSet<String> = if numbers.is_empty() {
        HashSet::new()
    } else {
        Orders::find()
            .select_only()
            .column(OrderCol::OrderNumber)
            .filter(OrderCol::OrderNumber.is_in(numbers))
            .into_tuple::<String>()
            .all(&state.orm)
            .await?
            .into_iter()
            .collect()
    };

    let user_ids: Vec<Uuid> = docs.iter().filter_map(|d| d.user_id).collect();
    let known_users: HashSet<Uuid> = if user_ids.is_empty() {
        HashSet::new()
    } else {
        Users::find()
            .select_only()
            .column(UserCol::Id)
            .filter(UserCol::Id.is_in(user_ids))
            .into_tuple::<Uuid>()
            .all(&state.orm)
            .await?
            .into_iter()
            .collect()
    };

    let mut summary = ImportSummary {
        imported: 0,
        skipped_duplicates: Vec::new(),
    };

    let txn = state.orm.begin().await?;
    for doc in docs {
        if !seen.insert(doc.order_number.clone()) {
            summary.skipped_duplicates.push(doc.order_number);
            continue;
        }
        let delivery = doc.delivery;
        OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(doc.user_id.filter(|id| known_users.contains(id))),
            order_number: Set(doc.order_number),
            order_details: Set(doc.order_details),
            legacy_items: Set(doc.legacy_items),
            total_amount: Set(doc.total_amount),
            payment_status: Set(doc.payment_status),
            fulfillment_status: Set(doc.fulfillment_status),
            delivery_company: Set(delivery.as_ref().map(|d| d.company.clone())),
            consignment_number: Set(delivery.as_ref().map(|d| d.consignment_number.clone())),
            tentative_date: Set(delivery.as_ref().and_then(|d| d.tentative_date)),
            delivery_remarks: Set(delivery.and_then(|d| d.remarks)),
            delivered_at: Set(doc.delivered_at.map(Into::into)),
            created_at: Set(doc.created_at.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        summary.imported += 1;
    }
    txn.commit().await?;

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped_duplicates.len(),
        "legacy orders imported"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "orders_import",
        "orders",
        json!({ "imported": summary.imported }),
    )
    .await;

    Ok(ApiResponse::success("Orders imported", summary, Some(Meta::empty())))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(state, user).await?;
    let threshold = query.threshold.unwrap_or(state.settings.low_stock_threshold);
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(state, user).await?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be zero".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_stock = product
        .stock
        .checked_add(payload.delta)
        .filter(|s| *s >= 0)
        .ok_or_else(|| AppError::BadRequest("Stock cannot go below zero".into()))?;

    let mut active: ProductActive = product.into();
    active.stock = Set(new_stock);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "inventory_adjust",
        "products",
        json!({ "product_id": updated.id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        product_from_entity(updated),
        Some(Meta::empty()),
    ))
}
