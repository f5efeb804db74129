use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        cart::{order_total, shipping_for},
        status::{FulfillmentStatus, PaymentStatus},
        workflow::{FulfillmentAction, fulfillment_actions, next_fulfillment, payment_actions},
    },
    dto::orders::{CheckoutRequest, OrderList, OrderView},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{order_from_entity, product_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::cart_service::load_cart,
    state::AppState,
};

pub(crate) fn order_view(model: OrderModel) -> OrderView {
    let fulfillment = fulfillment_actions(model.fulfillment_status);
    let payment = payment_actions(model.payment_status, model.fulfillment_status);
    OrderView {
        order: order_from_entity(model),
        fulfillment_actions: fulfillment,
        payment_actions: payment,
    }
}

pub(crate) fn order_filter(query: &OrderListQuery) -> Condition {
    let mut condition = Condition::all();
    if let Some(status) = query.fulfillment_status {
        condition = condition.add(OrderCol::FulfillmentStatus.eq(status));
    }
    if let Some(status) = query.payment_status {
        condition = condition.add(OrderCol::PaymentStatus.eq(status));
    }
    condition
}

pub(crate) async fn list_with(
    state: &AppState,
    condition: Condition,
    query: &OrderListQuery,
) -> AppResult<(Vec<OrderModel>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    Ok((orders, Meta::new(page, limit, total)))
}

/// Fetch an order with a row lock held for the rest of `txn`.
pub(crate) async fn lock_order(
    txn: &DatabaseTransaction,
    id: Uuid,
    owner: Option<Uuid>,
) -> AppResult<OrderModel> {
    let mut condition = Condition::all().add(OrderCol::Id.eq(id));
    if let Some(owner) = owner {
        condition = condition.add(OrderCol::UserId.eq(owner));
    }
    Orders::find()
        .filter(condition)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = order_filter(&query).add(OrderCol::UserId.eq(user.user_id));
    let (orders, meta) = list_with(state, condition, &query).await?;
    let items = orders.into_iter().map(order_from_entity).collect();
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("OK", order_view(order), Some(Meta::empty())))
}

fn validate_checkout(payload: &CheckoutRequest) -> AppResult<()> {
    let info = &payload.personal_info;
    let address = &payload.delivery_address;
    let required = [
        ("full name", &info.full_name),
        ("email", &info.email),
        ("phone", &info.phone),
        ("address line", &address.line1),
        ("city", &address.city),
        ("state", &address.state),
        ("pincode", &address.pincode),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

/// Turn the consolidated cart into a pending order and empty the cart.
///
/// Stock is only checked here; it is taken off when the order is delivered.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderView>> {
    validate_checkout(&payload)?;

    let txn = state.orm.begin().await?;
    Users::find_by_id(user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;

    let (cart, products) = load_cart(&txn, user.user_id).await?;
    if cart.lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut items = Vec::with_capacity(cart.lines.len());
    let mut consumed_rows: Vec<Uuid> = Vec::new();
    for line in &cart.lines {
        let Some(product) = products.get(&line.product_id) else {
            continue;
        };
        if i64::from(product.stock) < line.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        let image = product_from_entity(product.clone()).images.into_iter().next();
        items.push(json!({
            "productId": product.id,
            "name": product.name,
            "price": product.price,
            "quantity": line.quantity,
            "image": image,
        }));
        consumed_rows.extend(line.row_ids.iter().copied());
    }

    let discount = 0;
    let shipping = shipping_for(
        cart.subtotal,
        state.settings.shipping_fee,
        state.settings.free_shipping_over,
    );
    let total_amount = order_total(cart.subtotal, discount, shipping)
        .ok_or_else(|| AppError::BadRequest("Order total is out of range".into()))?;
    let order_details = json!({
        "items": items,
        "personalInfo": payload.personal_info,
        "deliveryAddress": payload.delivery_address,
        "cartData": {
            "subtotal": cart.subtotal,
            "discount": discount,
            "shippingCost": shipping,
        },
        "totalAmount": total_amount,
    });

    let order_id = Uuid::new_v4();
    let now = Utc::now();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(Some(user.user_id)),
        order_number: Set(build_order_number(order_id)),
        order_details: Set(order_details),
        legacy_items: Set(None),
        total_amount: Set(total_amount),
        payment_status: Set(PaymentStatus::Pending),
        fulfillment_status: Set(FulfillmentStatus::Pending),
        delivery_company: Set(None),
        consignment_number: Set(None),
        tentative_date: Set(None),
        delivery_remarks: Set(None),
        delivered_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    // orphan rows stay behind for the cart view to report
    CartItems::delete_many()
        .filter(CartCol::Id.is_in(consumed_rows))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, total = order.total_amount, "order placed");
    audit::record(
        &state.pool,
        user.user_id,
        "checkout",
        "orders",
        json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        order_view(order),
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderView>> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id, Some(user.user_id)).await?;
    let next = next_fulfillment(order.fulfillment_status, FulfillmentAction::Cancel)?;

    let mut active: OrderActive = order.into();
    active.fulfillment_status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_cancel",
        "orders",
        json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order_view(order),
        Some(Meta::empty()),
    ))
}

pub(crate) fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    format!("MA-{}-{}", date, &suffix[..8]).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_shape() {
        let id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        let number = build_order_number(id);
        assert!(number.starts_with("MA-"));
        assert!(number.ends_with("-1B4E28BA"));
        assert_eq!(number.len(), "MA-20240101-1B4E28BA".len());
    }
}
