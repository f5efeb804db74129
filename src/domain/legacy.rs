//! Normalising order documents exported from the old document store.
//!
//! Those documents carry camelCase keys, three different `createdAt`
//! encodings, rupee amounts as floats, and two overlapping status fields
//! (`status` and `deliveryStatus`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::aggregate::{resolve_timestamp, try_resolve_timestamp};
use super::delivery::DeliveryDetails;
use super::status::{FulfillmentStatus, PaymentStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyOrder {
    pub id: Option<String>,
    pub order_number: Option<String>,
    pub user_id: Option<String>,
    #[schema(value_type = Object)]
    pub created_at: Value,
    #[schema(value_type = Object)]
    pub order_details: Value,
    #[schema(value_type = Option<Vec<Object>>)]
    pub items: Option<Value>,
    pub total_amount: Option<f64>,
    pub payment_status: Option<String>,
    pub status: Option<String>,
    pub delivery_status: Option<String>,
    pub delivery_details: Option<LegacyDeliveryDetails>,
    #[schema(value_type = Object)]
    pub delivered_at: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyDeliveryDetails {
    pub company: Option<String>,
    pub consignment_number: Option<String>,
    pub tentative_date: Option<String>,
    pub remarks: Option<String>,
}

/// A legacy order ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedOrder {
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub order_details: Value,
    pub legacy_items: Option<Value>,
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub delivery: Option<DeliveryDetails>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Rupees, possibly fractional, to paise.
pub fn rupees_to_paise(rupees: f64) -> i64 {
    if rupees.is_finite() {
        (rupees * 100.0).round() as i64
    } else {
        0
    }
}

pub fn normalize(doc: LegacyOrder, now: DateTime<Utc>) -> ImportedOrder {
    let created_at = resolve_timestamp(&doc.created_at, now);
    let fulfillment_status =
        reconcile_fulfillment(doc.status.as_deref(), doc.delivery_status.as_deref());
    let payment_status = reconcile_payment(doc.payment_status.as_deref(), doc.status.as_deref());

    let total = doc
        .order_details
        .get("totalAmount")
        .and_then(Value::as_f64)
        .or(doc.total_amount)
        .unwrap_or(0.0);

    let order_number = doc
        .order_number
        .filter(|n| !n.trim().is_empty())
        .or(doc.id.clone().filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| {
            let suffix = Uuid::new_v4().simple().to_string();
            format!("LEGACY-{}", &suffix[..8])
        });

    let delivered_at = try_resolve_timestamp(&doc.delivered_at).or_else(|| {
        (fulfillment_status == FulfillmentStatus::Delivered).then_some(created_at)
    });

    ImportedOrder {
        order_number,
        user_id: doc.user_id.as_deref().and_then(|u| Uuid::parse_str(u).ok()),
        created_at,
        order_details: if doc.order_details.is_object() {
            doc.order_details
        } else {
            Value::Object(Default::default())
        },
        legacy_items: doc.items.filter(Value::is_array),
        total_amount: rupees_to_paise(total),
        payment_status,
        fulfillment_status,
        delivery: doc.delivery_details.and_then(delivery_details),
        delivered_at,
    }
}

/// Fold `status` and `deliveryStatus` into one fulfillment state.
///
/// Either field saying DELIVERED wins. Otherwise `deliveryStatus` is
/// preferred when it names a fulfillment state.
pub fn reconcile_fulfillment(status: Option<&str>, delivery_status: Option<&str>) -> FulfillmentStatus {
    let status = status.and_then(FulfillmentStatus::parse);
    let delivery = delivery_status.and_then(FulfillmentStatus::parse);
    if status == Some(FulfillmentStatus::Delivered) || delivery == Some(FulfillmentStatus::Delivered) {
        return FulfillmentStatus::Delivered;
    }
    delivery.or(status).unwrap_or(FulfillmentStatus::Pending)
}

/// `status` sometimes holds a payment word. Use it only when
/// `paymentStatus` is absent or unreadable.
pub fn reconcile_payment(payment_status: Option<&str>, status: Option<&str>) -> PaymentStatus {
    if let Some(parsed) = payment_status.and_then(PaymentStatus::parse) {
        return parsed;
    }
    match status.and_then(PaymentStatus::parse) {
        Some(p @ (PaymentStatus::Completed | PaymentStatus::Success | PaymentStatus::Failed)) => p,
        _ => PaymentStatus::Pending,
    }
}

fn delivery_details(raw: LegacyDeliveryDetails) -> Option<DeliveryDetails> {
    let company = raw.company.unwrap_or_default();
    let consignment_number = raw.consignment_number.unwrap_or_default();
    if company.trim().is_empty() && consignment_number.trim().is_empty() {
        return None;
    }
    let tentative_date = raw.tentative_date.as_deref().and_then(|d| {
        let d = d.trim();
        NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(d).ok().map(|dt| dt.date_naive()))
    });
    Some(DeliveryDetails {
        company,
        consignment_number,
        tentative_date,
        remarks: raw.remarks.filter(|r| !r.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::domain::aggregate::{OrderLedger, OrderSnapshot};

    fn parse(doc: Value) -> LegacyOrder {
        serde_json::from_value(doc).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn either_field_marks_delivered() {
        let cases = [
            (Some("DELIVERED"), None),
            (None, Some("DELIVERED")),
            (Some("IN_TRANSIT"), Some("delivered")),
            (Some("delivered"), Some("IN_TRANSIT")),
        ];
        let mut ledger = OrderLedger::new();
        for (n, (status, delivery)) in cases.into_iter().enumerate() {
            let fulfillment_status = reconcile_fulfillment(status, delivery);
            assert_eq!(fulfillment_status, FulfillmentStatus::Delivered);
            ledger.upsert(OrderSnapshot {
                id: Uuid::from_u128(n as u128),
                created_at: now(),
                total_amount: 0,
                payment_status: PaymentStatus::Pending,
                fulfillment_status,
                delivery: None,
            });
        }
        assert_eq!(ledger.summary().delivered_order_ids.len(), 4);
    }

    #[test]
    fn delivery_status_preferred_over_status() {
        assert_eq!(
            reconcile_fulfillment(Some("PROCESSING"), Some("IN_TRANSIT")),
            FulfillmentStatus::InTransit
        );
        assert_eq!(reconcile_fulfillment(Some("CONFIRMED"), None), FulfillmentStatus::Confirmed);
        assert_eq!(reconcile_fulfillment(Some("COMPLETED"), None), FulfillmentStatus::Pending);
    }

    #[test]
    fn payment_word_in_status() {
        assert_eq!(reconcile_payment(None, Some("COMPLETED")), PaymentStatus::Completed);
        assert_eq!(reconcile_payment(Some("FAILED"), Some("SUCCESS")), PaymentStatus::Failed);
        assert_eq!(reconcile_payment(None, Some("CANCELLED")), PaymentStatus::Pending);
    }

    #[test]
    fn normalizes_full_document() {
        let doc = parse(json!({
            "id": "abc123",
            "orderNumber": "MA-1001",
            "createdAt": { "seconds": 1_700_000_000, "nanoseconds": 0 },
            "orderDetails": {
                "items": [{ "productId": "6c1e4c0a-8a4f-4d2b-9d0e-2b0c3a1f0001", "quantity": 2 }],
                "cartData": { "subtotal": 1100, "discount": 0, "shippingCost": 99.5 },
                "totalAmount": 1199.5
            },
            "paymentStatus": "SUCCESS",
            "status": "IN_TRANSIT",
            "deliveryDetails": {
                "company": "Blue Dart",
                "consignmentNumber": "BD42",
                "tentativeDate": "2023-11-20",
                "remarks": ""
            }
        }));
        let order = normalize(doc, now());

        assert_eq!(order.order_number, "MA-1001");
        assert_eq!(order.created_at, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(order.total_amount, 119_950);
        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert_eq!(order.fulfillment_status, FulfillmentStatus::InTransit);
        let delivery = order.delivery.unwrap();
        assert_eq!(delivery.tentative_date, NaiveDate::from_ymd_opt(2023, 11, 20));
        assert_eq!(delivery.remarks, None);
        assert_eq!(order.delivered_at, None);
    }

    #[test]
    fn sparse_document_uses_fallbacks() {
        let doc = parse(json!({ "id": "xyz", "createdAt": "garbage", "totalAmount": 250, "status": "DELIVERED", "items": [] }));
        let order = normalize(doc, now());
        assert_eq!(order.order_number, "xyz");
        assert_eq!(order.created_at, now());
        assert_eq!(order.total_amount, 25_000);
        assert_eq!(order.delivered_at, Some(now()));
        assert!(order.order_details.is_object());
        assert!(order.delivery.is_none());
    }
}
