//! Dashboard figures derived from the order collection.
//!
//! [`OrderLedger`] keeps running totals keyed by order id so that a single
//! changed order costs one retract and one apply instead of a full rescan.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::delivery::DeliveryDetails;
use super::status::{FulfillmentStatus, PaymentStatus};

/// Number of most recent daily buckets reported in the trend.
pub const TREND_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub delivery: Option<DeliveryDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub amount: i64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FulfillmentCounts {
    pub pending: u64,
    pub processing: u64,
    pub confirmed: u64,
    pub checked_in: u64,
    pub in_transit: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_orders: u64,
    pub pending_payments: u64,
    pub completed_payments: u64,
    pub fulfillment: FulfillmentCounts,
    pub trend: Vec<TrendPoint>,
    pub growth_percent: f64,
    pub delivery_details: BTreeMap<Uuid, DeliveryDetails>,
    pub delivered_order_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Bucket {
    amount: i64,
    count: u64,
}

#[derive(Debug, Default)]
pub struct OrderLedger {
    orders: HashMap<Uuid, OrderSnapshot>,
    buckets: BTreeMap<NaiveDate, Bucket>,
    payments: HashMap<PaymentStatus, u64>,
    fulfillment: HashMap<FulfillmentStatus, u64>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = OrderSnapshot>) -> Self {
        let mut ledger = Self::new();
        for snapshot in snapshots {
            ledger.upsert(snapshot);
        }
        ledger
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Insert a new order or replace the previous version of it.
    pub fn upsert(&mut self, snapshot: OrderSnapshot) {
        self.apply(&snapshot);
        if let Some(previous) = self.orders.insert(snapshot.id, snapshot) {
            self.retract(&previous);
        }
    }

    pub fn remove(&mut self, id: Uuid) -> Option<OrderSnapshot> {
        let previous = self.orders.remove(&id)?;
        self.retract(&previous);
        Some(previous)
    }

    pub fn is_delivered(&self, id: Uuid) -> bool {
        self.orders
            .get(&id)
            .is_some_and(|o| o.fulfillment_status == FulfillmentStatus::Delivered)
    }

    pub fn delivered_ids(&self) -> BTreeSet<Uuid> {
        self.orders
            .values()
            .filter(|o| o.fulfillment_status == FulfillmentStatus::Delivered)
            .map(|o| o.id)
            .collect()
    }

    /// The last [`TREND_WINDOW`] daily buckets, oldest first.
    pub fn trend(&self) -> Vec<TrendPoint> {
        let skip = self.buckets.len().saturating_sub(TREND_WINDOW);
        self.buckets
            .iter()
            .skip(skip)
            .map(|(date, bucket)| TrendPoint {
                date: *date,
                amount: bucket.amount,
                count: bucket.count,
            })
            .collect()
    }

    pub fn summary(&self) -> DashboardSummary {
        let payments = |s: PaymentStatus| self.payments.get(&s).copied().unwrap_or(0);
        let stage = |s: FulfillmentStatus| self.fulfillment.get(&s).copied().unwrap_or(0);
        let trend = self.trend();
        let growth_percent = growth_percent(&trend);

        let delivery_details = self
            .orders
            .values()
            .filter_map(|o| o.delivery.clone().map(|d| (o.id, d)))
            .collect();

        DashboardSummary {
            total_orders: self.orders.len() as u64,
            pending_payments: payments(PaymentStatus::Pending),
            completed_payments: self
                .payments
                .iter()
                .filter(|(status, _)| status.is_settled())
                .map(|(_, n)| n)
                .sum(),
            fulfillment: FulfillmentCounts {
                pending: stage(FulfillmentStatus::Pending),
                processing: stage(FulfillmentStatus::Processing),
                confirmed: stage(FulfillmentStatus::Confirmed),
                checked_in: stage(FulfillmentStatus::CheckedIn),
                in_transit: stage(FulfillmentStatus::InTransit),
                delivered: stage(FulfillmentStatus::Delivered),
                cancelled: stage(FulfillmentStatus::Cancelled),
            },
            trend,
            growth_percent,
            delivery_details,
            delivered_order_ids: self.delivered_ids().into_iter().collect(),
        }
    }

    fn apply(&mut self, order: &OrderSnapshot) {
        let bucket = self.buckets.entry(order.created_at.date_naive()).or_default();
        bucket.amount += order.total_amount;
        bucket.count += 1;
        *self.payments.entry(order.payment_status).or_default() += 1;
        *self.fulfillment.entry(order.fulfillment_status).or_default() += 1;
    }

    fn retract(&mut self, order: &OrderSnapshot) {
        let day = order.created_at.date_naive();
        if let Some(bucket) = self.buckets.get_mut(&day) {
            bucket.amount -= order.total_amount;
            bucket.count = bucket.count.saturating_sub(1);
            if bucket.count == 0 {
                self.buckets.remove(&day);
            }
        }
        if let Some(n) = self.payments.get_mut(&order.payment_status) {
            *n = n.saturating_sub(1);
        }
        if let Some(n) = self.fulfillment.get_mut(&order.fulfillment_status) {
            *n = n.saturating_sub(1);
        }
    }
}

/// Percentage change from the first to the last trend bucket.
///
/// A zero first amount is replaced by 1 so the result is always finite.
pub fn growth_percent(trend: &[TrendPoint]) -> f64 {
    let (Some(first), Some(last)) = (trend.first(), trend.last()) else {
        return 0.0;
    };
    let base = if first.amount == 0 { 1 } else { first.amount };
    (last.amount - first.amount) as f64 / base as f64 * 100.0
}

/// Read a creation time stored in any of the encodings found in order
/// documents, falling back to `now` when nothing parses.
pub fn resolve_timestamp(raw: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    try_resolve_timestamp(raw).unwrap_or(now)
}

pub fn try_resolve_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(as_i64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, nanos)
        }
        Value::String(text) => parse_date_text(text),
        Value::Number(_) => as_i64(raw).and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn snapshot(n: u128, at: DateTime<Utc>, amount: i64) -> OrderSnapshot {
        OrderSnapshot {
            id: Uuid::from_u128(n),
            created_at: at,
            total_amount: amount,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            delivery: None,
        }
    }

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, d, h, 0, 0).unwrap()
    }

    #[test]
    fn same_day_orders_share_a_bucket() {
        let ledger =
            OrderLedger::from_snapshots([snapshot(1, day(7, 9), 500), snapshot(2, day(7, 18), 700)]);
        assert_eq!(
            ledger.trend(),
            vec![TrendPoint {
                date: NaiveDate::from_ymd_opt(2024, 9, 7).unwrap(),
                amount: 1200,
                count: 2,
            }]
        );
    }

    #[test]
    fn trend_keeps_last_ten_days() {
        let ledger = OrderLedger::from_snapshots((1..=14).map(|d| snapshot(d as u128, day(d, 12), 100)));
        let trend = ledger.trend();
        assert_eq!(trend.len(), TREND_WINDOW);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2024, 9, 5).unwrap());
        assert_eq!(trend[9].date, NaiveDate::from_ymd_opt(2024, 9, 14).unwrap());
    }

    #[test]
    fn growth_guards_zero_base() {
        let zero_first = OrderLedger::from_snapshots([snapshot(1, day(1, 8), 0), snapshot(2, day(2, 8), 250)]);
        let growth = zero_first.summary().growth_percent;
        assert!(growth.is_finite());
        assert_eq!(growth, 25_000.0);

        let doubled = OrderLedger::from_snapshots([snapshot(1, day(1, 8), 400), snapshot(2, day(3, 8), 800)]);
        assert_eq!(doubled.summary().growth_percent, 100.0);

        assert_eq!(OrderLedger::new().summary().growth_percent, 0.0);
    }

    #[test]
    fn counts_by_axis() {
        let mut paid = snapshot(1, day(1, 8), 100);
        paid.payment_status = PaymentStatus::Success;
        paid.fulfillment_status = FulfillmentStatus::Delivered;
        let mut shipped = snapshot(2, day(1, 9), 100);
        shipped.payment_status = PaymentStatus::Completed;
        shipped.fulfillment_status = FulfillmentStatus::InTransit;
        shipped.delivery = Some(DeliveryDetails {
            company: "India Post".into(),
            consignment_number: "EE123456789IN".into(),
            tentative_date: None,
            remarks: None,
        });
        let waiting = snapshot(3, day(2, 9), 100);
        let mut bounced = snapshot(4, day(2, 10), 100);
        bounced.payment_status = PaymentStatus::Failed;

        let summary = OrderLedger::from_snapshots([paid, shipped, waiting, bounced]).summary();
        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.completed_payments, 2);
        assert_eq!(summary.pending_payments, 1);
        assert_eq!(summary.fulfillment.delivered, 1);
        assert_eq!(summary.fulfillment.in_transit, 1);
        assert_eq!(summary.fulfillment.pending, 2);
        assert_eq!(summary.delivered_order_ids, vec![Uuid::from_u128(1)]);
        assert!(summary.delivery_details.contains_key(&Uuid::from_u128(2)));
    }

    #[test]
    fn deltas_match_full_fold() {
        let mut ledger = OrderLedger::new();
        ledger.upsert(snapshot(1, day(1, 8), 300));
        ledger.upsert(snapshot(2, day(2, 8), 500));
        ledger.upsert(snapshot(3, day(2, 10), 50));

        let mut moved = snapshot(2, day(3, 8), 900);
        moved.fulfillment_status = FulfillmentStatus::Delivered;
        ledger.upsert(moved.clone());
        ledger.remove(Uuid::from_u128(1));
        assert!(ledger.remove(Uuid::from_u128(42)).is_none());

        let folded = OrderLedger::from_snapshots([snapshot(3, day(2, 10), 50), moved]);
        assert_eq!(ledger.summary(), folded.summary());
        assert!(ledger.is_delivered(Uuid::from_u128(2)));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn timestamp_encodings_agree() {
        let expected = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let now = Utc.timestamp_opt(0, 0).unwrap();

        let encodings = [
            json!({ "seconds": 1_700_000_000 }),
            json!({ "seconds": 1_700_000_000, "nanoseconds": 0 }),
            json!({ "_seconds": 1_700_000_000, "_nanoseconds": 0 }),
            json!("2023-11-14T22:13:20Z"),
            json!("2023-11-14T22:13:20.000+00:00"),
            json!(1_700_000_000_000i64),
        ];
        for raw in encodings {
            assert_eq!(resolve_timestamp(&raw, now), expected, "{raw}");
        }
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for raw in [json!("not a date"), json!(null), json!({ "when": 3 }), json!([1, 2])] {
            assert_eq!(resolve_timestamp(&raw, now), now);
        }
        assert_eq!(
            resolve_timestamp(&json!("2024-08-30"), now),
            Utc.with_ymd_and_hms(2024, 8, 30, 0, 0, 0).unwrap()
        );
    }
}
