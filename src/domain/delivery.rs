//! Delivery metadata and the stock movements triggered by a delivery.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryDetails {
    pub company: String,
    pub consignment_number: String,
    pub tentative_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

impl DeliveryDetails {
    pub fn validate(&self) -> Result<(), String> {
        if self.company.trim().is_empty() {
            return Err("delivery company is required".into());
        }
        if self.consignment_number.trim().is_empty() {
            return Err("consignment number is required".into());
        }
        Ok(())
    }
}

/// An order line as stored in the order document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingProductId,
    ProductNotFound,
    /// Zero or negative quantity.
    InvalidQuantity,
    /// Would push the merged quantity for the product past `i32::MAX`.
    QuantityOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SkippedItem {
    pub product_id: Option<Uuid>,
    pub name: Option<String>,
    pub quantity: i32,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockPlan {
    /// Product id and total quantity to take off its stock.
    pub decrements: Vec<(Uuid, i32)>,
    pub skipped: Vec<SkippedItem>,
}

/// Pull line items out of an order.
///
/// Looks at `details.items`, then `details.cartData.items`, then the bare
/// `legacy_items` array. The first non-empty array wins.
pub fn extract_line_items(details: &Value, legacy_items: Option<&Value>) -> Vec<LineItem> {
    let candidates = [
        details.get("items"),
        details.get("cartData").and_then(|c| c.get("items")),
        legacy_items,
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .find(|items| !items.is_empty())
        .map(|items| items.iter().map(line_item).collect())
        .unwrap_or_default()
}

fn line_item(raw: &Value) -> LineItem {
    let product_id = ["productId", "product_id", "id"]
        .iter()
        .filter_map(|key| raw.get(*key))
        .filter_map(Value::as_str)
        .find_map(|s| Uuid::parse_str(s.trim()).ok());
    let quantity = raw
        .get("quantity")
        .and_then(|q| q.as_i64().or_else(|| q.as_str().and_then(|s| s.trim().parse().ok())))
        .and_then(|q| i32::try_from(q).ok())
        .unwrap_or(1);
    let name = raw.get("name").and_then(Value::as_str).map(str::to_owned);
    LineItem {
        product_id,
        quantity,
        name,
    }
}

/// Decide which stock decrements to perform for `items`.
///
/// Quantities for the same product are merged. Items without a usable
/// product id, whose product is not in `existing`, or whose quantity is not
/// positive are skipped, as is any line that would overflow the merged total.
pub fn plan_stock_decrements(items: &[LineItem], existing: &HashSet<Uuid>) -> StockPlan {
    let mut plan = StockPlan::default();
    let mut totals: HashMap<Uuid, i32> = HashMap::new();

    for item in items {
        let Some(product_id) = item.product_id else {
            plan.skipped.push(skipped(item, SkipReason::MissingProductId));
            continue;
        };
        if !existing.contains(&product_id) {
            plan.skipped.push(skipped(item, SkipReason::ProductNotFound));
            continue;
        }
        if item.quantity <= 0 {
            plan.skipped.push(skipped(item, SkipReason::InvalidQuantity));
            continue;
        }
        let current = totals.get(&product_id).copied().unwrap_or(0);
        let Some(total) = current.checked_add(item.quantity) else {
            plan.skipped.push(skipped(item, SkipReason::QuantityOverflow));
            continue;
        };
        if !totals.contains_key(&product_id) {
            plan.decrements.push((product_id, 0));
        }
        totals.insert(product_id, total);
    }

    for (product_id, quantity) in plan.decrements.iter_mut() {
        *quantity = totals.get(product_id).copied().unwrap_or_default();
    }
    plan
}

fn skipped(item: &LineItem, reason: SkipReason) -> SkippedItem {
    SkippedItem {
        product_id: item.product_id,
        name: item.name.clone(),
        quantity: item.quantity,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const P1: &str = "6c1e4c0a-8a4f-4d2b-9d0e-2b0c3a1f0001";
    const P2: &str = "6c1e4c0a-8a4f-4d2b-9d0e-2b0c3a1f0002";

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn items_take_priority_over_cart_data() {
        let details = json!({
            "items": [{ "productId": P1, "quantity": 2 }],
            "cartData": { "items": [{ "productId": P2, "quantity": 9 }] }
        });
        let items = extract_line_items(&details, None);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, Some(uuid(P1)));
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn falls_back_to_cart_data_then_bare_items() {
        let details = json!({ "items": [], "cartData": { "items": [{ "id": P2, "quantity": "3" }] } });
        let items = extract_line_items(&details, None);
        assert_eq!(items[0].product_id, Some(uuid(P2)));
        assert_eq!(items[0].quantity, 3);

        let bare = json!([{ "product_id": P1 }]);
        let items = extract_line_items(&json!({}), Some(&bare));
        assert_eq!(items[0].product_id, Some(uuid(P1)));
        assert_eq!(items[0].quantity, 1);

        assert!(extract_line_items(&json!({}), None).is_empty());
    }

    #[test]
    fn plan_merges_and_skips() {
        let items = vec![
            LineItem { product_id: Some(uuid(P1)), quantity: 2, name: None },
            LineItem { product_id: Some(uuid(P2)), quantity: 1, name: Some("Diya set".into()) },
            LineItem { product_id: Some(uuid(P1)), quantity: 3, name: None },
            LineItem { product_id: None, quantity: 1, name: Some("Gift wrap".into()) },
        ];
        let existing: HashSet<Uuid> = [uuid(P1)].into_iter().collect();
        let plan = plan_stock_decrements(&items, &existing);

        assert_eq!(plan.decrements, vec![(uuid(P1), 5)]);
        assert_eq!(plan.skipped.len(), 2);
        assert_eq!(plan.skipped[0].reason, SkipReason::ProductNotFound);
        assert_eq!(plan.skipped[1].reason, SkipReason::MissingProductId);
    }

    #[test]
    fn non_positive_quantities_are_reported() {
        let items = vec![
            LineItem { product_id: Some(uuid(P1)), quantity: 0, name: Some("Matka".into()) },
            LineItem { product_id: Some(uuid(P1)), quantity: -4, name: None },
            LineItem { product_id: Some(uuid(P1)), quantity: 1, name: None },
        ];
        let existing: HashSet<Uuid> = [uuid(P1)].into_iter().collect();
        let plan = plan_stock_decrements(&items, &existing);

        assert_eq!(plan.decrements, vec![(uuid(P1), 1)]);
        assert_eq!(plan.skipped.len(), 2);
        assert!(plan.skipped.iter().all(|s| s.reason == SkipReason::InvalidQuantity));
    }

    #[test]
    fn merged_quantity_never_wraps() {
        let items = vec![
            LineItem { product_id: Some(uuid(P1)), quantity: i32::MAX, name: None },
            LineItem { product_id: Some(uuid(P1)), quantity: 2, name: None },
        ];
        let existing: HashSet<Uuid> = [uuid(P1)].into_iter().collect();
        let plan = plan_stock_decrements(&items, &existing);

        assert_eq!(plan.decrements, vec![(uuid(P1), i32::MAX)]);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, SkipReason::QuantityOverflow);
        assert_eq!(plan.skipped[0].quantity, 2);
    }

    #[test]
    fn details_require_carrier_and_consignment() {
        let mut details = DeliveryDetails {
            company: "Delhivery".into(),
            consignment_number: " ".into(),
            tentative_date: None,
            remarks: None,
        };
        assert!(details.validate().is_err());
        details.consignment_number = "DL778812".into();
        assert!(details.validate().is_ok());
    }
}
