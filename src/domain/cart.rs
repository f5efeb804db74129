//! Folding raw cart rows into one line per product.

use std::collections::HashMap;

use uuid::Uuid;

/// A stored cart row as far as consolidation cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCartRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Catalogue facts needed to price a line.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedProduct {
    pub id: Uuid,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Every stored row that contributed to this line, in input order.
    pub row_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsolidatedCart {
    pub lines: Vec<CartLine>,
    /// Rows whose product no longer exists. Not priced, not counted.
    pub orphans: Vec<OrphanRow>,
    pub subtotal: i64,
    pub item_count: i64,
}

impl ConsolidatedCart {
    pub fn line(&self, product_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }
}

/// Merge rows by product id, keeping first-seen order of products.
///
/// For each product the consolidated quantity is the sum of the raw
/// quantities. Rows whose product is missing from `products` become
/// orphans.
pub fn consolidate(rows: &[RawCartRow], products: &[PricedProduct]) -> ConsolidatedCart {
    let prices: HashMap<Uuid, i64> = products.iter().map(|p| (p.id, p.price)).collect();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut cart = ConsolidatedCart::default();

    for row in rows {
        if !prices.contains_key(&row.product_id) {
            cart.orphans.push(OrphanRow {
                id: row.id,
                product_id: row.product_id,
                quantity: row.quantity,
            });
            continue;
        }
        match index.get(&row.product_id) {
            Some(&pos) => {
                if let Some(line) = cart.lines.get_mut(pos) {
                    line.quantity = line.quantity.saturating_add(i64::from(row.quantity));
                    line.row_ids.push(row.id);
                }
            }
            None => {
                index.insert(row.product_id, cart.lines.len());
                cart.lines.push(CartLine {
                    product_id: row.product_id,
                    quantity: i64::from(row.quantity),
                    row_ids: vec![row.id],
                });
            }
        }
    }

    for line in &cart.lines {
        let price = prices.get(&line.product_id).copied().unwrap_or_default();
        cart.subtotal = cart
            .subtotal
            .saturating_add(price.saturating_mul(line.quantity));
        cart.item_count = cart.item_count.saturating_add(line.quantity);
    }

    cart
}

/// Shipping owed on a cart: free at or above `free_over`, else `fee`.
pub fn shipping_for(subtotal: i64, fee: i64, free_over: i64) -> i64 {
    if subtotal >= free_over {
        0
    } else {
        fee
    }
}

/// Checkout total in paise, or `None` when it does not fit.
pub fn order_total(subtotal: i64, discount: i64, shipping: i64) -> Option<i64> {
    subtotal.checked_sub(discount)?.checked_add(shipping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn row(row: u128, product: u128, quantity: i32) -> RawCartRow {
        RawCartRow {
            id: id(row),
            product_id: id(product),
            quantity,
        }
    }

    fn product(n: u128, price: i64) -> PricedProduct {
        PricedProduct { id: id(n), price }
    }

    #[test]
    fn merges_duplicate_rows() {
        let (a, b, c, p1, p2) = (1, 2, 3, 100, 200);
        let rows = vec![row(a, p1, 2), row(b, p1, 3), row(c, p2, 1)];
        let cart = consolidate(&rows, &[product(p1, 450), product(p2, 1200)]);

        assert_eq!(
            cart.lines,
            vec![
                CartLine {
                    product_id: id(p1),
                    quantity: 5,
                    row_ids: vec![id(a), id(b)],
                },
                CartLine {
                    product_id: id(p2),
                    quantity: 1,
                    row_ids: vec![id(c)],
                },
            ]
        );
        assert_eq!(cart.subtotal, 5 * 450 + 1200);
        assert_eq!(cart.item_count, 6);
        assert!(cart.orphans.is_empty());
    }

    #[test]
    fn quantity_sum_is_preserved_per_product() {
        let rows: Vec<RawCartRow> = (0..40u128)
            .map(|n| row(n, 100 + n % 3, (n % 7) as i32 + 1))
            .collect();
        let products = [product(100, 1), product(101, 1), product(102, 1)];
        let cart = consolidate(&rows, &products);

        for p in &products {
            let raw: i64 = rows
                .iter()
                .filter(|r| r.product_id == p.id)
                .map(|r| i64::from(r.quantity))
                .sum();
            assert_eq!(cart.line(p.id).map(|l| l.quantity), Some(raw));
        }
        let ids: usize = cart.lines.iter().map(|l| l.row_ids.len()).sum();
        assert_eq!(ids, rows.len());
    }

    #[test]
    fn orphans_are_flagged_and_excluded() {
        let rows = vec![row(1, 100, 2), row(2, 999, 4)];
        let cart = consolidate(&rows, &[product(100, 300)]);

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(
            cart.orphans,
            vec![OrphanRow {
                id: id(2),
                product_id: id(999),
                quantity: 4
            }]
        );
        assert_eq!(cart.subtotal, 600);
        assert_eq!(cart.item_count, 2);
    }

    #[test]
    fn empty_cart() {
        let cart = consolidate(&[], &[]);
        assert_eq!(cart, ConsolidatedCart::default());
    }

    #[test]
    fn huge_prices_saturate_instead_of_wrapping() {
        let rows = vec![row(1, 100, 3), row(2, 200, 1)];
        let cart = consolidate(&rows, &[product(100, i64::MAX / 2), product(200, 10)]);

        assert_eq!(cart.subtotal, i64::MAX);
        assert_eq!(cart.item_count, 4);
    }

    #[test]
    fn shipping_is_waived_at_threshold() {
        assert_eq!(shipping_for(99_999, 10_000, 100_000), 10_000);
        assert_eq!(shipping_for(100_000, 10_000, 100_000), 0);
    }

    #[test]
    fn order_total_rejects_overflow() {
        assert_eq!(order_total(50_000, 0, 10_000), Some(60_000));
        assert_eq!(order_total(i64::MAX, 0, 1), None);
        assert_eq!(order_total(i64::MIN, 1, 0), None);
    }
}
