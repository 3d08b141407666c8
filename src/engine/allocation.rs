//! Shipping cost allocation across orders that share one shipment.
//!
//! The upstream source repeats a shared shipment's full cost on every order in
//! it. The allocator groups those orders, takes the repeated figure once, and
//! spreads it over the rows that are not free-shipping eligible. All splitting
//! happens in integer cents so the parts always add back to the whole.

use super::mapper::MappedRow;
use super::rules::{ShippingRules, SplitPolicy};
use crate::domain::{Decimal, Order, Row, Shipment};
use std::collections::HashMap;

/// One order of a batch on its way through allocation.
#[derive(Debug, Clone)]
pub struct AllocationItem<'a> {
    pub order: &'a Order,
    pub shipment: Option<&'a Shipment>,
    pub row: MappedRow,
}

/// Identity of a physical shipment shared by several orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Shipment(i64),
    Pack(i64),
}

/// Shipment id, else pack id, else the order-level shipping id.
pub fn group_key(order: &Order, shipment: Option<&Shipment>) -> Option<GroupKey> {
    if let Some(id) = shipment.and_then(|s| s.id) {
        return Some(GroupKey::Shipment(id));
    }
    if let Some(id) = order.pack_id {
        return Some(GroupKey::Pack(id));
    }
    order.shipping_id().map(GroupKey::Shipment)
}

#[derive(Debug, Clone)]
pub struct ShippingAllocator {
    rules: ShippingRules,
}

impl ShippingAllocator {
    pub fn new(rules: ShippingRules) -> Self {
        Self { rules }
    }

    /// Finalize a complete batch. Rows come back in input order.
    ///
    /// Must run once per batch, after every order of the batch is mapped.
    pub fn allocate(&self, items: Vec<AllocationItem<'_>>) -> Vec<Row> {
        let mut groups: HashMap<GroupKey, Vec<usize>> = HashMap::new();
        let mut shipping: Vec<Decimal> = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            shipping.push(item.row.row().shipping);
            match group_key(item.order, item.shipment) {
                Some(key) => groups.entry(key).or_default().push(idx),
                None => self.apply_threshold(item.row.row(), &mut shipping[idx]),
            }
        }

        for (key, members) in &groups {
            if let [only] = members.as_slice() {
                self.apply_threshold(items[*only].row.row(), &mut shipping[*only]);
                continue;
            }
            let rows: Vec<&Row> = members.iter().map(|&i| items[i].row.row()).collect();
            let shares = self.split_group(&rows);
            tracing::debug!(group = ?key, members = members.len(), shares = ?shares, "allocated shared shipment");
            for (&idx, share) in members.iter().zip(shares) {
                shipping[idx] = share;
            }
        }

        items
            .into_iter()
            .zip(shipping)
            .map(|(item, ship)| item.row.into_row().with_shipping(ship))
            .collect()
    }

    fn apply_threshold(&self, row: &Row, shipping: &mut Decimal) {
        if self.rules.row_is_free(row) {
            *shipping = Decimal::zero();
        }
    }

    /// Per-row shipping for a group of two or more rows, in member order.
    fn split_group(&self, rows: &[&Row]) -> Vec<Decimal> {
        let total = rows
            .iter()
            .map(|r| r.shipping)
            .max()
            .unwrap_or_default();
        let mut shares = vec![Decimal::zero(); rows.len()];
        if !total.is_positive() {
            return shares;
        }

        let eligible: Vec<usize> = (0..rows.len())
            .filter(|&i| !self.rules.row_is_free(rows[i]))
            .collect();
        if eligible.is_empty() {
            return shares;
        }

        let total_cents = total.to_cents();
        let cents = match self.rules.split {
            SplitPolicy::First => split_first(total_cents, eligible.len()),
            SplitPolicy::Even => split_even(total_cents, eligible.len()),
            SplitPolicy::ByPrice => {
                let weights: Vec<Decimal> = eligible.iter().map(|&i| split_weight(rows[i])).collect();
                split_by_weight(total_cents, &weights)
            }
        };
        for (&i, c) in eligible.iter().zip(cents) {
            shares[i] = Decimal::from_cents(c);
        }
        shares
    }
}

/// Weight of a row in proportional splitting: the interest-free price when
/// known, else the buyer-paid total. Non-positive prices weigh nothing.
fn split_weight(row: &Row) -> Decimal {
    let price = row.final_price_no_interest.unwrap_or(row.final_price);
    if price.is_positive() {
        price
    } else {
        Decimal::zero()
    }
}

fn split_first(total_cents: i64, n: usize) -> Vec<i64> {
    let mut parts = vec![0; n];
    if let Some(first) = parts.first_mut() {
        *first = total_cents;
    }
    parts
}

fn split_even(total_cents: i64, n: usize) -> Vec<i64> {
    if n == 0 {
        return Vec::new();
    }
    let n_i = n as i64;
    let base = total_cents / n_i;
    let remainder = (total_cents % n_i) as usize;
    (0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Floor of each proportional share; the last row takes the exact remainder.
/// Falls back to an even split when no row has positive weight.
fn split_by_weight(total_cents: i64, weights: &[Decimal]) -> Vec<i64> {
    let sum: Decimal = weights.iter().copied().sum();
    if !sum.is_positive() {
        return split_even(total_cents, weights.len());
    }
    let total = Decimal::from_i64(total_cents);
    let mut parts = Vec::with_capacity(weights.len());
    let mut assigned = 0i64;
    for (i, w) in weights.iter().enumerate() {
        let part = if i + 1 == weights.len() {
            total_cents - assigned
        } else {
            (total * *w)
                .checked_div(sum)
                .map(|share| share.floor_i64())
                .unwrap_or(0)
        };
        assigned += part;
        parts.push(part);
    }
    parts
}
