//! Order → Row mapping.
//!
//! A pure function over already-fetched data. Missing or malformed inputs
//! degrade to zero or empty values: not every order has a shipment, a
//! resolvable payment, or a cost entry.

use super::pivot::{pivot_timestamp, PivotMode};
use super::rules::ShippingRules;
use crate::domain::{approved_payment, CostTable, Decimal, Order, Payment, Row, Shipment};
use chrono::FixedOffset;

/// A row fresh from the mapper, before shipping allocation.
///
/// Only the mapper creates these and only the allocator consumes them, so a
/// batch goes through allocation exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow(Row);

impl MappedRow {
    pub(crate) fn new(row: Row) -> Self {
        MappedRow(row)
    }

    pub fn row(&self) -> &Row {
        &self.0
    }

    pub(crate) fn into_row(self) -> Row {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct OrderRowMapper {
    rules: ShippingRules,
    pivot_mode: PivotMode,
    offset: FixedOffset,
}

impl OrderRowMapper {
    pub fn new(rules: ShippingRules, pivot_mode: PivotMode, offset: FixedOffset) -> Self {
        Self {
            rules,
            pivot_mode,
            offset,
        }
    }

    /// Map one order into its financial row.
    ///
    /// `tax_override`, when present, replaces the tax reported on the approved
    /// payment.
    pub fn map_order(
        &self,
        order: &Order,
        payments: &[Payment],
        shipment: Option<&Shipment>,
        costs: &CostTable,
        tax_override: Option<Decimal>,
    ) -> MappedRow {
        let approved = approved_payment(payments);

        let final_price = final_price(order).round2();
        let base_price = base_price(order).round2();
        let discount_pct = discount_pct(order).round2();
        let sale_fee = order
            .order_items
            .iter()
            .map(|it| it.sale_fee.unwrap_or_default())
            .sum::<Decimal>()
            .round2();
        let tax = tax_override
            .or_else(|| approved.and_then(|p| p.taxes_amount))
            .unwrap_or_default()
            .round2();
        let qualifying = self.rules.qualifying_price(base_price, final_price);
        let shipping = shipment
            .map(|s| initial_shipping(s, qualifying, &self.rules))
            .unwrap_or_default()
            .round2();

        let mut row = Row {
            sale_id: order.id.unwrap_or(0),
            date: pivot_timestamp(order, payments, self.pivot_mode)
                .map(|t| t.format_local(self.offset))
                .unwrap_or_default(),
            title: order
                .first_item()
                .and_then(|it| it.item.title.clone())
                .unwrap_or_default(),
            final_price,
            base_price,
            discount_pct,
            final_price_no_interest: interest_free_price(payments),
            shipping,
            tax,
            sale_fee,
            cost: order_cost(order, costs),
            installments: approved.and_then(|p| p.installments).unwrap_or(0),
            ..Default::default()
        };
        row.recompute_derived();

        tracing::debug!(
            order_id = row.sale_id,
            final_price = %row.final_price,
            shipping = %row.shipping,
            tax = %row.tax,
            sale_fee = %row.sale_fee,
            net = %row.net,
            cost = %row.cost,
            margin_pct = %row.margin_pct,
            base_price = %row.base_price,
            discount_pct = %row.discount_pct,
            "mapped order"
        );

        MappedRow::new(row)
    }
}

/// Buyer-paid total: the order total, else the discounted subtotal.
fn final_price(order: &Order) -> Decimal {
    order.total_amount.unwrap_or_else(|| {
        order
            .order_items
            .iter()
            .map(|it| it.unit_price.unwrap_or_default() * it.quantity_or_one())
            .sum()
    })
}

/// List price of the first line item times its quantity.
fn base_price(order: &Order) -> Decimal {
    order
        .first_item()
        .and_then(|it| it.full_unit_price.map(|p| p * it.quantity_or_one()))
        .unwrap_or_default()
}

/// `(1 - unit / full) * 100` over the first line. A missing unit price
/// counts as 0; a missing or non-positive full price gives 0.
fn discount_pct(order: &Order) -> Decimal {
    let Some(item) = order.first_item() else {
        return Decimal::zero();
    };
    match item.full_unit_price {
        Some(full) if full.is_positive() => item
            .unit_price
            .unwrap_or_default()
            .checked_div(full)
            .map(|ratio| (Decimal::one() - ratio) * Decimal::hundred())
            .unwrap_or_default(),
        _ => Decimal::zero(),
    }
}

/// Σ unit cost × quantity over line items; unmatched items cost 0.
fn order_cost(order: &Order, costs: &CostTable) -> Decimal {
    order
        .order_items
        .iter()
        .map(|it| {
            let unit = costs.unit_cost_for(it).unwrap_or_default();
            (unit * it.quantity_or_one()).round2()
        })
        .sum::<Decimal>()
        .round2()
}

/// Total paid before financing interest, when the settled payments report it.
fn interest_free_price(payments: &[Payment]) -> Option<Decimal> {
    let amounts: Vec<Decimal> = payments
        .iter()
        .filter(|p| p.is_settled())
        .filter_map(|p| p.transaction_amount)
        .collect();
    if amounts.is_empty() {
        None
    } else {
        Some(amounts.into_iter().sum::<Decimal>().round2())
    }
}

/// Provisional shipping cost charged to the seller for one order.
///
/// Zero when the buyer paid a shipping component. Otherwise the list cost
/// when the seller is the declared payer or the order price reaches the
/// free-shipping threshold.
pub fn initial_shipping(shipment: &Shipment, qualifying_price: Decimal, rules: &ShippingRules) -> Decimal {
    if shipment.receiver_cost().is_positive() {
        return Decimal::zero();
    }
    if shipment.is_paid_by_seller() || qualifying_price >= rules.free_threshold {
        shipment.list_cost()
    } else {
        Decimal::zero()
    }
}
