//! Mock data sources for testing without network calls.

use super::{DataSourceError, MarketplaceSource, OrderSearch, SearchPage, SheetSource, TaxSource};
use crate::domain::{Decimal, Order, OrderId, Payment, Shipment};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Marketplace mock serving a fixed order list in the given order.
///
/// Search ignores the creation window (callers filter by pivot anyway) and
/// only applies `offset`/`limit`, so paging behaves like the real API.
#[derive(Debug, Clone)]
pub struct MockMarketplace {
    seller_id: i64,
    orders: Vec<Order>,
    payments: HashMap<OrderId, Result<Vec<Payment>, DataSourceError>>,
    shipments: HashMap<i64, Shipment>,
    search_calls: Arc<AtomicUsize>,
    shipment_calls: Arc<AtomicUsize>,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self {
            seller_id: 1,
            orders: Vec::new(),
            payments: HashMap::new(),
            shipments: HashMap::new(),
            search_calls: Arc::new(AtomicUsize::new(0)),
            shipment_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_seller_id(mut self, seller_id: i64) -> Self {
        self.seller_id = seller_id;
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_orders(mut self, orders: Vec<Order>) -> Self {
        self.orders.extend(orders);
        self
    }

    /// Payments returned by the payments endpoint for one order. Orders
    /// without an entry get their embedded payments back.
    pub fn with_payments(mut self, order_id: OrderId, payments: Vec<Payment>) -> Self {
        self.payments.insert(order_id, Ok(payments));
        self
    }

    /// Make the payments endpoint fail for one order.
    pub fn with_payments_error(mut self, order_id: OrderId, err: DataSourceError) -> Self {
        self.payments.insert(order_id, Err(err));
        self
    }

    pub fn with_shipment(mut self, shipment: Shipment) -> Self {
        if let Some(id) = shipment.id {
            self.shipments.insert(id, shipment);
        }
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn shipment_calls(&self) -> usize {
        self.shipment_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketplaceSource for MockMarketplace {
    async fn seller_id(&self, _token: &str) -> Result<i64, DataSourceError> {
        Ok(self.seller_id)
    }

    async fn search_orders(
        &self,
        _token: &str,
        query: &OrderSearch,
    ) -> Result<SearchPage, DataSourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SearchPage::new(
            self.orders
                .iter()
                .skip(query.offset as usize)
                .take(query.limit as usize)
                .cloned()
                .collect(),
        ))
    }

    async fn order(&self, _token: &str, order_id: OrderId) -> Result<Order, DataSourceError> {
        self.orders
            .iter()
            .find(|o| o.id == Some(order_id))
            .cloned()
            .ok_or(DataSourceError::HttpError {
                status: 404,
                message: format!("order {} not found", order_id),
            })
    }

    async fn order_payments(
        &self,
        _token: &str,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, DataSourceError> {
        if let Some(result) = self.payments.get(&order_id) {
            return result.clone();
        }
        Ok(self
            .orders
            .iter()
            .find(|o| o.id == Some(order_id))
            .map(|o| o.payments.clone())
            .unwrap_or_default())
    }

    async fn shipment(&self, _token: &str, shipment_id: i64) -> Result<Shipment, DataSourceError> {
        self.shipment_calls.fetch_add(1, Ordering::SeqCst);
        self.shipments
            .get(&shipment_id)
            .cloned()
            .ok_or(DataSourceError::HttpError {
                status: 404,
                message: format!("shipment {} not found", shipment_id),
            })
    }
}

/// Tax mock keyed by payment id. Unknown payments fail with a 404.
#[derive(Debug, Clone, Default)]
pub struct MockTaxSource {
    taxes: HashMap<i64, Decimal>,
}

impl MockTaxSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tax(mut self, payment_id: i64, amount: Decimal) -> Self {
        self.taxes.insert(payment_id, amount);
        self
    }
}

#[async_trait]
impl TaxSource for MockTaxSource {
    async fn payment_taxes(&self, payment_id: i64) -> Result<Decimal, DataSourceError> {
        self.taxes
            .get(&payment_id)
            .copied()
            .ok_or(DataSourceError::HttpError {
                status: 404,
                message: format!("payment {} not found", payment_id),
            })
    }
}

/// Sheet mock keyed by exact range string.
#[derive(Debug, Clone, Default)]
pub struct MockSheetSource {
    ranges: HashMap<String, Vec<Vec<String>>>,
    reads: Arc<AtomicUsize>,
}

impl MockSheetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: &str, rows: Vec<Vec<String>>) -> Self {
        self.ranges.insert(range.to_string(), rows);
        self
    }

    /// Single-cell range holding `value`.
    pub fn with_cell(self, range: &str, value: &str) -> Self {
        self.with_range(range, vec![vec![value.to_string()]])
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetSource for MockSheetSource {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, DataSourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.ranges
            .get(range)
            .cloned()
            .ok_or_else(|| DataSourceError::Other(format!("unknown range {}", range)))
    }
}
