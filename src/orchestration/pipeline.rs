//! Batch pipeline: search, enrich, filter, map, allocate.

use super::cache::TtlCache;
use crate::config::Config;
use crate::datasource::{
    DataSourceError, MarketplaceSource, OrderSearch, SheetSource, TaxSource, MAX_PAGE_SIZE,
};
use crate::domain::primitives::local_day_bounds;
use crate::domain::{
    build_cost_table, inspect_cost_cell, CostCellParse, CostTable, Decimal, Order, OrderId,
    Payment, PaymentSummary, Row, Shipment, TimeMs, COST_COLUMN,
};
use crate::engine::{is_in_range, AllocationItem, OrderRowMapper, PivotMode, ShippingAllocator};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_MAX_PAGES: u32 = 20;
pub const MAX_PAGES_LIMIT: u32 = 200;
/// Cap on ids reported by the missing-cost scan.
pub const MISSING_COSTS_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// First local day (inclusive)
    pub from: NaiveDate,
    /// Last local day (inclusive)
    pub to: NaiveDate,
    pub page_size: u32,
    pub max_pages: u32,
    pub include_shipment: bool,
    /// Overrides the configured pivot mode for this batch.
    pub mode: Option<PivotMode>,
}

impl BatchRequest {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            include_shipment: false,
            mode: None,
        }
    }
}

/// Final rows of one batch, in upstream (newest first) order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub mode: PivotMode,
    pub rows: Vec<Row>,
}

/// An item whose first-line id has no unit cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCost {
    pub id: String,
    pub title: Option<String>,
}

/// Outcome of a missing-cost scan. `total` counts every distinct id; `items`
/// lists at most [`MISSING_COSTS_LIMIT`] of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingCosts {
    pub total: usize,
    pub items: Vec<MissingCost>,
}

/// One cost sheet row as read, numbered from 1 like the sheet itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCostRow {
    pub row: usize,
    pub item_id: Option<String>,
    pub cost_cell: Option<String>,
    pub parsed: CostCellParse,
}

/// Tax data of one order as the upstream reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTaxes {
    pub order_id: OrderId,
    pub order_taxes_amount: Option<Decimal>,
    pub order_taxes: Option<serde_json::Value>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
    #[error("no marketplace access token available")]
    MissingToken,
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

/// One order with everything the mapper needs.
#[derive(Debug)]
struct EnrichedOrder {
    order: Order,
    payments: Vec<Payment>,
    shipment: Option<Shipment>,
    tax_override: Option<Decimal>,
}

pub struct OrdersPipeline {
    marketplace: Arc<dyn MarketplaceSource>,
    taxes: Option<Arc<dyn TaxSource>>,
    token_sheet: Option<Arc<dyn SheetSource>>,
    cost_sheet: Option<Arc<dyn SheetSource>>,
    config: Config,
    token_cache: TtlCache<String>,
    seller_cache: TtlCache<i64>,
    cost_cache: TtlCache<Arc<CostTable>>,
}

impl OrdersPipeline {
    pub fn new(marketplace: Arc<dyn MarketplaceSource>, config: Config) -> Self {
        let ttl = config.cache_ttl;
        Self {
            marketplace,
            taxes: None,
            token_sheet: None,
            cost_sheet: None,
            config,
            token_cache: TtlCache::new(ttl),
            seller_cache: TtlCache::new(ttl),
            cost_cache: TtlCache::new(ttl),
        }
    }

    pub fn with_tax_source(mut self, taxes: Arc<dyn TaxSource>) -> Self {
        self.taxes = Some(taxes);
        self
    }

    pub fn with_token_sheet(mut self, sheet: Arc<dyn SheetSource>) -> Self {
        self.token_sheet = Some(sheet);
        self
    }

    pub fn with_cost_sheet(mut self, sheet: Arc<dyn SheetSource>) -> Self {
        self.cost_sheet = Some(sheet);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a marketplace token can be obtained at all.
    pub fn has_token_source(&self) -> bool {
        self.config.meli_access_token.is_some() || self.token_sheet.is_some()
    }

    /// Build the rows of one batch.
    ///
    /// Fails only when a mandatory call (token, seller, search, cost table)
    /// fails. Payment, tax and shipment lookups degrade per order.
    pub async fn run(&self, request: &BatchRequest) -> Result<Batch, PipelineError> {
        if request.from > request.to {
            return Err(PipelineError::InvalidRange {
                from: request.from,
                to: request.to,
            });
        }
        let mode = request.mode.unwrap_or(self.config.date_pivot);
        let token = self.access_token().await?;
        let seller_id = self.seller_id(&token).await?;
        let costs = self.cost_table().await?;

        let (window_from, window_to) =
            local_day_bounds(request.from, request.to, self.config.utc_offset);
        let search_from = if mode.needs_lookback() {
            let widened = window_from.saturating_sub_days(self.config.paid_lookback_days);
            tracing::info!(
                "Pivot {}: requested from {} but searching from {} (lookback {}d)",
                mode,
                window_from.to_iso_utc(),
                widened.to_iso_utc(),
                self.config.paid_lookback_days
            );
            widened
        } else {
            window_from
        };

        let orders = self
            .search_all(&token, seller_id, search_from, window_to, request)
            .await?;
        let scanned = orders.len();

        let enriched: Vec<EnrichedOrder> = stream::iter(orders)
            .map(|order| {
                self.enrich(&token, order, mode, window_from, window_to, request.include_shipment)
            })
            .buffered(self.config.concurrency.max(1))
            .filter_map(|e| async move { e })
            .collect()
            .await;

        let mapper = OrderRowMapper::new(self.config.shipping, mode, self.config.utc_offset);
        let items: Vec<AllocationItem<'_>> = enriched
            .iter()
            .map(|e| AllocationItem {
                order: &e.order,
                shipment: e.shipment.as_ref(),
                row: mapper.map_order(
                    &e.order,
                    &e.payments,
                    e.shipment.as_ref(),
                    &costs,
                    e.tax_override,
                ),
            })
            .collect();
        let rows = ShippingAllocator::new(self.config.shipping).allocate(items);

        tracing::info!(
            "Batch {}..{} mode={}: {} orders scanned, {} rows",
            request.from,
            request.to,
            mode,
            scanned,
            rows.len()
        );

        Ok(Batch {
            from: request.from,
            to: request.to,
            mode,
            rows,
        })
    }

    /// First-line item ids of non-cancelled orders in the window that have no
    /// unit cost, in first-seen order.
    pub async fn missing_costs(
        &self,
        request: &BatchRequest,
    ) -> Result<MissingCosts, PipelineError> {
        if request.from > request.to {
            return Err(PipelineError::InvalidRange {
                from: request.from,
                to: request.to,
            });
        }
        let token = self.access_token().await?;
        let seller_id = self.seller_id(&token).await?;
        let costs = self.cost_table().await?;
        let (from, to) = local_day_bounds(request.from, request.to, self.config.utc_offset);
        let orders = self.search_all(&token, seller_id, from, to, request).await?;

        let mut seen = HashSet::new();
        let mut missing = MissingCosts::default();
        for order in &orders {
            let Some(item) = order.first_item() else {
                continue;
            };
            let Some(id) = item.item.id.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            if costs.contains(id) || !seen.insert(id.to_string()) {
                continue;
            }
            missing.total += 1;
            if missing.items.len() < MISSING_COSTS_LIMIT {
                missing.items.push(MissingCost {
                    id: id.to_string(),
                    title: item.item.title.clone(),
                });
            }
        }
        Ok(missing)
    }

    /// Head of the cost sheet, uncached, with each cost cell's parse steps.
    /// Without a cost source there are no rows.
    pub async fn raw_cost_rows(&self) -> Result<Vec<RawCostRow>, PipelineError> {
        let Some(sheet) = &self.cost_sheet else {
            return Ok(Vec::new());
        };
        let rows = sheet.read_range(&self.config.costs_raw_range()).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let item_id = row.first().cloned();
                let cost_cell = row.get(COST_COLUMN).cloned();
                let parsed = inspect_cost_cell(cost_cell.as_deref().unwrap_or(""));
                RawCostRow {
                    row: i + 1,
                    item_id,
                    cost_cell,
                    parsed,
                }
            })
            .collect())
    }

    /// Order-level and per-payment taxes of one order. Payments come from the
    /// payments endpoint with the same embedded fallback as a batch.
    pub async fn order_taxes(&self, order_id: OrderId) -> Result<OrderTaxes, PipelineError> {
        let token = self.access_token().await?;
        let order = self.marketplace.order(&token, order_id).await?;
        let payments = self.payments_for(&token, &order).await;
        Ok(OrderTaxes {
            order_id,
            order_taxes_amount: order.taxes_amount(),
            order_taxes: order.taxes.clone(),
            payments,
        })
    }

    /// Current cost table, loaded through the cache. Without a cost source
    /// every order costs 0.
    pub async fn cost_table(&self) -> Result<Arc<CostTable>, PipelineError> {
        let Some(sheet) = &self.cost_sheet else {
            return Ok(Arc::new(CostTable::default()));
        };
        let range = self.config.costs_range();
        self.cost_cache
            .get_or_try_load(|| async {
                let rows = sheet.read_range(&range).await?;
                let table = build_cost_table(rows);
                tracing::info!("Loaded {} unit costs from {}", table.len(), range);
                Ok::<_, PipelineError>(Arc::new(table))
            })
            .await
    }

    async fn access_token(&self) -> Result<String, PipelineError> {
        if let Some(token) = &self.config.meli_access_token {
            return Ok(token.clone());
        }
        let Some(sheet) = &self.token_sheet else {
            return Err(PipelineError::MissingToken);
        };
        let range = self.config.tokens_range();
        self.token_cache
            .get_or_try_load(|| async {
                let rows = sheet.read_range(&range).await?;
                rows.first()
                    .and_then(|row| row.first())
                    .map(|cell| cell.trim().to_string())
                    .filter(|token| !token.is_empty())
                    .ok_or(PipelineError::MissingToken)
            })
            .await
    }

    async fn seller_id(&self, token: &str) -> Result<i64, PipelineError> {
        self.seller_cache
            .get_or_try_load(|| async {
                Ok::<_, PipelineError>(self.marketplace.seller_id(token).await?)
            })
            .await
    }

    /// Page through the order search. Stops when the upstream returns fewer
    /// entries than requested, counting entries that failed to decode;
    /// cancelled orders are dropped only after paging so offsets stay aligned
    /// with the upstream result set.
    async fn search_all(
        &self,
        token: &str,
        seller_id: i64,
        from: TimeMs,
        to: TimeMs,
        request: &BatchRequest,
    ) -> Result<Vec<Order>, PipelineError> {
        let limit = request.page_size.clamp(1, MAX_PAGE_SIZE);
        let pages = request.max_pages.clamp(1, MAX_PAGES_LIMIT);
        let mut orders = Vec::new();

        for page in 0..pages {
            let query = OrderSearch {
                seller_id,
                from,
                to,
                limit,
                offset: page * limit,
            };
            let page = self.marketplace.search_orders(token, &query).await?;
            orders.extend(page.orders);
            if page.raw_len < limit as usize {
                break;
            }
        }

        let total = orders.len();
        orders.retain(|o| !o.is_cancelled());
        tracing::debug!(
            "Fetched {} orders ({} cancelled dropped)",
            orders.len(),
            total - orders.len()
        );
        Ok(orders)
    }

    async fn enrich(
        &self,
        token: &str,
        order: Order,
        mode: PivotMode,
        from: TimeMs,
        to: TimeMs,
        include_shipment: bool,
    ) -> Option<EnrichedOrder> {
        let payments = self.payments_for(token, &order).await;
        if !is_in_range(&order, &payments, mode, from, to) {
            tracing::debug!("Order {:?} outside the {} window", order.id, mode);
            return None;
        }

        let tax_override = self.tax_override(&payments).await;
        let summary = PaymentSummary::from_payments(&payments);
        tracing::debug!(
            "Order {:?}: {} payments, net received {}, up to {} installments",
            order.id,
            payments.len(),
            summary.net_received,
            summary.installments
        );

        let shipment = match order.shipping_id() {
            Some(id) if include_shipment => match self.marketplace.shipment(token, id).await {
                Ok(shipment) => Some(shipment),
                Err(e) => {
                    tracing::warn!("Shipment {} unavailable for order {:?}: {}", id, order.id, e);
                    None
                }
            },
            _ => None,
        };

        Some(EnrichedOrder {
            order,
            payments,
            shipment,
            tax_override,
        })
    }

    /// Payments from the payments endpoint, falling back to those embedded in
    /// the order when the endpoint fails or returns nothing.
    async fn payments_for(&self, token: &str, order: &Order) -> Vec<Payment> {
        let Some(order_id) = order.id else {
            return order.payments.clone();
        };
        match self.marketplace.order_payments(token, order_id).await {
            Ok(payments) if !payments.is_empty() => payments,
            Ok(_) => order.payments.clone(),
            Err(e) => {
                tracing::warn!(
                    "Payments unavailable for order {} ({}); using {} embedded payments",
                    order_id,
                    e,
                    order.payments.len()
                );
                order.payments.clone()
            }
        }
    }

    /// Sum of withheld taxes over the payments, when a tax source is
    /// configured and at least one lookup succeeds.
    async fn tax_override(&self, payments: &[Payment]) -> Option<Decimal> {
        let taxes = self.taxes.as_ref()?;
        let mut total: Option<Decimal> = None;
        for payment_id in payments.iter().filter_map(|p| p.id) {
            match taxes.payment_taxes(payment_id).await {
                Ok(amount) => total = Some(total.unwrap_or_default() + amount),
                Err(e) => tracing::warn!("Tax lookup failed for payment {}: {}", payment_id, e),
            }
        }
        total
    }
}

impl std::fmt::Debug for OrdersPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersPipeline")
            .field("marketplace", &self.marketplace)
            .field("taxes", &self.taxes)
            .field("token_sheet", &self.token_sheet)
            .field("cost_sheet", &self.cost_sheet)
            .finish()
    }
}
