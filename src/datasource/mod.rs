//! Data source abstraction for the marketplace, the payments API and the
//! spreadsheet that holds tokens and unit costs.

use crate::domain::{Decimal, Order, OrderId, Payment, Shipment, TimeMs};
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod meli;
pub mod mercadopago;
pub mod mock;
pub mod sheets;

pub use meli::MeliDataSource;
pub use mercadopago::MercadoPagoTaxSource;
pub use mock::{MockMarketplace, MockSheetSource, MockTaxSource};
pub use sheets::{CsvFileSheet, GoogleSheetsSource};

/// Largest page the order search accepts.
pub const MAX_PAGE_SIZE: u32 = 50;

/// One page of an order search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSearch {
    pub seller_id: i64,
    /// Creation time lower bound (inclusive)
    pub from: TimeMs,
    /// Creation time upper bound (inclusive)
    pub to: TimeMs,
    pub limit: u32,
    pub offset: u32,
}

/// One page of search results.
///
/// `raw_len` counts every entry the upstream returned, including entries that
/// failed to decode, so paging decisions follow the upstream result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub orders: Vec<Order>,
    pub raw_len: usize,
}

impl SearchPage {
    pub fn new(orders: Vec<Order>) -> Self {
        let raw_len = orders.len();
        Self { orders, raw_len }
    }
}

/// Marketplace API: orders and their shipments.
///
/// Implementations must handle retry/backoff and rate limiting. Pagination is
/// driven by the caller through `OrderSearch::offset`.
#[async_trait]
pub trait MarketplaceSource: Send + Sync + fmt::Debug {
    /// Seller account owning the access token.
    async fn seller_id(&self, token: &str) -> Result<i64, DataSourceError>;

    /// One page of orders created inside `[from, to]`, newest first.
    async fn search_orders(
        &self,
        token: &str,
        query: &OrderSearch,
    ) -> Result<SearchPage, DataSourceError>;

    async fn order(&self, token: &str, order_id: OrderId) -> Result<Order, DataSourceError>;

    async fn order_payments(
        &self,
        token: &str,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, DataSourceError>;

    async fn shipment(&self, token: &str, shipment_id: i64) -> Result<Shipment, DataSourceError>;
}

/// Payments API lookup of the taxes withheld on one payment.
#[async_trait]
pub trait TaxSource: Send + Sync + fmt::Debug {
    async fn payment_taxes(&self, payment_id: i64) -> Result<Decimal, DataSourceError>;
}

/// Spreadsheet-like source of raw string cells.
#[async_trait]
pub trait SheetSource: Send + Sync + fmt::Debug {
    /// Rows of an A1-notation range such as `Comparador!A2:M`. Trailing empty
    /// cells may be missing from a row.
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 403 forbidden, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// Source not configured or unusable
    Other(String),
}

impl DataSourceError {
    /// HTTP status behind the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DataSourceError::HttpError { status, .. } => Some(*status),
            DataSourceError::RateLimited => Some(429),
            _ => None,
        }
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_error_display() {
        let err = DataSourceError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = DataSourceError::HttpError {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 403: forbidden");
        assert_eq!(err.status(), Some(403));

        assert_eq!(DataSourceError::RateLimited.to_string(), "Rate limited");
        assert_eq!(DataSourceError::RateLimited.status(), Some(429));
        assert_eq!(DataSourceError::ParseError("x".to_string()).status(), None);
    }
}
