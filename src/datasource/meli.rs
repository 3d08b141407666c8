//! Mercado Libre marketplace API client.

use super::http::{build_client, decode, get_json};
use super::{DataSourceError, MarketplaceSource, OrderSearch, SearchPage, MAX_PAGE_SIZE};
use crate::domain::{Order, OrderId, Payment, Shipment};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MELI_API_URL: &str = "https://api.mercadolibre.com";

/// Marketplace source backed by the public Mercado Libre REST API.
#[derive(Debug, Clone)]
pub struct MeliDataSource {
    client: Client,
    base_url: String,
}

impl MeliDataSource {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, DataSourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(
        &self,
        path: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<Value, DataSourceError> {
        let url = format!("{}{}", self.base_url, path);
        get_json(&self.client, &url, Some(token), query).await
    }
}

#[async_trait]
impl MarketplaceSource for MeliDataSource {
    async fn seller_id(&self, token: &str) -> Result<i64, DataSourceError> {
        let me = self.get("/users/me", token, &[]).await?;
        me.get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| DataSourceError::ParseError("users/me response has no id".to_string()))
    }

    async fn search_orders(
        &self,
        token: &str,
        query: &OrderSearch,
    ) -> Result<SearchPage, DataSourceError> {
        debug!(
            "Searching orders seller={} offset={} limit={}",
            query.seller_id, query.offset, query.limit
        );
        let params = [
            ("seller", query.seller_id.to_string()),
            ("order.date_created.from", query.from.to_iso_utc()),
            ("order.date_created.to", query.to.to_iso_utc()),
            ("sort", "date_desc".to_string()),
            ("limit", query.limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("offset", query.offset.to_string()),
        ];
        let response = self.get("/orders/search", token, &params).await?;
        let results = response
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(parse_orders(results))
    }

    async fn order(&self, token: &str, order_id: OrderId) -> Result<Order, DataSourceError> {
        let response = self.get(&format!("/orders/{}", order_id), token, &[]).await?;
        decode(response, "order")
    }

    async fn order_payments(
        &self,
        token: &str,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, DataSourceError> {
        let response = self
            .get(&format!("/orders/{}/payments", order_id), token, &[])
            .await?;
        let list = match response {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        decode(Value::Array(list), "payments")
    }

    async fn shipment(&self, token: &str, shipment_id: i64) -> Result<Shipment, DataSourceError> {
        let response = self
            .get(&format!("/shipments/{}", shipment_id), token, &[])
            .await?;
        decode(response, "shipment")
    }
}

/// Decode search results one by one so a single malformed order is skipped
/// instead of failing the page. The page keeps the upstream entry count.
fn parse_orders(results: Vec<Value>) -> SearchPage {
    let raw_len = results.len();
    let orders = results
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<Order>(raw) {
            Ok(order) => Some(order),
            Err(e) => {
                warn!("Failed to parse order: {}", e);
                None
            }
        })
        .collect();
    SearchPage { orders, raw_len }
}
