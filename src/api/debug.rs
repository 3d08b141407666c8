//! Cost-table and tax diagnostics.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::orders::OrdersQuery;
use super::AppState;
use crate::datasource::DataSourceError;
use crate::domain::{Decimal, OrderId, Payment};
use crate::error::AppError;
use crate::orchestration::{PipelineError, RawCostRow};

/// Entries shown by `/debug/costs`.
const COSTS_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Serialize)]
pub struct CostsResponse {
    pub ok: bool,
    pub count: usize,
    pub sample: Vec<(String, Decimal)>,
}

#[derive(Debug, Serialize)]
pub struct CostEntry {
    pub id: String,
    pub cost: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingCostsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MissingItem {
    pub id: String,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingCostsResponse {
    pub ok: bool,
    pub from: String,
    pub to: String,
    pub missing_count: usize,
    pub missing: Vec<MissingItem>,
}

#[derive(Debug, Serialize)]
pub struct CostsRawResponse {
    pub ok: bool,
    pub sheet: String,
    pub rows: Vec<RawCostRowView>,
}

/// Columns A (item id) and M (unit cost) of one sheet row.
#[derive(Debug, Serialize)]
pub struct RawCostRowView {
    pub row: usize,
    #[serde(rename = "A")]
    pub item_id: Option<String>,
    #[serde(rename = "M")]
    pub cost_cell: Option<String>,
    pub parsed: ParsedCostView,
}

#[derive(Debug, Serialize)]
pub struct ParsedCostView {
    pub raw: String,
    pub cleaned: String,
    /// 0 when the cell does not parse.
    pub num: Decimal,
}

impl From<RawCostRow> for RawCostRowView {
    fn from(row: RawCostRow) -> Self {
        Self {
            row: row.row,
            item_id: row.item_id,
            cost_cell: row.cost_cell,
            parsed: ParsedCostView {
                num: row.parsed.value.unwrap_or_default(),
                raw: row.parsed.raw,
                cleaned: row.parsed.cleaned,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaxesQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxesResponse {
    pub ok: bool,
    #[serde(rename = "order_id")]
    pub order_id: OrderId,
    pub order_taxes: OrderTaxesView,
    pub sample_payment: Option<Payment>,
}

#[derive(Debug, Serialize)]
pub struct OrderTaxesView {
    pub order_taxes_amount: Option<Decimal>,
    pub order_taxes_obj: Option<Value>,
    pub payments_taxes_amounts: Vec<Option<Decimal>>,
    pub payments_taxes_raw: Vec<PaymentTaxesView>,
}

#[derive(Debug, Serialize)]
pub struct PaymentTaxesView {
    pub id: Option<i64>,
    pub taxes_amount: Option<Decimal>,
    pub fee_details: Option<Value>,
}

pub async fn get_costs(State(state): State<AppState>) -> Result<Json<CostsResponse>, AppError> {
    let table = state.pipeline.cost_table().await?;
    let sample = table
        .sorted_entries()
        .into_iter()
        .take(COSTS_SAMPLE_SIZE)
        .map(|(id, cost)| (id.to_string(), cost))
        .collect();
    Ok(Json(CostsResponse {
        ok: true,
        count: table.len(),
        sample,
    }))
}

pub async fn get_cost(
    Path(item_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CostEntry>, AppError> {
    let table = state.pipeline.cost_table().await?;
    let cost = table
        .get(&item_id)
        .ok_or_else(|| AppError::NotFound(format!("no unit cost for {}", item_id)))?;
    Ok(Json(CostEntry { id: item_id, cost }))
}

pub async fn get_costs_raw(
    State(state): State<AppState>,
) -> Result<Json<CostsRawResponse>, AppError> {
    let rows = state.pipeline.raw_cost_rows().await?;
    Ok(Json(CostsRawResponse {
        ok: true,
        sheet: state.pipeline.config().costs_sheet.clone(),
        rows: rows.into_iter().map(RawCostRowView::from).collect(),
    }))
}

pub async fn get_taxes(
    query: Result<Query<TaxesQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<Json<TaxesResponse>, AppError> {
    let Query(params) = query?;
    let raw_id = params
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing ?id=ORDER_ID".to_string()))?;
    let order_id: OrderId = raw_id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("id must be an order number, got {}", raw_id)))?;

    let taxes = state
        .pipeline
        .order_taxes(order_id)
        .await
        .map_err(|e| match e {
            PipelineError::DataSource(DataSourceError::HttpError { status: 404, .. }) => {
                AppError::NotFound(format!("order {} not found", order_id))
            }
            other => other.into(),
        })?;

    let payments_taxes_raw = taxes
        .payments
        .iter()
        .map(|p| PaymentTaxesView {
            id: p.id,
            taxes_amount: p.taxes_amount,
            fee_details: p.fee_details.clone(),
        })
        .collect();
    Ok(Json(TaxesResponse {
        ok: true,
        order_id: taxes.order_id,
        order_taxes: OrderTaxesView {
            order_taxes_amount: taxes.order_taxes_amount,
            order_taxes_obj: taxes.order_taxes,
            payments_taxes_amounts: taxes.payments.iter().map(|p| p.taxes_amount).collect(),
            payments_taxes_raw,
        },
        sample_payment: taxes.payments.into_iter().next(),
    }))
}

pub async fn get_missing_costs(
    query: Result<Query<MissingCostsQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<Json<MissingCostsResponse>, AppError> {
    let Query(params) = query?;
    let query = OrdersQuery {
        from: params.from,
        to: params.to,
        page_size: params.page_size,
        max_pages: params.max_pages,
        ..Default::default()
    };
    let request = query.to_batch_request(state.pipeline.config().utc_offset)?;
    let missing = state.pipeline.missing_costs(&request).await?;

    Ok(Json(MissingCostsResponse {
        ok: true,
        from: request.from.to_string(),
        to: request.to.to_string(),
        missing_count: missing.total,
        missing: missing
            .items
            .into_iter()
            .map(|m| MissingItem {
                id: m.id,
                title: m.title,
            })
            .collect(),
    }))
}
