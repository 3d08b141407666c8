use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::primitives::today_in;
use crate::domain::Cell;
use crate::engine::PivotMode;
use crate::error::AppError;
use crate::export::{csv_filename, rows_to_csv};
use crate::orchestration::pipeline::{BatchRequest, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    /// First local day, `YYYY-MM-DD`; defaults to today.
    pub from: Option<String>,
    /// Last local day, `YYYY-MM-DD`; defaults to today.
    pub to: Option<String>,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub include_shipment: Option<bool>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub from: String,
    pub to: String,
    pub mode: String,
    pub count: usize,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

impl OrdersQuery {
    pub fn to_batch_request(&self, offset: FixedOffset) -> Result<BatchRequest, AppError> {
        let today = today_in(offset);
        let from = parse_day("from", self.from.as_deref())?.unwrap_or(today);
        let to = parse_day("to", self.to.as_deref())?.unwrap_or(today);
        if from > to {
            return Err(AppError::BadRequest(format!(
                "from ({}) must not be after to ({})",
                from, to
            )));
        }

        let mode = match self.mode.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<PivotMode>()
                    .map_err(|e| AppError::BadRequest(format!("invalid mode: {}", e)))?,
            ),
        };

        Ok(BatchRequest {
            from,
            to,
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            max_pages: self.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
            include_shipment: self.include_shipment.unwrap_or(false),
            mode,
        })
    }
}

fn parse_day(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} must be YYYY-MM-DD, got {}", name, s))),
    }
}

pub async fn get_orders(
    query: Result<Query<OrdersQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<Json<OrdersResponse>, AppError> {
    let Query(params) = query?;
    let request = params.to_batch_request(state.pipeline.config().utc_offset)?;
    let batch = state.pipeline.run(&request).await?;

    let rows: Vec<Vec<Cell>> = batch.rows.iter().map(|r| state.schema.cells(r)).collect();
    Ok(Json(OrdersResponse {
        from: batch.from.to_string(),
        to: batch.to.to_string(),
        mode: batch.mode.to_string(),
        count: rows.len(),
        headers: state.schema.headers(),
        rows,
    }))
}

pub async fn get_orders_csv(
    query: Result<Query<OrdersQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let request = params.to_batch_request(state.pipeline.config().utc_offset)?;
    let batch = state.pipeline.run(&request).await?;
    let body = rows_to_csv(&state.schema, &batch.rows)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        csv_filename(batch.from, batch.to)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
