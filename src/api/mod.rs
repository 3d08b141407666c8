pub mod debug;
pub mod health;
pub mod orders;

use crate::domain::RowSchema;
use crate::orchestration::OrdersPipeline;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<OrdersPipeline>,
    pub schema: RowSchema,
}

impl AppState {
    pub fn new(pipeline: Arc<OrdersPipeline>) -> Self {
        let schema = RowSchema::new(pipeline.config().interest_free_column);
        Self { pipeline, schema }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/orders", get(orders::get_orders))
        .route("/orders.csv", get(orders::get_orders_csv))
        .route("/debug/costs", get(debug::get_costs))
        .route("/debug/costs/:item_id", get(debug::get_cost))
        .route("/debug/costs_raw", get(debug::get_costs_raw))
        .route("/debug/missing_costs", get(debug::get_missing_costs))
        .route("/debug/taxes", get(debug::get_taxes))
        .layer(cors)
        .with_state(state)
}
