pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod export;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    DataSourceError, MarketplaceSource, MeliDataSource, MockMarketplace, SheetSource, TaxSource,
};
pub use domain::{CostTable, Decimal, Order, Payment, Row, RowSchema, Shipment, TimeMs};
pub use engine::{OrderRowMapper, PivotMode, ShippingAllocator, ShippingRules, SplitPolicy};
pub use error::AppError;
pub use orchestration::{BatchRequest, OrdersPipeline, PipelineError};
