//! Batch orchestration over the data sources and the engine.

pub mod cache;
pub mod pipeline;

pub use cache::TtlCache;
pub use pipeline::{
    Batch, BatchRequest, MissingCost, MissingCosts, OrderTaxes, OrdersPipeline, PipelineError,
    RawCostRow,
};
