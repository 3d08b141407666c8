//! Domain types for marketplace order reporting.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper (coercion and rounding)
//! - Time primitives and local-day window helpers
//! - Marketplace Order, Payment and Shipment payloads
//! - The output Row and its fixed column schema
//! - The unit cost table

pub mod cost;
pub mod decimal;
pub mod order;
pub mod primitives;
pub mod row;

pub use cost::{
    build_cost_table, inspect_cost_cell, parse_cost_cell, CostCellParse, CostTable, COST_COLUMN,
};
pub use decimal::Decimal;
pub use order::{
    approved_payment, ItemRef, Order, OrderItem, Payment, PaymentSummary, Shipment, ShippingRef,
};
pub use primitives::{OrderId, TimeMs};
pub use row::{Cell, Column, Row, RowSchema};
