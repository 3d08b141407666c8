//! Pure computation over fetched marketplace data.
//!
//! Nothing here performs I/O: the orchestration layer gathers orders,
//! payments, shipments and costs, then hands them to the mapper and the
//! allocator.

pub mod allocation;
pub mod mapper;
pub mod pivot;
pub mod rules;

pub use allocation::{group_key, AllocationItem, GroupKey, ShippingAllocator};
pub use mapper::{initial_shipping, MappedRow, OrderRowMapper};
pub use pivot::{is_in_range, paid_timestamp, pivot_timestamp, PivotMode};
pub use rules::{PriceField, ShippingRules, SplitPolicy, DEFAULT_FREE_SHIPPING_THRESHOLD};
