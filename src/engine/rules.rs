//! Free-shipping and cost-split rules shared by the mapper and the allocator.

use crate::domain::{Decimal, Row};
use std::fmt;
use std::str::FromStr;

/// Default free-shipping threshold in local currency.
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 33_000;

/// Which price is compared against the free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    /// List price before discounts (PRECIO BASE).
    #[default]
    Base,
    /// Buyer-paid total (Precio Final).
    Final,
}

/// How a shared shipment's cost is spread across the orders in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitPolicy {
    /// Whole cost on the first eligible row.
    First,
    /// Equal cents, remainder on the earliest rows.
    Even,
    /// Proportional to each row's price.
    #[default]
    ByPrice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRuleError(pub String);

impl fmt::Display for ParseRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized value: {}", self.0)
    }
}

impl std::error::Error for ParseRuleError {}

impl FromStr for PriceField {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(PriceField::Base),
            "final" => Ok(PriceField::Final),
            other => Err(ParseRuleError(other.to_string())),
        }
    }
}

impl FromStr for SplitPolicy {
    type Err = ParseRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(SplitPolicy::First),
            "even" => Ok(SplitPolicy::Even),
            "by_price" | "byprice" | "price" => Ok(SplitPolicy::ByPrice),
            other => Err(ParseRuleError(other.to_string())),
        }
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitPolicy::First => write!(f, "first"),
            SplitPolicy::Even => write!(f, "even"),
            SplitPolicy::ByPrice => write!(f, "by_price"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingRules {
    pub free_threshold: Decimal,
    /// `price <= threshold` is free when set, `price < threshold` otherwise.
    pub inclusive: bool,
    pub price_field: PriceField,
    pub split: SplitPolicy,
}

impl Default for ShippingRules {
    fn default() -> Self {
        Self {
            free_threshold: Decimal::from_i64(DEFAULT_FREE_SHIPPING_THRESHOLD),
            inclusive: true,
            price_field: PriceField::Base,
            split: SplitPolicy::ByPrice,
        }
    }
}

impl ShippingRules {
    /// Price compared against the threshold. The preferred field falls back to
    /// the other one when it is not positive.
    pub fn qualifying_price(&self, base: Decimal, final_price: Decimal) -> Decimal {
        let (preferred, fallback) = match self.price_field {
            PriceField::Base => (base, final_price),
            PriceField::Final => (final_price, base),
        };
        if preferred.is_positive() {
            preferred
        } else {
            fallback
        }
    }

    pub fn row_price(&self, row: &Row) -> Decimal {
        self.qualifying_price(row.base_price, row.final_price)
    }

    /// True when the seller is not charged for shipping at this price.
    pub fn is_free(&self, price: Decimal) -> bool {
        if self.inclusive {
            price <= self.free_threshold
        } else {
            price < self.free_threshold
        }
    }

    pub fn row_is_free(&self, row: &Row) -> bool {
        self.is_free(self.row_price(row))
    }
}
