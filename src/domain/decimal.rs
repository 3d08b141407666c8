//! Money and percentage arithmetic backed by rust_decimal.
//!
//! Upstream payloads carry prices as JSON floats or loosely formatted strings.
//! Every value is brought into `Decimal` through its shortest decimal text, so
//! `2.005` is exactly `2.005` and rounds half-up to `2.01` on every platform.

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Currency amounts keep two decimals.
pub const MONEY_DP: u32 = 2;
/// Percentages keep one decimal.
pub const PERCENT_DP: u32 = 1;

/// Lossless decimal numeric type for financial calculations.
///
/// Serializes to a JSON number (not string).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly. Accepts exponent notation.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        let s = s.trim();
        if s.contains(['e', 'E']) {
            RustDecimal::from_scientific(s).map(Decimal)
        } else {
            RustDecimal::from_str(s).map(Decimal)
        }
    }

    /// Convert an `f64` through its shortest round-trip text.
    ///
    /// Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Self::from_str_canonical(&value.to_string()).ok()
    }

    /// Coerce an arbitrary JSON value into a number, or `None` when the value
    /// is absent or not numeric.
    pub fn coerce_opt(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Self::from_str_canonical(&n.to_string()).ok(),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Self::from_str_canonical(trimmed).ok()
                }
            }
            _ => None,
        }
    }

    /// Numeric value of `value`, or 0 when it is not a finite number.
    pub fn to_number(value: &Value) -> Self {
        Self::coerce_opt(value).unwrap_or_default()
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn from_i64(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Round half away from zero to `dp` decimal places.
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Currency rounding (2 decimals, half-up).
    pub fn round2(&self) -> Self {
        self.round_dp(MONEY_DP)
    }

    /// Percentage rounding (1 decimal, half-up).
    pub fn round1(&self) -> Self {
        self.round_dp(PERCENT_DP)
    }

    /// Whole cents, rounded half-up.
    pub fn to_cents(&self) -> i64 {
        let cents = (self.0 * RustDecimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(cents).unwrap_or(0)
    }

    pub fn from_cents(cents: i64) -> Self {
        Decimal(RustDecimal::new(cents, MONEY_DP))
    }

    /// Largest integer not greater than the value.
    pub fn floor_i64(&self) -> i64 {
        i64::try_from(self.0.floor()).unwrap_or(0)
    }

    /// Division returning `None` on a zero divisor or overflow.
    pub fn checked_div(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}
