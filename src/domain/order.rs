//! Marketplace order, payment and shipment payloads.
//!
//! Upstream data is partial and loosely typed: numbers arrive as floats,
//! strings or nulls, and whole sub-objects may be missing. Every numeric field
//! is deserialized leniently so one malformed value never rejects an order.

use super::{Decimal, OrderId, TimeMs};
use serde::{Deserialize, Serialize};

/// Order status that never produces a row.
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: Option<OrderId>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date_created: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date_closed: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub paid_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub order_items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub payments: Vec<Payment>,
    #[serde(default, deserialize_with = "lenient::maybe_object")]
    pub shipping: Option<ShippingRef>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub pack_id: Option<i64>,
    /// Order-level tax block, kept verbatim for diagnostics.
    #[serde(default)]
    pub taxes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, deserialize_with = "lenient::object")]
    pub item: ItemRef,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub unit_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub full_unit_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub sale_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::maybe_object")]
    pub shipping: Option<ShippingRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub seller_sku: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub variation_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingRef {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status_detail: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date_approved: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date_accredited: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date_created: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub installments: Option<i64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub transaction_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_paid_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub net_received_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub taxes_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub shipping_cost: Option<Decimal>,
    #[serde(default)]
    pub fee_details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub receiver_cost: Option<Decimal>,
    #[serde(default)]
    pub shipping_option: Option<ShippingOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub list_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub cost: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub receiver_cost: Option<Decimal>,
    #[serde(default)]
    pub cost_components: Option<CostComponents>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostComponents {
    #[serde(default, deserialize_with = "lenient::string")]
    pub paid_by: Option<String>,
}

impl Order {
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(STATUS_CANCELLED))
    }

    pub fn first_item(&self) -> Option<&OrderItem> {
        self.order_items.first()
    }

    /// Shipment id from the order, falling back to the first line item.
    pub fn shipping_id(&self) -> Option<i64> {
        self.shipping
            .as_ref()
            .and_then(|s| s.id)
            .or_else(|| self.first_item().and_then(|it| it.shipping.as_ref()?.id))
    }

    pub fn created_at(&self) -> Option<TimeMs> {
        self.date_created.as_deref().and_then(TimeMs::parse_rfc3339)
    }

    pub fn closed_at(&self) -> Option<TimeMs> {
        self.date_closed.as_deref().and_then(TimeMs::parse_rfc3339)
    }

    /// `taxes.amount` of the order, when reported.
    pub fn taxes_amount(&self) -> Option<Decimal> {
        self.taxes
            .as_ref()
            .and_then(|t| t.get("amount"))
            .and_then(Decimal::coerce_opt)
    }
}

impl OrderItem {
    /// Quantity, treating a missing or zero value as one unit.
    pub fn quantity_or_one(&self) -> Decimal {
        match self.quantity {
            Some(q) if !q.is_zero() => q,
            _ => Decimal::one(),
        }
    }

    /// Keys tried against the cost table, in priority order.
    pub fn cost_keys(&self) -> impl Iterator<Item = &str> {
        [
            self.item.id.as_deref(),
            self.item.seller_sku.as_deref(),
            self.item.variation_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    }
}

impl Payment {
    fn status_is(&self, expected: &str) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(expected))
    }

    pub fn is_approved(&self) -> bool {
        self.status_is("approved")
    }

    /// Approved or accredited money.
    pub fn is_settled(&self) -> bool {
        self.is_approved()
            || self.status_is("accredited")
            || self
                .status_detail
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case("accredited"))
    }

    /// Approval time, else accreditation time, else creation time.
    pub fn settled_at(&self) -> Option<TimeMs> {
        [
            self.date_approved.as_deref(),
            self.date_accredited.as_deref(),
            self.date_created.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find_map(TimeMs::parse_rfc3339)
    }
}

/// The payment whose figures feed tax and installments: the first approved
/// payment, or failing that the first settled one.
pub fn approved_payment(payments: &[Payment]) -> Option<&Payment> {
    payments
        .iter()
        .find(|p| p.is_approved())
        .or_else(|| payments.iter().find(|p| p.is_settled()))
}

impl Shipment {
    /// Cost component paid by the buyer.
    pub fn receiver_cost(&self) -> Decimal {
        self.receiver_cost
            .or_else(|| self.shipping_option.as_ref()?.receiver_cost)
            .unwrap_or_default()
    }

    pub fn list_cost(&self) -> Decimal {
        self.shipping_option
            .as_ref()
            .and_then(|o| o.list_cost.or(o.cost))
            .unwrap_or_default()
    }

    pub fn paid_by(&self) -> Option<&str> {
        self.shipping_option
            .as_ref()?
            .cost_components
            .as_ref()?
            .paid_by
            .as_deref()
    }

    pub fn is_paid_by_seller(&self) -> bool {
        self.paid_by()
            .is_some_and(|p| p.trim().eq_ignore_ascii_case("seller"))
    }
}

/// Aggregate view of an order's payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub net_received: Decimal,
    pub installments: i64,
}

impl PaymentSummary {
    pub fn from_payments(payments: &[Payment]) -> Self {
        payments.iter().fold(Self::default(), |acc, p| Self {
            net_received: acc.net_received + p.net_received_amount.unwrap_or_default(),
            installments: acc.installments.max(p.installments.unwrap_or(0)),
        })
    }
}

mod lenient {
    use crate::domain::Decimal;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(Decimal::coerce_opt))
    }

    pub fn int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// An object that is silently dropped when it has the wrong shape.
    pub fn maybe_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(|v| serde_json::from_value(v).ok()))
    }

    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }
}
